use std::time::{Duration, Instant};

/// Holds the latest pushed value until it has been quiet for `delay`.
///
/// Time is supplied by the caller, so the host's event loop decides when to poll.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
  delay: Duration,
  pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      pending: None,
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  pub fn set_delay(&mut self, delay: Duration) {
    self.delay = delay;
  }

  /// Replace any pending value; the superseded one is dropped.
  pub fn push(&mut self, value: T, now: Instant) {
    self.pending = Some((value, now));
  }

  /// Release the pending value once its quiet period has elapsed.
  pub fn poll(&mut self, now: Instant) -> Option<T> {
    let ready = matches!(
      &self.pending,
      Some((_, at)) if now.saturating_duration_since(*at) >= self.delay
    );
    if ready {
      self.pending.take().map(|(v, _)| v)
    } else {
      None
    }
  }

  /// When the pending value becomes ready, if any.
  pub fn deadline(&self) -> Option<Instant> {
    self.pending.as_ref().map(|(_, at)| *at + self.delay)
  }

  pub fn cancel(&mut self) -> Option<T> {
    self.pending.take().map(|(v, _)| v)
  }

  pub fn is_pending(&self) -> bool {
    self.pending.is_some()
  }
}
