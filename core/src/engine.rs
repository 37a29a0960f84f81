use std::{
  collections::HashMap,
  sync::Arc,
  time::{SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
  config::ViewerConfig,
  models::{ChildrenPage, JsonNodeKind, PerformanceStats, SessionInfo},
  render::TreeRow,
  session::{DocumentInput, NoopObserver, ViewerEvent, ViewerObserver, ViewerSession},
};

#[derive(Debug, Clone, Error)]
pub enum ViewerError {
  #[error("failed to parse JSON: {0}")]
  Parse(String),
  #[error("invalid value: {0}")]
  EditValidation(String),
  #[error("clipboard error: {0}")]
  Clipboard(String),
  #[error("cannot address into {kind:?} at {path}")]
  NotAContainer { path: String, kind: JsonNodeKind },
  #[error("key {key:?} cannot index the array at {path}")]
  KeyOnArray { path: String, key: String },
  #[error("no node at {0}")]
  NotFound(String),
  #[error("not editable: {0}")]
  NotEditable(String),
  #[error("bad cursor token: {0}")]
  BadCursor(String),
  #[error("invalid argument: {0}")]
  InvalidArg(String),
  #[error("unknown session: {0}")]
  UnknownSession(String),
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
  /// Config used when `open_document` is not given one.
  pub default_config: ViewerConfig,
  pub max_sessions: usize,
}

impl Default for EngineOptions {
  fn default() -> Self {
    Self {
      default_config: ViewerConfig::default(),
      max_sessions: 64,
    }
  }
}

struct SessionState {
  info: SessionInfo,
  session: Mutex<ViewerSession>,
  observer: Mutex<Box<dyn ViewerObserver>>,
  /// Events waiting for whichever caller currently holds the observer.
  backlog: Mutex<Vec<ViewerEvent>>,
}

impl SessionState {
  /// Hand `events` to the observer. Runs with no session lock held; if another call (possibly a
  /// re-entrant one from inside a callback) is already delivering, it picks these up instead.
  fn deliver(&self, events: Vec<ViewerEvent>) {
    self.backlog.lock().extend(events);
    loop {
      {
        let Some(mut observer) = self.observer.try_lock() else {
          return;
        };
        loop {
          let batch = std::mem::take(&mut *self.backlog.lock());
          if batch.is_empty() {
            break;
          }
          for event in &batch {
            event.dispatch(observer.as_mut());
          }
        }
      }
      if self.backlog.lock().is_empty() {
        return;
      }
    }
  }
}

/// Registry of open viewer sessions, shareable across threads.
///
/// The registry lock only guards the id map. Each session has its own lock, held for the duration
/// of one call and released before observer callbacks run.
#[derive(Clone)]
pub struct ViewerEngine {
  options: EngineOptions,
  sessions: Arc<Mutex<HashMap<String, Arc<SessionState>>>>,
}

impl ViewerEngine {
  pub fn new(options: EngineOptions) -> Self {
    Self {
      options,
      sessions: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// IPC API: open_document(input, config) -> SessionInfo
  pub fn open_document(
    &self,
    input: impl Into<DocumentInput>,
    config: Option<ViewerConfig>,
    observer: Option<Box<dyn ViewerObserver>>,
  ) -> Result<SessionInfo, ViewerError> {
    let config = config.unwrap_or_else(|| self.options.default_config.clone());
    let observer = observer.unwrap_or_else(|| Box::new(NoopObserver));
    let info = SessionInfo {
      session_id: Uuid::new_v4().to_string(),
      root_name: config.root_name.clone(),
      created_at_ms: now_ms(),
    };
    let mut session = ViewerSession::queued(input, config);
    let opened = session.take_events();
    let state = Arc::new(SessionState {
      info: info.clone(),
      session: Mutex::new(session),
      observer: Mutex::new(observer),
      backlog: Mutex::new(Vec::new()),
    });

    {
      let mut sessions = self.sessions.lock();
      if sessions.len() >= self.options.max_sessions {
        return Err(ViewerError::InvalidArg(format!(
          "too many open sessions (max {})",
          self.options.max_sessions
        )));
      }
      sessions.insert(info.session_id.clone(), state.clone());
    }
    debug!(session_id = %info.session_id, "session opened");

    state.deliver(opened);
    Ok(info)
  }

  pub fn close(&self, session_id: &str) -> Result<(), ViewerError> {
    self
      .sessions
      .lock()
      .remove(session_id)
      .map(|_| debug!(session_id, "session closed"))
      .ok_or_else(|| ViewerError::UnknownSession(session_id.to_string()))
  }

  pub fn session_info(&self, session_id: &str) -> Result<SessionInfo, ViewerError> {
    Ok(self.state(session_id)?.info.clone())
  }

  fn state(&self, session_id: &str) -> Result<Arc<SessionState>, ViewerError> {
    self
      .sessions
      .lock()
      .get(session_id)
      .cloned()
      .ok_or_else(|| ViewerError::UnknownSession(session_id.to_string()))
  }

  /// Run `f` against one session under that session's lock, then deliver the events it raised.
  pub fn with_session<R>(
    &self,
    session_id: &str,
    f: impl FnOnce(&mut ViewerSession) -> R,
  ) -> Result<R, ViewerError> {
    let state = self.state(session_id)?;
    let (out, events) = {
      let mut session = state.session.lock();
      let out = f(&mut *session);
      (out, session.take_events())
    };
    state.deliver(events);
    Ok(out)
  }

  /// IPC API: rows(session_id) -> Vec<TreeRow>
  pub fn rows(&self, session_id: &str) -> Result<Vec<TreeRow>, ViewerError> {
    self.with_session(session_id, |s| s.rows().to_vec())
  }

  /// IPC API: toggle(session_id, path) -> expanded
  pub fn toggle(&self, session_id: &str, path: &str) -> Result<bool, ViewerError> {
    self.with_session(session_id, |s| s.toggle(path))
  }

  /// IPC API: search(session_id, query) -> match count
  pub fn search(&self, session_id: &str, query: &str) -> Result<usize, ViewerError> {
    self.with_session(session_id, |s| {
      s.search(query);
      s.matches().match_count
    })
  }

  pub fn get(&self, session_id: &str, path: &str) -> Result<Option<Value>, ViewerError> {
    self.with_session(session_id, |s| s.get(path))
  }

  pub fn set(&self, session_id: &str, path: &str, value: Value) -> Result<(), ViewerError> {
    self.with_session(session_id, |s| s.set(path, value))?
  }

  /// IPC API: list_children(session_id, path, cursor, limit) -> ChildrenPage
  pub fn list_children(
    &self,
    session_id: &str,
    path: &str,
    cursor: Option<&str>,
    limit: usize,
  ) -> Result<ChildrenPage, ViewerError> {
    self.with_session(session_id, |s| s.list_children(path, cursor, limit))?
  }

  pub fn performance_stats(&self, session_id: &str) -> Result<PerformanceStats, ViewerError> {
    self.with_session(session_id, |s| s.performance_stats())
  }
}

fn now_ms() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64
}
