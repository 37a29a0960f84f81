//! Windowing math for long flat row lists.
//!
//! Rows have a nominal size until the host reports a measured one via [`Virtualizer::measure`].
//! Every setter re-derives the cumulative offsets and the visible range.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::VirtualItem;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VirtualizerOptions {
  pub item_count: usize,
  pub item_size: f64,
  pub container_height: f64,
  pub overscan: usize,
}

impl Default for VirtualizerOptions {
  fn default() -> Self {
    Self {
      item_count: 0,
      item_size: 24.0,
      container_height: 600.0,
      overscan: 5,
    }
  }
}

/// Inclusive index range of rows to render.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisibleRange {
  pub start: usize,
  pub end: usize,
}

impl VisibleRange {
  pub fn len(self) -> usize {
    self.end - self.start + 1
  }

  pub fn is_empty(self) -> bool {
    self.end < self.start
  }

  pub fn contains(self, index: usize) -> bool {
    (self.start..=self.end).contains(&index)
  }
}

#[derive(Debug, Clone)]
pub struct Virtualizer {
  opts: VirtualizerOptions,
  scroll_top: f64,
  measured: HashMap<usize, f64>,
  items: Vec<VirtualItem>,
  range: Option<VisibleRange>,
}

impl Virtualizer {
  pub fn new(opts: VirtualizerOptions) -> Self {
    let mut v = Self {
      opts,
      scroll_top: 0.0,
      measured: HashMap::new(),
      items: Vec::new(),
      range: None,
    };
    v.rebuild();
    v
  }

  pub fn options(&self) -> &VirtualizerOptions {
    &self.opts
  }

  pub fn scroll_top(&self) -> f64 {
    self.scroll_top
  }

  pub fn set_scroll_top(&mut self, scroll_top: f64) {
    self.scroll_top = if scroll_top.is_finite() { scroll_top.max(0.0) } else { 0.0 };
    self.derive_range();
  }

  pub fn set_item_count(&mut self, item_count: usize) {
    if item_count == self.opts.item_count {
      return;
    }
    self.opts.item_count = item_count;
    self.measured.retain(|i, _| *i < item_count);
    self.rebuild();
  }

  pub fn set_item_size(&mut self, item_size: f64) {
    self.opts.item_size = item_size;
    self.rebuild();
  }

  pub fn set_container_height(&mut self, container_height: f64) {
    self.opts.container_height = container_height;
    self.derive_range();
  }

  /// Record the real size of a rendered row. Non-positive or non-finite sizes are ignored.
  pub fn measure(&mut self, index: usize, size: f64) {
    if index >= self.opts.item_count || !size.is_finite() || size <= 0.0 {
      return;
    }
    if self.measured.get(&index) == Some(&size) {
      return;
    }
    self.measured.insert(index, size);
    self.rebuild();
  }

  pub fn clear_measurements(&mut self) {
    self.measured.clear();
    self.rebuild();
  }

  pub fn visible_range(&self) -> Option<VisibleRange> {
    self.range
  }

  /// Items inside the visible range (overscan included).
  pub fn virtual_items(&self) -> &[VirtualItem] {
    match self.range {
      Some(r) => &self.items[r.start..=r.end],
      None => &[],
    }
  }

  pub fn all_items(&self) -> &[VirtualItem] {
    &self.items
  }

  /// End offset of the last row, used to size the scroll spacer.
  pub fn total_size(&self) -> f64 {
    self.items.last().map_or(0.0, |it| it.end)
  }

  fn rebuild(&mut self) {
    self.items.clear();
    self.items.reserve(self.opts.item_count);
    let mut start = 0.0;
    for index in 0..self.opts.item_count {
      let size = self
        .measured
        .get(&index)
        .copied()
        .unwrap_or(self.opts.item_size);
      let end = start + size;
      self.items.push(VirtualItem {
        index,
        start,
        size,
        end,
      });
      start = end;
    }
    self.derive_range();
  }

  fn derive_range(&mut self) {
    let len = self.items.len();
    if len == 0 {
      self.range = None;
      return;
    }
    let viewport_start = self.scroll_top;
    let viewport_end = self.scroll_top + self.opts.container_height.max(0.0);

    // Offsets are monotonic, so both bounds are partition points.
    let first = self
      .items
      .partition_point(|it| it.end <= viewport_start)
      .min(len - 1);
    let last = self
      .items
      .partition_point(|it| it.start <= viewport_end)
      .saturating_sub(1)
      .max(first);

    self.range = Some(VisibleRange {
      start: first.saturating_sub(self.opts.overscan),
      end: (last + self.opts.overscan).min(len - 1),
    });
  }
}
