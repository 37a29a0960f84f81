//! One open document and all the viewer state layered on top of it.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::{
  children::list_children_page,
  clipboard::{copy_text, Clipboard},
  config::ViewerConfig,
  debounce::Debouncer,
  edit::{parse_document, InlineEdit},
  engine::ViewerError,
  expansion::{ExpansionState, DEFAULT_EXPAND_DEPTH},
  inspect::JsonNode,
  models::{ChildrenPage, JsonPathSegment, NodeMeta, PerformanceStats, VirtualItem},
  path::JsonPath,
  render::{flatten_rows, TreeRow},
  search_match::{search, PreparedSearch, SearchMatches, SearchQuery},
  tree::DocTree,
  virtualize::Virtualizer,
};

/// Host callbacks. Every method defaults to a no-op.
///
/// Sessions owned by a [`crate::ViewerEngine`] deliver callbacks after the session lock is
/// released, so an observer may call back into the engine.
pub trait ViewerObserver: Send {
  fn on_select(&mut self, _path: &str, _meta: &NodeMeta) {}
  fn on_change(&mut self, _path: &str, _old: &Value, _new: &Value) {}
  fn on_error(&mut self, _error: &ViewerError) {}
  fn on_search_match_count(&mut self, _count: usize) {}
}

pub struct NoopObserver;

impl ViewerObserver for NoopObserver {}

/// A callback waiting to be delivered to a [`ViewerObserver`].
#[derive(Debug, Clone)]
pub enum ViewerEvent {
  Select { path: String, meta: NodeMeta },
  Change { path: String, old: Value, new: Value },
  Error(ViewerError),
  SearchMatchCount(usize),
}

impl ViewerEvent {
  pub fn dispatch(&self, observer: &mut dyn ViewerObserver) {
    match self {
      ViewerEvent::Select { path, meta } => observer.on_select(path, meta),
      ViewerEvent::Change { path, old, new } => observer.on_change(path, old, new),
      ViewerEvent::Error(e) => observer.on_error(e),
      ViewerEvent::SearchMatchCount(n) => observer.on_search_match_count(*n),
    }
  }
}

/// A document handed to the viewer, either parsed already or as JSON text.
#[derive(Debug, Clone)]
pub enum DocumentInput {
  Value(Value),
  Text(String),
}

impl From<Value> for DocumentInput {
  fn from(v: Value) -> Self {
    DocumentInput::Value(v)
  }
}

impl From<String> for DocumentInput {
  fn from(s: String) -> Self {
    DocumentInput::Text(s)
  }
}

impl From<&str> for DocumentInput {
  fn from(s: &str) -> Self {
    DocumentInput::Text(s.to_string())
  }
}

pub struct ViewerSession {
  config: ViewerConfig,
  doc: DocTree,
  total_nodes: usize,
  expansion: ExpansionState,
  query: SearchQuery,
  matches: SearchMatches,
  pending_query: Debouncer<String>,
  /// Widened child windows of lazily windowed parents, by rendered path.
  loaded: HashMap<String, usize>,
  virtualizer: Option<Virtualizer>,
  rows: Vec<TreeRow>,
  rows_dirty: bool,
  last_render: Duration,
  editor: Option<InlineEdit>,
  /// `None` when events are queued for the owner to deliver.
  observer: Option<Box<dyn ViewerObserver>>,
  events: Vec<ViewerEvent>,
}

impl ViewerSession {
  /// A session that calls `observer` as events happen.
  pub fn new(
    input: impl Into<DocumentInput>,
    config: ViewerConfig,
    observer: Box<dyn ViewerObserver>,
  ) -> Self {
    Self::build(input.into(), config, Some(observer))
  }

  /// A session that queues its events; collect them with [`ViewerSession::take_events`].
  pub fn queued(input: impl Into<DocumentInput>, config: ViewerConfig) -> Self {
    Self::build(input.into(), config, None)
  }

  fn build(
    input: DocumentInput,
    config: ViewerConfig,
    observer: Option<Box<dyn ViewerObserver>>,
  ) -> Self {
    let (value, parse_error) = resolve_input(input);
    let doc = DocTree::from_value(&value);
    let expansion = ExpansionState::initial(doc.root(), &config.root_name, config.collapsed);
    let virtualizer = config
      .performance
      .enable_virtualization
      .then(|| Virtualizer::new(config.virtualizer_options(0)));

    let mut session = Self {
      total_nodes: doc.node_count(),
      doc,
      expansion,
      query: SearchQuery::new(config.search.clone()),
      matches: SearchMatches::default(),
      pending_query: Debouncer::new(config.debounce_delay()),
      loaded: HashMap::new(),
      virtualizer,
      rows: Vec::new(),
      rows_dirty: true,
      last_render: Duration::ZERO,
      editor: None,
      observer,
      events: Vec::new(),
      config,
    };
    if let Some(e) = parse_error {
      session.emit(ViewerEvent::Error(e));
    }
    if !session.query.text.is_empty() {
      session.refresh_search();
    }
    session
  }

  pub fn config(&self) -> &ViewerConfig {
    &self.config
  }

  pub fn expansion(&self) -> &ExpansionState {
    &self.expansion
  }

  pub fn to_json(&self) -> Value {
    self.doc.to_value()
  }

  /// Events not yet delivered. Always empty for a session built with an observer.
  pub fn take_events(&mut self) -> Vec<ViewerEvent> {
    std::mem::take(&mut self.events)
  }

  fn emit(&mut self, event: ViewerEvent) {
    match self.observer.as_mut() {
      Some(observer) => event.dispatch(observer.as_mut()),
      None => self.events.push(event),
    }
  }

  /// Swap in a new document. Expansion state and the active query carry over; lazy windows and
  /// measured row sizes belong to the old document and are dropped.
  pub fn replace_document(&mut self, input: impl Into<DocumentInput>) {
    let (value, parse_error) = resolve_input(input.into());
    if let Some(e) = parse_error {
      self.emit(ViewerEvent::Error(e));
    }
    self.doc = DocTree::from_value(&value);
    self.total_nodes = self.doc.node_count();
    self.editor = None;
    self.loaded.clear();
    if let Some(v) = self.virtualizer.as_mut() {
      v.clear_measurements();
    }
    self.refresh_search();
    self.rows_dirty = true;
  }

  pub fn parse_path(&self, path: &str) -> JsonPath {
    JsonPath::parse(path, &self.config.root_name)
  }

  // ---- expansion ----

  /// Rendered form of `path`, the key used by the expansion set and lazy windows.
  pub fn canonical_path(&self, path: &str) -> String {
    self.parse_path(path).render(&self.config.root_name)
  }

  pub fn is_expanded(&self, path: &str) -> bool {
    self.expansion.is_expanded(&self.canonical_path(path))
  }

  /// Returns whether `path` is expanded afterwards.
  pub fn toggle(&mut self, path: &str) -> bool {
    let path = self.canonical_path(path);
    self.rows_dirty = true;
    self.expansion.toggle(&path)
  }

  pub fn expand_all(&mut self) {
    self.expansion.expand_all(self.doc.root(), DEFAULT_EXPAND_DEPTH);
    self.rows_dirty = true;
  }

  pub fn collapse_all(&mut self) {
    self.expansion.collapse_all();
    self.rows_dirty = true;
  }

  // ---- search ----

  pub fn query(&self) -> &str {
    &self.query.text
  }

  pub fn matches(&self) -> &SearchMatches {
    &self.matches
  }

  /// Apply `query` immediately, dropping any debounced query still waiting.
  pub fn search(&mut self, query: &str) {
    self.pending_query.cancel();
    self.query.text = query.to_string();
    self.refresh_search();
  }

  pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
    self.query.case_sensitive = case_sensitive;
    self.refresh_search();
  }

  /// Record a keystroke's worth of query text; it is applied by `poll_query` once quiet.
  pub fn type_query(&mut self, text: impl Into<String>, now: Instant) {
    self.pending_query.push(text.into(), now);
  }

  /// Apply the debounced query if its quiet period has passed. Returns whether it ran.
  pub fn poll_query(&mut self, now: Instant) -> bool {
    match self.pending_query.poll(now) {
      Some(text) => {
        self.query.text = text;
        self.refresh_search();
        true
      }
      None => false,
    }
  }

  pub fn query_deadline(&self) -> Option<Instant> {
    self.pending_query.deadline()
  }

  fn refresh_search(&mut self) {
    self.matches = search(self.doc.root(), &self.query, &self.config.root_name);
    if self.matches.match_count > 0 {
      self
        .expansion
        .merge(self.matches.required_expansion.iter().cloned());
    }
    self.rows_dirty = true;
    self.emit(ViewerEvent::SearchMatchCount(self.matches.match_count));
  }

  // ---- document access ----

  pub fn get(&self, path: &str) -> Option<Value> {
    self.doc.get(&self.parse_path(path))
  }

  /// Replace the value at `path`, creating missing containers along the way.
  pub fn set(&mut self, path: &str, value: Value) -> Result<(), ViewerError> {
    let path = self.parse_path(path);
    self.set_at(&path, value)
  }

  fn set_at(&mut self, path: &JsonPath, value: Value) -> Result<(), ViewerError> {
    let old = self.doc.get(path).unwrap_or(Value::Null);
    if let Err(e) = self.doc.set(path, &value) {
      warn!(error = %e, "set rejected");
      self.emit(ViewerEvent::Error(e.clone()));
      return Err(e);
    }
    self.total_nodes = self.doc.node_count();
    let rendered = path.render(&self.config.root_name);
    debug!(path = %rendered, "value changed");
    self.emit(ViewerEvent::Change {
      path: rendered,
      old,
      new: value,
    });
    if !self.query.text.is_empty() {
      self.refresh_search();
    }
    self.rows_dirty = true;
    Ok(())
  }

  pub fn list_children(
    &self,
    path: &str,
    cursor: Option<&str>,
    limit: usize,
  ) -> Result<ChildrenPage, ViewerError> {
    let parsed = self.parse_path(path);
    let node = self
      .doc
      .node_at(&parsed)
      .ok_or_else(|| ViewerError::NotFound(path.to_string()))?;
    list_children_page(
      node,
      &parsed,
      &self.config.root_name,
      cursor,
      limit,
      self.config.preview_max_chars,
    )
  }

  pub fn node_meta(&self, path: &str) -> Result<NodeMeta, ViewerError> {
    let parsed = self.parse_path(path);
    let node = self
      .doc
      .node_at(&parsed)
      .ok_or_else(|| ViewerError::NotFound(path.to_string()))?;
    Ok(NodeMeta {
      path: parsed.render(&self.config.root_name),
      depth: parsed.depth(),
      key: parsed
        .last()
        .cloned()
        .unwrap_or_else(|| JsonPathSegment::Key(self.config.root_name.clone())),
      kind: node.kind(),
      children_count: node.child_count(),
    })
  }

  /// Report the node at `path` to the observer.
  pub fn select(&mut self, path: &str) -> Result<NodeMeta, ViewerError> {
    let meta = self.node_meta(path)?;
    self.emit(ViewerEvent::Select {
      path: meta.path.clone(),
      meta: meta.clone(),
    });
    Ok(meta)
  }

  /// A click on a row: containers toggle, then the node is selected.
  pub fn activate(&mut self, path: &str) -> Result<NodeMeta, ViewerError> {
    let meta = self.node_meta(path)?;
    if meta.kind.is_container() {
      self.toggle(&meta.path);
    }
    self.emit(ViewerEvent::Select {
      path: meta.path.clone(),
      meta: meta.clone(),
    });
    Ok(meta)
  }

  // ---- inline editing ----

  pub fn editor(&self) -> Option<&InlineEdit> {
    self.editor.as_ref()
  }

  pub fn begin_edit(&mut self, path: &str) -> Result<&InlineEdit, ViewerError> {
    if !self.config.editable {
      return Err(ViewerError::NotEditable("viewer is read-only".to_string()));
    }
    let parsed = self.parse_path(path);
    let value = self
      .doc
      .get(&parsed)
      .ok_or_else(|| ViewerError::NotFound(path.to_string()))?;
    let edit = InlineEdit::begin(parsed, &value)?;
    Ok(&*self.editor.insert(edit))
  }

  pub fn edit_text(&mut self, text: impl Into<String>) -> Result<(), ViewerError> {
    let editor = self
      .editor
      .as_mut()
      .ok_or_else(|| ViewerError::InvalidArg("no edit in progress".to_string()))?;
    editor.set_text(text);
    Ok(())
  }

  /// Validate and apply the editor text. A rejected edit keeps the editor open.
  pub fn commit_edit(&mut self) -> Result<Value, ViewerError> {
    let editor = self
      .editor
      .as_mut()
      .ok_or_else(|| ViewerError::InvalidArg("no edit in progress".to_string()))?;
    let value = match editor.commit() {
      Ok(v) => v,
      Err(e) => {
        self.emit(ViewerEvent::Error(e.clone()));
        return Err(e);
      }
    };
    let path = editor.path().clone();
    self.editor = None;
    self.set_at(&path, value.clone())?;
    Ok(value)
  }

  pub fn cancel_edit(&mut self) {
    self.editor = None;
  }

  // ---- clipboard ----

  pub fn copy_value(
    &mut self,
    path: &str,
    clipboard: &mut dyn Clipboard,
  ) -> Result<(), ViewerError> {
    let value = self
      .get(path)
      .ok_or_else(|| ViewerError::NotFound(path.to_string()))?;
    self.write_clipboard(clipboard, &copy_text(&value))
  }

  pub fn copy_path(
    &mut self,
    path: &str,
    clipboard: &mut dyn Clipboard,
  ) -> Result<(), ViewerError> {
    let rendered = self.parse_path(path).render(&self.config.root_name);
    self.write_clipboard(clipboard, &rendered)
  }

  fn write_clipboard(
    &mut self,
    clipboard: &mut dyn Clipboard,
    text: &str,
  ) -> Result<(), ViewerError> {
    clipboard.write_text(text).map_err(|msg| {
      let e = ViewerError::Clipboard(msg);
      self.emit(ViewerEvent::Error(e.clone()));
      e
    })
  }

  // ---- rendering ----

  /// The flattened row list for the current state, rebuilt only when something changed.
  pub fn rows(&mut self) -> &[TreeRow] {
    self.ensure_rows();
    &self.rows
  }

  fn ensure_rows(&mut self) {
    if !self.rows_dirty {
      return;
    }
    let started = Instant::now();
    let opts = self.config.render_options();
    let prepared = PreparedSearch::new(&self.query);
    self.rows = flatten_rows(
      self.doc.root(),
      &self.expansion,
      prepared.as_ref(),
      &opts,
      &self.loaded,
    );
    self.last_render = started.elapsed();
    if let Some(v) = self.virtualizer.as_mut() {
      v.set_item_count(self.rows.len());
    }
    self.rows_dirty = false;
    trace!(rows = self.rows.len(), elapsed = ?self.last_render, "rows rebuilt");
  }

  /// Reveal the next window of children under a lazily windowed parent.
  pub fn load_more(&mut self, path: &str) {
    let step = self.config.performance.max_initial_render.max(1);
    let path = self.canonical_path(path);
    let shown = self.loaded.entry(path).or_insert(step);
    *shown += step;
    self.rows_dirty = true;
  }

  pub fn enable_virtualization(&mut self, enabled: bool) {
    self.config.performance.enable_virtualization = enabled;
    self.virtualizer = enabled.then(|| Virtualizer::new(self.config.virtualizer_options(0)));
    self.rows_dirty = true;
  }

  pub fn scroll_to(&mut self, scroll_top: f64) {
    if let Some(v) = self.virtualizer.as_mut() {
      v.set_scroll_top(scroll_top);
    }
  }

  pub fn set_viewport_height(&mut self, height: f64) {
    self.config.performance.container_height = height;
    if let Some(v) = self.virtualizer.as_mut() {
      v.set_container_height(height);
    }
  }

  /// Record the rendered height of row `index`.
  pub fn measure_row(&mut self, index: usize, size: f64) {
    if let Some(v) = self.virtualizer.as_mut() {
      v.measure(index, size);
    }
  }

  /// Rows to paint with their offsets. Without virtualization every row is returned, laid out
  /// at the configured item height.
  pub fn visible_rows(&mut self) -> Vec<(VirtualItem, &TreeRow)> {
    self.ensure_rows();
    let rows = &self.rows;
    match &self.virtualizer {
      Some(v) => v
        .virtual_items()
        .iter()
        .filter_map(|item| rows.get(item.index).map(|row| (*item, row)))
        .collect(),
      None => {
        let size = self.config.performance.virtual_item_height;
        rows
          .iter()
          .enumerate()
          .map(|(index, row)| {
            let start = index as f64 * size;
            (
              VirtualItem {
                index,
                start,
                size,
                end: start + size,
              },
              row,
            )
          })
          .collect()
      }
    }
  }

  /// Height of the full scrollable content.
  pub fn total_size(&mut self) -> f64 {
    self.ensure_rows();
    match &self.virtualizer {
      Some(v) => v.total_size(),
      None => self.rows.len() as f64 * self.config.performance.virtual_item_height,
    }
  }

  /// Stats as of the last render.
  pub fn performance_stats(&self) -> PerformanceStats {
    let rendered_nodes = match self.virtualizer.as_ref().and_then(|v| v.visible_range()) {
      Some(range) => self
        .rows
        .iter()
        .enumerate()
        .filter(|(i, row)| range.contains(*i) && row.as_node().is_some())
        .count(),
      None => self.rows.iter().filter(|r| r.as_node().is_some()).count(),
    };
    PerformanceStats {
      total_nodes: self.total_nodes,
      rendered_nodes,
      search_matches: self.matches.match_count,
      render_time_ms: self.last_render.as_secs_f64() * 1000.0,
      memory_usage_bytes: Some(self.doc.approx_bytes()),
    }
  }
}

fn resolve_input(input: DocumentInput) -> (Value, Option<ViewerError>) {
  match input {
    DocumentInput::Value(v) => (v, None),
    DocumentInput::Text(text) => parse_document(&text),
  }
}
