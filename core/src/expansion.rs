use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{inspect::JsonNode, path::JsonPath};

/// Depth bound used by expand-all when none is given.
pub const DEFAULT_EXPAND_DEPTH: usize = 10;

/// Initial expansion of a freshly opened document.
///
/// Deserializes from `true` (everything collapsed), `false` (expand all) or a depth.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Collapsed {
  Flag(bool),
  Depth(usize),
}

impl Default for Collapsed {
  fn default() -> Self {
    Collapsed::Flag(false)
  }
}

/// The set of open node paths, keyed by rendered path.
#[derive(Debug, Clone)]
pub struct ExpansionState {
  root_name: String,
  paths: HashSet<String>,
}

impl ExpansionState {
  pub fn new(root_name: impl Into<String>) -> Self {
    Self {
      root_name: root_name.into(),
      paths: HashSet::new(),
    }
  }

  pub fn initial<'a, N: JsonNode<'a>>(doc: N, root_name: &str, collapsed: Collapsed) -> Self {
    let mut state = Self::new(root_name);
    match collapsed {
      Collapsed::Flag(true) => {}
      Collapsed::Flag(false) => state.expand_all(doc, DEFAULT_EXPAND_DEPTH),
      Collapsed::Depth(depth) => state.expand_all(doc, depth),
    }
    state
  }

  pub fn root_name(&self) -> &str {
    &self.root_name
  }

  pub fn is_expanded(&self, path: &str) -> bool {
    self.paths.contains(path)
  }

  /// Flip one path. Collapsing also closes every open descendant. Returns the new state.
  pub fn toggle(&mut self, path: &str) -> bool {
    if self.paths.contains(path) {
      self.collapse(path);
      false
    } else {
      self.paths.insert(path.to_string());
      true
    }
  }

  pub fn expand(&mut self, path: &str) {
    self.paths.insert(path.to_string());
  }

  pub fn collapse(&mut self, path: &str) {
    self.paths.remove(path);
    let dot = format!("{path}.");
    let bracket = format!("{path}[");
    self
      .paths
      .retain(|p| !p.starts_with(&dot) && !p.starts_with(&bracket));
  }

  /// Replace the set with every expandable node within `max_depth` levels of the root.
  pub fn expand_all<'a, N: JsonNode<'a>>(&mut self, doc: N, max_depth: usize) {
    let mut paths = HashSet::new();
    let mut stack = vec![(doc, JsonPath::root())];
    while let Some((node, path)) = stack.pop() {
      if path.depth() >= max_depth || !node.is_expandable() {
        continue;
      }
      for (seg, child) in node.children() {
        if child.is_expandable() {
          stack.push((child, path.child(seg)));
        }
      }
      paths.insert(path.render(&self.root_name));
    }
    debug!(expanded = paths.len(), max_depth, "expand all");
    self.paths = paths;
  }

  pub fn collapse_all(&mut self) {
    self.paths.clear();
  }

  /// Union `paths` into the set, e.g. the ancestors a search needs revealed.
  pub fn merge<I, S>(&mut self, paths: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.paths.extend(paths.into_iter().map(Into::into));
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  pub fn paths(&self) -> impl Iterator<Item = &str> {
    self.paths.iter().map(String::as_str)
  }
}
