//! Flattening of the expanded tree into the row list a renderer paints.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  expansion::ExpansionState,
  inspect::{display_value, JsonNode},
  models::{JsonNodeKind, JsonPathSegment},
  path::{JsonPath, DEFAULT_ROOT_NAME},
  search_match::{Highlight, PreparedSearch},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeRow {
  pub path: String,
  pub depth: usize,
  pub key: JsonPathSegment,
  pub kind: JsonNodeKind,
  pub children_count: usize,
  pub expandable: bool,
  pub expanded: bool,
  pub highlight: Highlight,
  pub display: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TreeRow {
  Node(NodeRow),
  /// Children beyond the per-node cap, shown as "... (N more items hidden)".
  MoreHidden {
    parent_path: String,
    depth: usize,
    hidden: usize,
  },
  /// A lazily windowed parent that can reveal more children on request.
  LoadMore {
    parent_path: String,
    depth: usize,
    remaining: usize,
  },
}

impl TreeRow {
  pub fn depth(&self) -> usize {
    match self {
      TreeRow::Node(n) => n.depth,
      TreeRow::MoreHidden { depth, .. } | TreeRow::LoadMore { depth, .. } => *depth,
    }
  }

  pub fn as_node(&self) -> Option<&NodeRow> {
    match self {
      TreeRow::Node(n) => Some(n),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LazyWindow {
  /// Parents with more children than this start windowed.
  pub threshold: usize,
  /// Children shown before the first "load more".
  pub initial: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
  pub root_name: String,
  pub max_render_depth: usize,
  pub max_nodes: usize,
  pub lazy: Option<LazyWindow>,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      root_name: DEFAULT_ROOT_NAME.to_string(),
      max_render_depth: 6,
      max_nodes: 2000,
      lazy: None,
    }
  }
}

enum Work<N> {
  Node {
    node: N,
    path: JsonPath,
    key: JsonPathSegment,
    depth: usize,
  },
  Marker(TreeRow),
}

/// Pre-order walk emitting one row per visible node plus truncation markers.
///
/// `loaded` holds the widened child window of lazily windowed parents, keyed by rendered path.
pub fn flatten_rows<'a, N: JsonNode<'a>>(
  doc: N,
  expansion: &ExpansionState,
  search: Option<&PreparedSearch>,
  opts: &RenderOptions,
  loaded: &HashMap<String, usize>,
) -> Vec<TreeRow> {
  let mut rows = Vec::new();
  let mut stack = vec![Work::Node {
    node: doc,
    path: JsonPath::root(),
    key: JsonPathSegment::Key(opts.root_name.clone()),
    depth: 0,
  }];

  while let Some(work) = stack.pop() {
    let (node, path, key, depth) = match work {
      Work::Marker(row) => {
        rows.push(row);
        continue;
      }
      Work::Node {
        node,
        path,
        key,
        depth,
      } => (node, path, key, depth),
    };

    let rendered = path.render(&opts.root_name);
    let expandable = node.is_expandable();
    let expanded = expandable && expansion.is_expanded(&rendered);
    let children_count = node.child_count();
    let highlight = match search {
      Some(s) => s.highlight((!path.is_root()).then_some(&key), node),
      None => Highlight::default(),
    };

    if expanded && depth <= opts.max_render_depth {
      let cap = children_count.min(opts.max_nodes);
      let shown = match opts.lazy {
        Some(lazy) if children_count > lazy.threshold => {
          cap.min(loaded.get(&rendered).copied().unwrap_or(lazy.initial))
        }
        _ => cap,
      };

      // Stack order: markers are pushed first so they pop after the children.
      if children_count > cap {
        stack.push(Work::Marker(TreeRow::MoreHidden {
          parent_path: rendered.clone(),
          depth: depth + 1,
          hidden: children_count - cap,
        }));
      }
      if shown < cap {
        stack.push(Work::Marker(TreeRow::LoadMore {
          parent_path: rendered.clone(),
          depth: depth + 1,
          remaining: cap - shown,
        }));
      }
      let children: Vec<_> = node.children().take(shown).collect();
      for (seg, child) in children.into_iter().rev() {
        stack.push(Work::Node {
          node: child,
          path: path.child(seg.clone()),
          key: seg,
          depth: depth + 1,
        });
      }
    }

    rows.push(TreeRow::Node(NodeRow {
      path: rendered,
      depth,
      key,
      kind: node.kind(),
      children_count,
      expandable,
      expanded,
      highlight,
      display: display_value(node),
    }));
  }
  rows
}
