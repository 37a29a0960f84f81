use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JsonNodeKind {
  Null,
  Array,
  Object,
  String,
  Number,
  Boolean,
}

impl JsonNodeKind {
  pub fn is_container(self) -> bool {
    matches!(self, JsonNodeKind::Array | JsonNodeKind::Object)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      JsonNodeKind::Null => "null",
      JsonNodeKind::Array => "array",
      JsonNodeKind::Object => "object",
      JsonNodeKind::String => "string",
      JsonNodeKind::Number => "number",
      JsonNodeKind::Boolean => "boolean",
    }
  }
}

/// One step of a node address: an object key or an array index.
///
/// Serialized untagged, so a path crosses IPC as a plain array like `["foo", 0, "bar"]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum JsonPathSegment {
  Key(String),
  Index(usize),
}

impl JsonPathSegment {
  pub fn is_index(&self) -> bool {
    matches!(self, JsonPathSegment::Index(_))
  }
}

impl fmt::Display for JsonPathSegment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      JsonPathSegment::Key(k) => f.write_str(k),
      JsonPathSegment::Index(i) => write!(f, "{i}"),
    }
  }
}

impl From<&str> for JsonPathSegment {
  fn from(k: &str) -> Self {
    JsonPathSegment::Key(k.to_string())
  }
}

impl From<String> for JsonPathSegment {
  fn from(k: String) -> Self {
    JsonPathSegment::Key(k)
  }
}

impl From<usize> for JsonPathSegment {
  fn from(i: usize) -> Self {
    JsonPathSegment::Index(i)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
  pub session_id: String,
  pub root_name: String,
  pub created_at_ms: i64,
}

/// Metadata handed to the host when a node is selected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeMeta {
  pub path: String,
  pub depth: usize,
  pub key: JsonPathSegment,
  pub kind: JsonNodeKind,
  pub children_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChildItem {
  pub seg: JsonPathSegment,
  pub path: String,
  pub kind: JsonNodeKind,
  pub children_count: usize,
  pub preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenPage {
  pub items: Vec<ChildItem>,
  pub next_cursor: Option<String>,
  pub reached_end: bool,
}

/// One row of a windowed list: offsets are in the host's layout unit (usually px).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VirtualItem {
  pub index: usize,
  pub start: f64,
  pub size: f64,
  pub end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceStats {
  pub total_nodes: usize,
  pub rendered_nodes: usize,
  pub search_matches: usize,
  pub render_time_ms: f64,
  pub memory_usage_bytes: Option<u64>,
}
