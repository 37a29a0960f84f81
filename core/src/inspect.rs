use std::borrow::Cow;

use serde_json::Value;

use crate::models::{JsonNodeKind, JsonPathSegment};

/// Read-only view of a JSON node, implemented for `&Value` and for the session's arena
/// ([`crate::tree::NodeRef`]) so the matcher, the expansion model and the row flattener can walk
/// either representation.
pub trait JsonNode<'a>: Copy + 'a {
  fn kind(self) -> JsonNodeKind;

  fn child_count(self) -> usize;

  /// Canonical text of a string, number or boolean. `None` for null and containers.
  fn scalar_text(self) -> Option<Cow<'a, str>>;

  /// Direct children in document order.
  fn children(self) -> Box<dyn Iterator<Item = (JsonPathSegment, Self)> + 'a>;

  fn child(self, seg: &JsonPathSegment) -> Option<Self>;

  fn to_value(self) -> Value;

  fn is_expandable(self) -> bool {
    self.kind().is_container()
  }
}

impl<'a> JsonNode<'a> for &'a Value {
  fn kind(self) -> JsonNodeKind {
    classify(self)
  }

  fn child_count(self) -> usize {
    child_count(self)
  }

  fn scalar_text(self) -> Option<Cow<'a, str>> {
    match self {
      Value::String(s) => Some(Cow::Borrowed(s.as_str())),
      Value::Number(n) => Some(Cow::Owned(n.to_string())),
      Value::Bool(true) => Some(Cow::Borrowed("true")),
      Value::Bool(false) => Some(Cow::Borrowed("false")),
      Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
  }

  fn children(self) -> Box<dyn Iterator<Item = (JsonPathSegment, Self)> + 'a> {
    match self {
      Value::Array(items) => Box::new(
        items
          .iter()
          .enumerate()
          .map(|(i, v)| (JsonPathSegment::Index(i), v)),
      ),
      Value::Object(map) => Box::new(
        map
          .iter()
          .map(|(k, v)| (JsonPathSegment::Key(k.clone()), v)),
      ),
      _ => Box::new(std::iter::empty()),
    }
  }

  fn child(self, seg: &JsonPathSegment) -> Option<Self> {
    crate::path::get(self, &crate::path::JsonPath::new(vec![seg.clone()]))
  }

  fn to_value(self) -> Value {
    self.clone()
  }
}

/// Null is tested first: at the JSON level it is neither a container nor a scalar.
pub fn classify(value: &Value) -> JsonNodeKind {
  match value {
    Value::Null => JsonNodeKind::Null,
    Value::Array(_) => JsonNodeKind::Array,
    Value::Object(_) => JsonNodeKind::Object,
    Value::String(_) => JsonNodeKind::String,
    Value::Number(_) => JsonNodeKind::Number,
    Value::Bool(_) => JsonNodeKind::Boolean,
  }
}

pub fn is_expandable(value: &Value) -> bool {
  classify(value).is_container()
}

pub fn child_count(value: &Value) -> usize {
  match value {
    Value::Array(items) => items.len(),
    Value::Object(map) => map.len(),
    _ => 0,
  }
}

pub fn scalar_text(value: &Value) -> Option<String> {
  JsonNode::scalar_text(value).map(Cow::into_owned)
}

/// Short label the tree shows next to a key: quoted strings, `{N properties}`, `[N items]`.
pub fn display_value<'a, N: JsonNode<'a>>(node: N) -> String {
  match node.kind() {
    JsonNodeKind::Null => "null".to_string(),
    JsonNodeKind::Object => {
      let n = node.child_count();
      format!("{{{} {}}}", n, if n == 1 { "property" } else { "properties" })
    }
    JsonNodeKind::Array => {
      let n = node.child_count();
      format!("[{} {}]", n, if n == 1 { "item" } else { "items" })
    }
    JsonNodeKind::String => format!("\"{}\"", node.scalar_text().unwrap_or_default()),
    JsonNodeKind::Number | JsonNodeKind::Boolean => {
      node.scalar_text().map(Cow::into_owned).unwrap_or_default()
    }
  }
}
