use serde_json::{Number, Value};
use tracing::warn;

use crate::{
  engine::ViewerError,
  inspect::{classify, is_expandable},
  path::{JsonPath, DEFAULT_ROOT_NAME},
};

/// Lenient parse of user-typed text.
///
/// JSON first, then bare `true` / `false` / `null` / finite numbers, then the raw text as a
/// string. Blank input is the empty string. Never fails.
pub fn safe_parse(input: &str) -> Value {
  if input.trim().is_empty() {
    return Value::String(String::new());
  }
  if let Ok(v) = serde_json::from_str::<Value>(input) {
    return v;
  }
  primitive_fallback(input)
}

fn primitive_fallback(input: &str) -> Value {
  let trimmed = input.trim();
  match trimmed {
    "true" => return Value::Bool(true),
    "false" => return Value::Bool(false),
    "null" => return Value::Null,
    _ => {}
  }
  if let Ok(n) = trimmed.parse::<f64>() {
    if let Some(num) = Number::from_f64(n) {
      return Value::Number(num);
    }
  }
  Value::String(input.to_string())
}

/// Parse document text. Invalid JSON is reported alongside the lenient fallback value so the
/// viewer can still show something.
pub fn parse_document(text: &str) -> (Value, Option<ViewerError>) {
  match serde_json::from_str::<Value>(text) {
    Ok(v) => (v, None),
    Err(e) => {
      warn!(error = %e, "document is not valid JSON, showing fallback value");
      (safe_parse(text), Some(ViewerError::Parse(e.to_string())))
    }
  }
}

/// Editor state for one scalar node.
#[derive(Debug, Clone)]
pub struct InlineEdit {
  path: JsonPath,
  original: Value,
  text: String,
  error: Option<String>,
}

impl InlineEdit {
  /// Only scalars (and null) are edited inline.
  pub fn begin(path: JsonPath, value: &Value) -> Result<Self, ViewerError> {
    if is_expandable(value) {
      return Err(ViewerError::NotEditable(format!(
        "{} is an {}",
        path.render(DEFAULT_ROOT_NAME),
        classify(value).as_str()
      )));
    }
    let text = serde_json::to_string(value).unwrap_or_default();
    Ok(Self {
      path,
      original: value.clone(),
      text,
      error: None,
    })
  }

  pub fn path(&self) -> &JsonPath {
    &self.path
  }

  pub fn original(&self) -> &Value {
    &self.original
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn set_text(&mut self, text: impl Into<String>) {
    self.text = text.into();
    self.error = None;
  }

  /// Message of the last failed commit, for display next to the editor.
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// Text that opens like JSON (`{`, `[` or `"`) must parse as JSON; anything else is parsed
  /// leniently.
  pub fn commit(&mut self) -> Result<Value, ViewerError> {
    let trimmed = self.text.trim_start();
    if trimmed.starts_with(['{', '[', '"']) {
      return match serde_json::from_str::<Value>(&self.text) {
        Ok(v) => {
          self.error = None;
          Ok(v)
        }
        Err(e) => {
          let msg = e.to_string();
          self.error = Some(msg.clone());
          Err(ViewerError::EditValidation(msg))
        }
      };
    }
    self.error = None;
    Ok(safe_parse(&self.text))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn safe_parse_falls_back_to_primitives_and_text() {
    assert_eq!(safe_parse("{\"a\":1}"), json!({"a": 1}));
    assert_eq!(safe_parse("  "), json!(""));
    assert_eq!(safe_parse(" true "), json!(true));
    assert_eq!(safe_parse(" 12.5 "), json!(12.5));
    assert_eq!(safe_parse("hello world"), json!("hello world"));
    assert_eq!(safe_parse("NaN"), json!("NaN"));
  }

  #[test]
  fn malformed_structured_edit_is_rejected() {
    let mut edit = InlineEdit::begin(JsonPath::root().child("a"), &json!("x")).unwrap();
    assert_eq!(edit.text(), "\"x\"");
    edit.set_text("{\"broken\": ");
    assert!(matches!(edit.commit(), Err(ViewerError::EditValidation(_))));
    assert!(edit.error().is_some());

    edit.set_text("42");
    assert_eq!(edit.commit().unwrap(), json!(42));
    assert!(edit.error().is_none());
  }
}
