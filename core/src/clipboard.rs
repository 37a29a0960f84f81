use serde_json::Value;

/// Host clipboard. The platform call lives in the host; an `Err` is its failure message.
pub trait Clipboard {
  fn write_text(&mut self, text: &str) -> Result<(), String>;
}

/// Text copied for a node: raw text for strings, compact JSON for everything else.
pub fn copy_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => serde_json::to_string(other).unwrap_or_default(),
  }
}
