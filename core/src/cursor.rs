use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::engine::ViewerError;

/// Position inside a node's child list, handed to the host as an opaque token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct Cursor {
  pub index: u64,
}

pub(crate) fn encode_cursor(c: Cursor) -> String {
  let json = serde_json::to_vec(&c)
    .unwrap_or_else(|_| format!("{{\"index\":{}}}", c.index).into_bytes());
  base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}

pub(crate) fn decode_cursor(token: Option<&str>) -> Result<Cursor, ViewerError> {
  match token {
    None => Ok(Cursor { index: 0 }),
    Some(t) if t.is_empty() => Ok(Cursor { index: 0 }),
    Some(t) => {
      let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(t)
        .map_err(|e| ViewerError::BadCursor(e.to_string()))?;
      let c: Cursor =
        serde_json::from_slice(&bytes).map_err(|e| ViewerError::BadCursor(e.to_string()))?;
      Ok(c)
    }
  }
}
