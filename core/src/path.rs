//! Canonical node addressing.
//!
//! A path is a sequence of [`JsonPathSegment`]s relative to the document root. Its string form is
//! rooted at a caller-chosen name, e.g. `root.users[0]["display name"]`.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{engine::ViewerError, inspect::classify, models::JsonPathSegment};

pub const DEFAULT_ROOT_NAME: &str = "root";

/// Largest gap `set` will fill with `null`s when an index lies past the end of an array.
const MAX_ARRAY_GAP: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPath {
  segments: Vec<JsonPathSegment>,
}

impl JsonPath {
  pub fn root() -> Self {
    Self::default()
  }

  pub fn new(segments: Vec<JsonPathSegment>) -> Self {
    Self { segments }
  }

  /// Parse a rendered path. A leading plain token equal to `root_name` denotes the root itself.
  pub fn parse(path: &str, root_name: &str) -> Self {
    Self::new(decode_rooted(path, root_name))
  }

  pub fn segments(&self) -> &[JsonPathSegment] {
    &self.segments
  }

  pub fn depth(&self) -> usize {
    self.segments.len()
  }

  pub fn is_root(&self) -> bool {
    self.segments.is_empty()
  }

  pub fn last(&self) -> Option<&JsonPathSegment> {
    self.segments.last()
  }

  pub fn push(&mut self, seg: impl Into<JsonPathSegment>) {
    self.segments.push(seg.into());
  }

  pub fn child(&self, seg: impl Into<JsonPathSegment>) -> Self {
    let mut out = self.clone();
    out.push(seg);
    out
  }

  pub fn parent(&self) -> Option<Self> {
    let (_, init) = self.segments.split_last()?;
    Some(Self::new(init.to_vec()))
  }

  /// Strict ancestors, root first.
  pub fn ancestors(&self) -> impl Iterator<Item = JsonPath> + '_ {
    (0..self.segments.len()).map(move |n| Self::new(self.segments[..n].to_vec()))
  }

  pub fn starts_with(&self, other: &JsonPath) -> bool {
    self.segments.starts_with(&other.segments)
  }

  pub fn render(&self, root_name: &str) -> String {
    let mut out = String::with_capacity(root_name.len() + self.segments.len() * 8);
    out.push_str(root_name);
    for seg in &self.segments {
      push_segment(&mut out, seg);
    }
    out
  }
}

impl From<Vec<JsonPathSegment>> for JsonPath {
  fn from(segments: Vec<JsonPathSegment>) -> Self {
    Self::new(segments)
  }
}

/// Append one segment to an already-rendered path.
///
/// An empty parent yields the bare segment text. Keys are quoted verbatim: a key containing `"`
/// produces a path that does not decode back to the same key.
pub fn encode(parent: &str, seg: &JsonPathSegment) -> String {
  let mut out = String::with_capacity(parent.len() + 8);
  out.push_str(parent);
  push_segment(&mut out, seg);
  out
}

fn push_segment(out: &mut String, seg: &JsonPathSegment) {
  if out.is_empty() {
    let _ = write!(out, "{seg}");
    return;
  }
  match seg {
    JsonPathSegment::Index(i) => {
      let _ = write!(out, "[{i}]");
    }
    JsonPathSegment::Key(k) if is_identifier(k) => {
      out.push('.');
      out.push_str(k);
    }
    JsonPathSegment::Key(k) => {
      out.push_str("[\"");
      out.push_str(k);
      out.push_str("\"]");
    }
  }
}

pub fn is_identifier(key: &str) -> bool {
  let mut chars = key.chars();
  match chars.next() {
    Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
    _ => return false,
  }
  chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Split a rendered path into segments, treating a leading `root` token as the root.
pub fn decode(path: &str) -> Vec<JsonPathSegment> {
  decode_rooted(path, DEFAULT_ROOT_NAME)
}

/// Best-effort scanner: malformed input degrades to whatever segments can be recovered.
pub fn decode_rooted(path: &str, root_name: &str) -> Vec<JsonPathSegment> {
  if path.is_empty() || path == root_name {
    return vec![];
  }

  let mut tokens = scan(path);
  if matches!(tokens.first(), Some(Token::Plain(t)) if t == root_name) {
    tokens.remove(0);
  }
  tokens.into_iter().map(Token::into_segment).collect()
}

#[derive(Debug)]
enum Token {
  Plain(String),
  Bracket(String),
  Quoted(String),
}

impl Token {
  fn into_segment(self) -> JsonPathSegment {
    match self {
      Token::Plain(s) | Token::Quoted(s) => JsonPathSegment::Key(s),
      Token::Bracket(s) => match s.parse::<usize>() {
        Ok(i) => JsonPathSegment::Index(i),
        Err(_) => JsonPathSegment::Key(s),
      },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
  Plain,
  Bracket,
  Quote(char),
}

fn scan(path: &str) -> Vec<Token> {
  let mut tokens = Vec::new();
  let mut cur = String::new();
  let mut quoted = false;
  let mut state = ScanState::Plain;

  for c in path.chars() {
    match state {
      ScanState::Plain => match c {
        '.' => {
          if !cur.is_empty() {
            tokens.push(Token::Plain(std::mem::take(&mut cur)));
          }
        }
        '[' => {
          if !cur.is_empty() {
            tokens.push(Token::Plain(std::mem::take(&mut cur)));
          }
          state = ScanState::Bracket;
        }
        _ => cur.push(c),
      },
      ScanState::Bracket => match c {
        '"' | '\'' => {
          quoted = true;
          state = ScanState::Quote(c);
        }
        ']' => {
          if quoted {
            tokens.push(Token::Quoted(std::mem::take(&mut cur)));
          } else if !cur.is_empty() {
            tokens.push(Token::Bracket(std::mem::take(&mut cur)));
          }
          quoted = false;
          state = ScanState::Plain;
        }
        _ => cur.push(c),
      },
      ScanState::Quote(q) => {
        if c == q {
          state = ScanState::Bracket;
        } else {
          cur.push(c);
        }
      }
    }
  }

  // Unterminated trailing token is kept as a key.
  if !cur.is_empty() || quoted {
    tokens.push(Token::Plain(cur));
  }
  tokens
}

/// Resolve `path` against `doc`. Any missing step yields `None`.
pub fn get<'a>(doc: &'a Value, path: &JsonPath) -> Option<&'a Value> {
  path.segments().iter().try_fold(doc, step)
}

fn step<'a>(cur: &'a Value, seg: &JsonPathSegment) -> Option<&'a Value> {
  match (cur, seg) {
    (Value::Object(map), JsonPathSegment::Key(k)) => map.get(k),
    (Value::Object(map), JsonPathSegment::Index(i)) => map.get(&i.to_string()),
    (Value::Array(items), JsonPathSegment::Index(i)) => items.get(*i),
    (Value::Array(items), JsonPathSegment::Key(k)) => {
      k.parse::<usize>().ok().and_then(|i| items.get(i))
    }
    _ => None,
  }
}

/// Copy-on-write replace of the value at `path`.
///
/// Missing or null intermediates become `[]` when the following segment is an index and `{}`
/// otherwise. The identity path replaces the whole document.
pub fn set(doc: &Value, path: &JsonPath, value: Value) -> Result<Value, ViewerError> {
  if path.is_root() {
    return Ok(value);
  }

  let mut result = doc.clone();
  let mut cur = &mut result;
  for (depth, seg) in path.segments().iter().enumerate() {
    if cur.is_null() {
      *cur = empty_container_for(seg);
    }
    cur = slot_mut(cur, seg, || JsonPath::new(path.segments()[..depth].to_vec()))?;
  }
  *cur = value;
  Ok(result)
}

pub(crate) fn empty_container_for(seg: &JsonPathSegment) -> Value {
  match seg {
    JsonPathSegment::Index(_) => Value::Array(Vec::new()),
    JsonPathSegment::Key(_) => Value::Object(Map::new()),
  }
}

fn slot_mut<'a>(
  cur: &'a mut Value,
  seg: &JsonPathSegment,
  at: impl Fn() -> JsonPath,
) -> Result<&'a mut Value, ViewerError> {
  let kind = classify(cur);
  match (cur, seg) {
    (Value::Object(map), JsonPathSegment::Key(k)) => {
      Ok(map.entry(k.clone()).or_insert(Value::Null))
    }
    (Value::Object(map), JsonPathSegment::Index(i)) => {
      Ok(map.entry(i.to_string()).or_insert(Value::Null))
    }
    (Value::Array(items), JsonPathSegment::Index(i)) => array_slot(items, *i, &at),
    (Value::Array(items), JsonPathSegment::Key(k)) => match k.parse::<usize>() {
      Ok(i) => array_slot(items, i, &at),
      Err(_) => Err(ViewerError::KeyOnArray {
        path: at().render(DEFAULT_ROOT_NAME),
        key: k.clone(),
      }),
    },
    _ => Err(ViewerError::NotAContainer {
      path: at().render(DEFAULT_ROOT_NAME),
      kind,
    }),
  }
}

fn array_slot<'a>(
  items: &'a mut Vec<Value>,
  index: usize,
  at: &impl Fn() -> JsonPath,
) -> Result<&'a mut Value, ViewerError> {
  if index >= items.len() {
    if index - items.len() > MAX_ARRAY_GAP {
      return Err(ViewerError::InvalidArg(format!(
        "index {} is too far past the end of array at {} (len {})",
        index,
        at().render(DEFAULT_ROOT_NAME),
        items.len()
      )));
    }
    items.resize(index + 1, Value::Null);
  }
  Ok(&mut items[index])
}
