use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  inspect::JsonNode,
  models::JsonPathSegment,
  path::JsonPath,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
  pub text: String,
  pub case_sensitive: bool,
  /// Stop recording matches after this many.
  pub max_hits: usize,
  /// Nodes deeper than this are not visited.
  pub max_depth: usize,
}

impl Default for SearchQuery {
  fn default() -> Self {
    Self {
      text: String::new(),
      case_sensitive: false,
      max_hits: 10_000,
      max_depth: 256,
    }
  }
}

impl SearchQuery {
  pub fn new(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      ..Self::default()
    }
  }
}

/// A query normalized once so every node test is a plain substring check.
#[derive(Debug, Clone)]
pub struct PreparedSearch {
  needle: String,
  case_sensitive: bool,
}

impl PreparedSearch {
  /// `None` for an empty or whitespace-only query.
  pub fn new(query: &SearchQuery) -> Option<Self> {
    if query.text.trim().is_empty() {
      return None;
    }
    let needle = if query.case_sensitive {
      query.text.clone()
    } else {
      query.text.to_lowercase()
    };
    Some(Self {
      needle,
      case_sensitive: query.case_sensitive,
    })
  }

  fn contains(&self, hay: &str) -> bool {
    if self.case_sensitive {
      hay.contains(&self.needle)
    } else {
      hay.to_lowercase().contains(&self.needle)
    }
  }

  pub fn key_matches(&self, key: &JsonPathSegment) -> bool {
    match key {
      JsonPathSegment::Key(k) => self.contains(k),
      JsonPathSegment::Index(i) => self.contains(&i.to_string()),
    }
  }

  /// Only strings, numbers and booleans match on their value.
  pub fn value_matches<'a, N: JsonNode<'a>>(&self, node: N) -> bool {
    node.scalar_text().is_some_and(|t| self.contains(&t))
  }

  pub fn highlight<'a, N: JsonNode<'a>>(
    &self,
    key: Option<&JsonPathSegment>,
    node: N,
  ) -> Highlight {
    Highlight {
      key: key.is_some_and(|k| self.key_matches(k)),
      value: self.value_matches(node),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Highlight {
  pub key: bool,
  pub value: bool,
}

impl Highlight {
  pub fn any(self) -> bool {
    self.key || self.value
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchHit {
  pub path: JsonPath,
  pub on_key: bool,
  pub on_value: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SearchMatches {
  pub query: String,
  pub match_count: usize,
  /// Rendered paths of every matching node.
  pub matched: HashSet<String>,
  /// Matches in document order.
  pub hits: Vec<SearchHit>,
  /// Strict ancestors of every match, plus the root.
  pub required_expansion: HashSet<String>,
  pub truncated: bool,
}

impl SearchMatches {
  pub fn is_match(&self, path: &str) -> bool {
    self.matched.contains(path)
  }
}

/// Depth-first search of `doc` in document order.
pub fn search<'a, N: JsonNode<'a>>(doc: N, query: &SearchQuery, root_name: &str) -> SearchMatches {
  let mut out = SearchMatches {
    query: query.text.clone(),
    ..SearchMatches::default()
  };
  let Some(prepared) = PreparedSearch::new(query) else {
    return out;
  };

  let mut stack: Vec<(N, JsonPath)> = vec![(doc, JsonPath::root())];
  while let Some((node, path)) = stack.pop() {
    let hl = prepared.highlight(path.last(), node);
    if hl.any() {
      if out.match_count >= query.max_hits {
        out.truncated = true;
        break;
      }
      out.match_count += 1;
      out.matched.insert(path.render(root_name));
      out
        .required_expansion
        .extend(path.ancestors().map(|a| a.render(root_name)));
      out.hits.push(SearchHit {
        path: path.clone(),
        on_key: hl.key,
        on_value: hl.value,
      });
    }

    if node.is_expandable() {
      if path.depth() >= query.max_depth {
        out.truncated = true;
        continue;
      }
      let children: Vec<_> = node.children().collect();
      for (seg, child) in children.into_iter().rev() {
        stack.push((child, path.child(seg)));
      }
    }
  }

  if out.match_count > 0 {
    out.required_expansion.insert(root_name.to_string());
  }
  debug!(
    query = %query.text,
    matches = out.match_count,
    truncated = out.truncated,
    "search recomputed"
  );
  out
}

/// Pure highlight predicate, usable without running a traversal.
pub fn should_highlight<'a, N: JsonNode<'a>>(
  query: &str,
  key: Option<&JsonPathSegment>,
  value: N,
) -> bool {
  PreparedSearch::new(&SearchQuery::new(query)).is_some_and(|p| p.highlight(key, value).any())
}
