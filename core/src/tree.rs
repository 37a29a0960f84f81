//! Immutable-node arena holding the session document.
//!
//! Nodes are never mutated once pushed. `set` path-copies the spine from the root to the edited
//! node and pushes the copies, so every untouched subtree keeps its [`NodeId`] and is shared by
//! the new root. Superseded nodes stay in the arena until [`DocTree::compact`] rebuilds it from the
//! current root.

use std::{borrow::Cow, collections::HashMap, mem::size_of};

use serde_json::{Map, Number, Value};
use tracing::{debug, trace};

use crate::{
  engine::ViewerError,
  inspect::JsonNode,
  models::{JsonNodeKind, JsonPathSegment},
  path::{JsonPath, DEFAULT_ROOT_NAME},
};

/// Arena size below which garbage is never collected.
const COMPACT_MIN_ARENA: usize = 1024;
const MAX_ARRAY_GAP: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Node {
  Null,
  Bool(bool),
  Number(Number),
  String(String),
  Array(Vec<NodeId>),
  Object(Vec<(String, NodeId)>),
}

impl Node {
  fn kind(&self) -> JsonNodeKind {
    match self {
      Node::Null => JsonNodeKind::Null,
      Node::Bool(_) => JsonNodeKind::Boolean,
      Node::Number(_) => JsonNodeKind::Number,
      Node::String(_) => JsonNodeKind::String,
      Node::Array(_) => JsonNodeKind::Array,
      Node::Object(_) => JsonNodeKind::Object,
    }
  }
}

#[derive(Debug, Clone)]
pub struct DocTree {
  nodes: Vec<Node>,
  root: NodeId,
  live_at_compaction: usize,
}

impl DocTree {
  pub fn from_value(value: &Value) -> Self {
    let mut tree = Self {
      nodes: Vec::new(),
      root: NodeId(0),
      live_at_compaction: 0,
    };
    tree.root = tree.alloc(value);
    tree.live_at_compaction = tree.nodes.len();
    tree
  }

  pub fn root(&self) -> NodeRef<'_> {
    self.node(self.root)
  }

  pub fn root_id(&self) -> NodeId {
    self.root
  }

  pub fn node(&self, id: NodeId) -> NodeRef<'_> {
    NodeRef { tree: self, id }
  }

  pub fn node_at(&self, path: &JsonPath) -> Option<NodeRef<'_>> {
    path
      .segments()
      .iter()
      .try_fold(self.root(), |cur, seg| cur.child(seg))
  }

  pub fn id_at(&self, path: &JsonPath) -> Option<NodeId> {
    self.node_at(path).map(|n| n.id)
  }

  /// Materialize the subtree at `path`.
  pub fn get(&self, path: &JsonPath) -> Option<Value> {
    self.node_at(path).map(|n| n.to_value())
  }

  pub fn to_value(&self) -> Value {
    self.root().to_value()
  }

  /// Replace the value at `path`, sharing every subtree that is not on the edited spine.
  pub fn set(&mut self, path: &JsonPath, value: &Value) -> Result<(), ViewerError> {
    let root = self.root;
    self.root = self.set_in(Some(root), path.segments(), path, value)?;
    trace!(arena = self.nodes.len(), depth = path.depth(), "doc tree set");
    self.maybe_compact();
    Ok(())
  }

  /// Number of slots in the arena, including superseded nodes.
  pub fn arena_len(&self) -> usize {
    self.nodes.len()
  }

  /// Number of JSON nodes reachable from the current root (shared nodes counted per use).
  pub fn node_count(&self) -> usize {
    let mut count = 0;
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      count += 1;
      match &self.nodes[id.0] {
        Node::Array(items) => stack.extend(items.iter().copied()),
        Node::Object(entries) => stack.extend(entries.iter().map(|(_, id)| *id)),
        _ => {}
      }
    }
    count
  }

  /// Rough heap footprint of the arena in bytes.
  pub fn approx_bytes(&self) -> u64 {
    let mut total = self.nodes.capacity() * size_of::<Node>();
    for node in &self.nodes {
      total += match node {
        Node::String(s) => s.capacity(),
        Node::Array(items) => items.capacity() * size_of::<NodeId>(),
        Node::Object(entries) => {
          entries.capacity() * size_of::<(String, NodeId)>()
            + entries.iter().map(|(k, _)| k.capacity()).sum::<usize>()
        }
        _ => 0,
      };
    }
    total as u64
  }

  /// Rebuild the arena keeping only nodes reachable from the current root.
  pub fn compact(&mut self) {
    let before = self.nodes.len();
    let mut fresh = Vec::with_capacity(self.live_at_compaction.max(16));
    let mut remap = HashMap::new();
    let root = copy_reachable(&self.nodes, self.root, &mut fresh, &mut remap);
    self.nodes = fresh;
    self.root = root;
    self.live_at_compaction = self.nodes.len();
    debug!(before, after = self.nodes.len(), "doc tree compacted");
  }

  fn maybe_compact(&mut self) {
    if self.nodes.len() > (self.live_at_compaction * 2).max(COMPACT_MIN_ARENA) {
      self.compact();
    }
  }

  fn push(&mut self, node: Node) -> NodeId {
    self.nodes.push(node);
    NodeId(self.nodes.len() - 1)
  }

  fn alloc(&mut self, value: &Value) -> NodeId {
    let node = match value {
      Value::Null => Node::Null,
      Value::Bool(b) => Node::Bool(*b),
      Value::Number(n) => Node::Number(n.clone()),
      Value::String(s) => Node::String(s.clone()),
      Value::Array(items) => Node::Array(items.iter().map(|v| self.alloc(v)).collect()),
      Value::Object(map) => Node::Object(
        map
          .iter()
          .map(|(k, v)| (k.clone(), self.alloc(v)))
          .collect(),
      ),
    };
    self.push(node)
  }

  fn set_in(
    &mut self,
    at: Option<NodeId>,
    segs: &[JsonPathSegment],
    full: &JsonPath,
    value: &Value,
  ) -> Result<NodeId, ViewerError> {
    let Some((seg, rest)) = segs.split_first() else {
      return Ok(self.alloc(value));
    };

    let existing = at.filter(|id| !matches!(self.nodes[id.0], Node::Null));
    let node = match existing {
      Some(id) => self.nodes[id.0].clone(),
      None => match seg {
        JsonPathSegment::Index(_) => Node::Array(Vec::new()),
        JsonPathSegment::Key(_) => Node::Object(Vec::new()),
      },
    };
    let at_path = || {
      let depth = full.depth() - segs.len();
      JsonPath::new(full.segments()[..depth].to_vec()).render(DEFAULT_ROOT_NAME)
    };

    let copied = match node {
      Node::Object(mut entries) => {
        let key = match seg {
          JsonPathSegment::Key(k) => k.clone(),
          JsonPathSegment::Index(i) => i.to_string(),
        };
        match entries.iter().position(|(k, _)| *k == key) {
          Some(pos) => {
            let child = self.set_in(Some(entries[pos].1), rest, full, value)?;
            entries[pos].1 = child;
          }
          None => {
            let child = self.set_in(None, rest, full, value)?;
            entries.push((key, child));
          }
        }
        Node::Object(entries)
      }
      Node::Array(mut items) => {
        let index = match seg {
          JsonPathSegment::Index(i) => *i,
          JsonPathSegment::Key(k) => k.parse::<usize>().map_err(|_| ViewerError::KeyOnArray {
            path: at_path(),
            key: k.clone(),
          })?,
        };
        if index >= items.len() {
          if index - items.len() > MAX_ARRAY_GAP {
            return Err(ViewerError::InvalidArg(format!(
              "index {} is too far past the end of array at {} (len {})",
              index,
              at_path(),
              items.len()
            )));
          }
          let null = self.push(Node::Null);
          items.resize(index + 1, null);
        }
        let child = self.set_in(Some(items[index]), rest, full, value)?;
        items[index] = child;
        Node::Array(items)
      }
      scalar => {
        return Err(ViewerError::NotAContainer {
          path: at_path(),
          kind: scalar.kind(),
        })
      }
    };
    Ok(self.push(copied))
  }
}

fn copy_reachable(
  from: &[Node],
  id: NodeId,
  into: &mut Vec<Node>,
  remap: &mut HashMap<NodeId, NodeId>,
) -> NodeId {
  if let Some(done) = remap.get(&id) {
    return *done;
  }
  let node = match &from[id.0] {
    Node::Array(items) => Node::Array(
      items
        .iter()
        .map(|c| copy_reachable(from, *c, into, remap))
        .collect(),
    ),
    Node::Object(entries) => Node::Object(
      entries
        .iter()
        .map(|(k, c)| (k.clone(), copy_reachable(from, *c, into, remap)))
        .collect(),
    ),
    leaf => leaf.clone(),
  };
  into.push(node);
  let new_id = NodeId(into.len() - 1);
  remap.insert(id, new_id);
  new_id
}

/// Borrowed handle to one arena node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
  tree: &'a DocTree,
  id: NodeId,
}

impl<'a> NodeRef<'a> {
  pub fn id(self) -> NodeId {
    self.id
  }

  fn node(self) -> &'a Node {
    &self.tree.nodes[self.id.0]
  }
}

impl<'a> JsonNode<'a> for NodeRef<'a> {
  fn kind(self) -> JsonNodeKind {
    self.node().kind()
  }

  fn child_count(self) -> usize {
    match self.node() {
      Node::Array(items) => items.len(),
      Node::Object(entries) => entries.len(),
      _ => 0,
    }
  }

  fn scalar_text(self) -> Option<Cow<'a, str>> {
    match self.node() {
      Node::String(s) => Some(Cow::Borrowed(s.as_str())),
      Node::Number(n) => Some(Cow::Owned(n.to_string())),
      Node::Bool(true) => Some(Cow::Borrowed("true")),
      Node::Bool(false) => Some(Cow::Borrowed("false")),
      Node::Null | Node::Array(_) | Node::Object(_) => None,
    }
  }

  fn children(self) -> Box<dyn Iterator<Item = (JsonPathSegment, Self)> + 'a> {
    let tree = self.tree;
    match self.node() {
      Node::Array(items) => Box::new(
        items
          .iter()
          .enumerate()
          .map(move |(i, id)| (JsonPathSegment::Index(i), NodeRef { tree, id: *id })),
      ),
      Node::Object(entries) => Box::new(
        entries
          .iter()
          .map(move |(k, id)| (JsonPathSegment::Key(k.clone()), NodeRef { tree, id: *id })),
      ),
      _ => Box::new(std::iter::empty()),
    }
  }

  fn child(self, seg: &JsonPathSegment) -> Option<Self> {
    let id = match (self.node(), seg) {
      (Node::Object(entries), JsonPathSegment::Key(k)) => {
        entries.iter().find(|(key, _)| key == k).map(|(_, id)| *id)
      }
      (Node::Object(entries), JsonPathSegment::Index(i)) => {
        let k = i.to_string();
        entries.iter().find(|(key, _)| *key == k).map(|(_, id)| *id)
      }
      (Node::Array(items), JsonPathSegment::Index(i)) => items.get(*i).copied(),
      (Node::Array(items), JsonPathSegment::Key(k)) => k
        .parse::<usize>()
        .ok()
        .and_then(|i| items.get(i).copied()),
      _ => None,
    }?;
    Some(NodeRef {
      tree: self.tree,
      id,
    })
  }

  fn to_value(self) -> Value {
    match self.node() {
      Node::Null => Value::Null,
      Node::Bool(b) => Value::Bool(*b),
      Node::Number(n) => Value::Number(n.clone()),
      Node::String(s) => Value::String(s.clone()),
      Node::Array(items) => Value::Array(
        items
          .iter()
          .map(|id| self.tree.node(*id).to_value())
          .collect(),
      ),
      Node::Object(entries) => {
        let mut map = Map::with_capacity(entries.len());
        for (k, id) in entries {
          map.insert(k.clone(), self.tree.node(*id).to_value());
        }
        Value::Object(map)
      }
    }
  }
}
