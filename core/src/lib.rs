mod children;
mod clipboard;
mod config;
mod cursor;
mod debounce;
mod edit;
mod engine;
mod expansion;
mod inspect;
mod models;
mod path;
mod render;
mod search_match;
mod session;
mod tree;
mod virtualize;

pub use crate::children::DEFAULT_PAGE_LIMIT;
pub use crate::clipboard::{copy_text, Clipboard};
pub use crate::config::{PerformanceConfig, ViewerConfig};
pub use crate::debounce::Debouncer;
pub use crate::edit::{parse_document, safe_parse, InlineEdit};
pub use crate::engine::{EngineOptions, ViewerEngine};
pub use crate::expansion::{Collapsed, ExpansionState, DEFAULT_EXPAND_DEPTH};
pub use crate::inspect::{
  child_count, classify, display_value, is_expandable, scalar_text, JsonNode,
};
pub use crate::models::{
  ChildItem, ChildrenPage, JsonNodeKind, JsonPathSegment, NodeMeta, PerformanceStats, SessionInfo,
  VirtualItem,
};
pub use crate::path::{
  decode, decode_rooted, encode, get, is_identifier, set, JsonPath, DEFAULT_ROOT_NAME,
};
pub use crate::render::{flatten_rows, LazyWindow, NodeRow, RenderOptions, TreeRow};
pub use crate::search_match::{
  search, should_highlight, Highlight, PreparedSearch, SearchHit, SearchMatches, SearchQuery,
};
pub use crate::session::{
  DocumentInput, NoopObserver, ViewerEvent, ViewerObserver, ViewerSession,
};
pub use crate::tree::{DocTree, NodeId, NodeRef};
pub use crate::virtualize::{VirtualizerOptions, Virtualizer, VisibleRange};

pub use crate::engine::ViewerError;
