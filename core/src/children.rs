use crate::{
  cursor::{decode_cursor, encode_cursor, Cursor},
  engine::ViewerError,
  inspect::{display_value, JsonNode},
  models::{ChildItem, ChildrenPage},
  path::JsonPath,
};

pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// List direct children of `node`, starting after `cursor`.
///
/// Used for "load more" on huge containers: the host pages through children instead of
/// expanding them all at once. Scalars have no children and yield an empty final page.
pub(crate) fn list_children_page<'a, N: JsonNode<'a>>(
  node: N,
  parent: &JsonPath,
  root_name: &str,
  cursor: Option<&str>,
  limit: usize,
  preview_max_chars: usize,
) -> Result<ChildrenPage, ViewerError> {
  let Cursor { index } = decode_cursor(cursor)?;
  let start = usize::try_from(index).map_err(|e| ViewerError::BadCursor(e.to_string()))?;
  let limit = if limit == 0 { DEFAULT_PAGE_LIMIT } else { limit };
  let total = node.child_count();

  if start >= total {
    return Ok(ChildrenPage {
      items: vec![],
      next_cursor: None,
      reached_end: true,
    });
  }

  let items: Vec<ChildItem> = node
    .children()
    .skip(start)
    .take(limit)
    .map(|(seg, child)| {
      let path = parent.child(seg.clone()).render(root_name);
      ChildItem {
        seg,
        path,
        kind: child.kind(),
        children_count: child.child_count(),
        preview: truncate_chars(&display_value(child), preview_max_chars),
      }
    })
    .collect();

  let next = start + items.len();
  let reached_end = next >= total;
  Ok(ChildrenPage {
    items,
    next_cursor: (!reached_end).then(|| encode_cursor(Cursor { index: next as u64 })),
    reached_end,
  })
}

/// Cut `s` to at most `max` chars, marking the cut with `…`.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
  if max == 0 {
    return String::new();
  }
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((cut, _)) => {
      let mut out = s[..cut].to_string();
      out.push('…');
      out
    }
  }
}
