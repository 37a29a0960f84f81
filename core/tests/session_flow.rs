use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use jv_core::{
  Clipboard, Collapsed, EngineOptions, JsonNodeKind, NodeMeta, TreeRow, ViewerConfig, ViewerEngine,
  ViewerError, ViewerObserver, ViewerSession,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorder {
  events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
  fn take(&self) -> Vec<String> {
    std::mem::take(&mut *self.events.lock())
  }
}

impl ViewerObserver for Recorder {
  fn on_select(&mut self, path: &str, meta: &NodeMeta) {
    self.events.lock().push(format!("select {path} {}", meta.kind.as_str()));
  }

  fn on_change(&mut self, path: &str, old: &Value, new: &Value) {
    self.events.lock().push(format!("change {path} {old} -> {new}"));
  }

  fn on_error(&mut self, error: &ViewerError) {
    self.events.lock().push(format!("error {error}"));
  }

  fn on_search_match_count(&mut self, count: usize) {
    self.events.lock().push(format!("matches {count}"));
  }
}

#[derive(Default)]
struct MemClipboard {
  text: Option<String>,
  fail: bool,
}

impl Clipboard for MemClipboard {
  fn write_text(&mut self, text: &str) -> Result<(), String> {
    if self.fail {
      return Err("permission denied".to_string());
    }
    self.text = Some(text.to_string());
    Ok(())
  }
}

fn john() -> Value {
  json!({
    "name": "John Doe",
    "age": 30,
    "address": {"street": "123 Main St", "city": "Anytown"},
    "hobbies": ["reading", "coding"]
  })
}

fn session(doc: Value, config: ViewerConfig) -> (ViewerSession, Recorder) {
  let rec = Recorder::default();
  (ViewerSession::new(doc, config, Box::new(rec.clone())), rec)
}

fn node_paths(rows: &[TreeRow]) -> Vec<&str> {
  rows
    .iter()
    .filter_map(|r| r.as_node())
    .map(|n| n.path.as_str())
    .collect()
}

#[test]
fn wide_array_is_truncated_with_hidden_marker() {
  let doc = Value::Array((0..5000).map(|i| json!(i)).collect());
  let config = ViewerConfig {
    max_nodes: 1000,
    ..ViewerConfig::default()
  };
  let (mut s, _) = session(doc, config);
  let rows = s.rows();
  assert_eq!(rows.len(), 1002);
  assert_eq!(node_paths(rows).len(), 1001);
  assert_eq!(
    rows.last(),
    Some(&TreeRow::MoreHidden {
      parent_path: "root".into(),
      depth: 1,
      hidden: 4000
    })
  );
}

#[test]
fn rows_follow_document_order_and_display_labels() {
  let (mut s, _) = session(john(), ViewerConfig::default());
  let rows = s.rows();
  assert_eq!(
    node_paths(rows),
    vec![
      "root",
      "root.name",
      "root.age",
      "root.address",
      "root.address.street",
      "root.address.city",
      "root.hobbies",
      "root.hobbies[0]",
      "root.hobbies[1]",
    ]
  );
  let labels: Vec<&str> = rows
    .iter()
    .filter_map(|r| r.as_node())
    .map(|n| n.display.as_str())
    .collect();
  assert_eq!(labels[0], "{4 properties}");
  assert_eq!(labels[1], "\"John Doe\"");
  assert_eq!(labels[6], "[2 items]");
}

#[test]
fn render_depth_limit_stops_descending() {
  let config = ViewerConfig {
    max_render_depth: 0,
    ..ViewerConfig::default()
  };
  let (mut s, _) = session(john(), config);
  let paths = node_paths(s.rows());
  // the root's children render, theirs do not
  assert!(paths.contains(&"root.address"));
  assert!(!paths.contains(&"root.address.street"));
}

#[test]
fn toggle_hides_and_reveals_children() {
  let (mut s, _) = session(john(), ViewerConfig::default());
  assert!(!s.toggle("root.address"));
  assert!(!node_paths(s.rows()).contains(&"root.address.city"));
  assert!(s.toggle("root.address"));
  assert!(node_paths(s.rows()).contains(&"root.address.city"));

  s.collapse_all();
  assert_eq!(node_paths(s.rows()), vec!["root"]);
  s.expand_all();
  assert_eq!(node_paths(s.rows()).len(), 9);
}

#[test]
fn expansion_calls_accept_any_spelling_of_a_path() {
  let (mut s, _) = session(json!({"address": {"street": "x"}}), ViewerConfig::default());
  assert_eq!(s.rows().len(), 3);
  assert!(s.is_expanded("root[\"address\"]"));

  assert!(!s.toggle("root[\"address\"]"));
  assert_eq!(s.rows().len(), 2);
  assert!(!s.is_expanded("root.address"));

  assert!(s.toggle("address"));
  assert_eq!(s.rows().len(), 3);
}

#[test]
fn search_expands_ancestors_of_matches() {
  let config = ViewerConfig {
    collapsed: Collapsed::Flag(true),
    ..ViewerConfig::default()
  };
  let (mut s, rec) = session(john(), config);
  assert_eq!(node_paths(s.rows()), vec!["root"]);

  s.search("main");
  assert_eq!(rec.take(), vec!["matches 1"]);
  assert!(s.is_expanded("root"));
  assert!(s.is_expanded("root.address"));
  assert!(!s.is_expanded("root.hobbies"));

  let rows = s.rows();
  let street = rows
    .iter()
    .filter_map(|r| r.as_node())
    .find(|n| n.path == "root.address.street")
    .unwrap();
  assert!(street.highlight.value);
}

#[test]
fn initial_search_from_config() {
  let config = ViewerConfig {
    search: "coding".into(),
    collapsed: Collapsed::Flag(true),
    ..ViewerConfig::default()
  };
  let (s, _) = session(john(), config);
  assert_eq!(s.matches().match_count, 1);
  assert!(s.is_expanded("root.hobbies"));
}

#[test]
fn typed_query_waits_for_quiet_period() {
  let (mut s, _) = session(john(), ViewerConfig::default());
  let t0 = Instant::now();
  s.type_query("jo", t0);
  s.type_query("john", t0 + Duration::from_millis(100));
  assert!(!s.poll_query(t0 + Duration::from_millis(350)));
  assert_eq!(s.query(), "");
  assert_eq!(s.query_deadline(), Some(t0 + Duration::from_millis(400)));

  assert!(s.poll_query(t0 + Duration::from_millis(400)));
  assert_eq!(s.query(), "john");
  assert_eq!(s.matches().match_count, 1);
}

#[test]
fn get_set_and_change_notification() {
  let (mut s, rec) = session(john(), ViewerConfig::default());
  assert_eq!(s.get("root.name"), Some(json!("John Doe")));
  assert_eq!(s.get("address.city"), Some(json!("Anytown")));
  assert_eq!(s.get("nope.deeper"), None);

  s.set("root.age", json!(31)).unwrap();
  assert_eq!(s.get("age"), Some(json!(31)));
  assert_eq!(rec.take(), vec!["change root.age 30 -> 31"]);

  s.set("root.tags[0]", json!("new")).unwrap();
  assert_eq!(s.to_json()["tags"], json!(["new"]));
  assert_eq!(s.performance_stats().total_nodes, 11);
}

#[test]
fn rejected_set_reports_error() {
  let (mut s, rec) = session(john(), ViewerConfig::default());
  let err = s.set("root.name.first", json!("J")).unwrap_err();
  assert!(matches!(err, ViewerError::NotAContainer { kind: JsonNodeKind::String, .. }));
  assert_eq!(rec.take().len(), 1);
  assert_eq!(s.get("name"), Some(json!("John Doe")));
}

#[test]
fn invalid_text_reports_parse_error_and_shows_fallback() {
  let rec = Recorder::default();
  let s = ViewerSession::new("{\"a\": ", ViewerConfig::default(), Box::new(rec.clone()));
  let events = rec.take();
  assert_eq!(events.len(), 1);
  assert!(events[0].starts_with("error failed to parse JSON"));
  assert_eq!(s.to_json(), json!("{\"a\": "));

  let s = ViewerSession::new("[1, 2]", ViewerConfig::default(), Box::new(rec.clone()));
  assert!(rec.take().is_empty());
  assert_eq!(s.to_json(), json!([1, 2]));
}

#[test]
fn replacing_document_keeps_expansion() {
  let (mut s, _) = session(john(), ViewerConfig::default());
  s.toggle("root.hobbies");
  s.replace_document(json!({"hobbies": ["chess"], "address": {"zip": "1"}}));
  assert!(!s.is_expanded("root.hobbies"));
  assert!(s.is_expanded("root.address"));
  assert!(node_paths(s.rows()).contains(&"root.address.zip"));
}

#[test]
fn select_and_activate_report_node_meta() {
  let (mut s, rec) = session(john(), ViewerConfig::default());
  let meta = s.select("root.hobbies[1]").unwrap();
  assert_eq!(meta.depth, 2);
  assert_eq!(meta.kind, JsonNodeKind::String);
  assert_eq!(rec.take(), vec!["select root.hobbies[1] string"]);

  s.activate("root.address").unwrap();
  assert!(!s.is_expanded("root.address"));
  assert_eq!(rec.take(), vec!["select root.address object"]);

  assert!(matches!(s.select("root.missing"), Err(ViewerError::NotFound(_))));
}

#[test]
fn inline_edit_commits_through_set() {
  let config = ViewerConfig {
    editable: true,
    ..ViewerConfig::default()
  };
  let (mut s, rec) = session(john(), config);
  assert_eq!(s.begin_edit("root.age").unwrap().text(), "30");
  s.edit_text("{oops").unwrap();
  assert!(matches!(s.commit_edit(), Err(ViewerError::EditValidation(_))));
  assert!(s.editor().is_some());
  rec.take();

  s.edit_text("  41 ").unwrap();
  assert_eq!(s.commit_edit().unwrap(), json!(41));
  assert!(s.editor().is_none());
  assert_eq!(s.get("root.age"), Some(json!(41)));
  assert_eq!(rec.take(), vec!["change root.age 30 -> 41"]);

  assert!(matches!(s.begin_edit("root.address"), Err(ViewerError::NotEditable(_))));
}

#[test]
fn read_only_viewer_refuses_edits() {
  let (mut s, _) = session(john(), ViewerConfig::default());
  assert!(matches!(s.begin_edit("root.age"), Err(ViewerError::NotEditable(_))));
  assert!(matches!(s.commit_edit(), Err(ViewerError::InvalidArg(_))));
}

#[test]
fn clipboard_copies_text_and_reports_failures() {
  let (mut s, rec) = session(john(), ViewerConfig::default());
  let mut clip = MemClipboard::default();
  s.copy_value("root.name", &mut clip).unwrap();
  assert_eq!(clip.text.as_deref(), Some("John Doe"));
  s.copy_value("root.hobbies", &mut clip).unwrap();
  assert_eq!(clip.text.as_deref(), Some("[\"reading\",\"coding\"]"));
  s.copy_path("hobbies[0]", &mut clip).unwrap();
  assert_eq!(clip.text.as_deref(), Some("root.hobbies[0]"));

  clip.fail = true;
  let err = s.copy_value("root.age", &mut clip).unwrap_err();
  assert!(matches!(err, ViewerError::Clipboard(_)));
  assert_eq!(rec.take(), vec!["error clipboard error: permission denied"]);
}

#[test]
fn lazy_window_grows_on_load_more() {
  let doc = json!({"big": (0..300).collect::<Vec<_>>()});
  let mut config = ViewerConfig::default();
  config.performance.enable_virtualization = true;
  let (mut s, _) = session(doc, config);

  let rows = s.rows();
  assert_eq!(node_paths(rows).len(), 2 + 50);
  assert!(rows.contains(&TreeRow::LoadMore {
    parent_path: "root.big".into(),
    depth: 2,
    remaining: 250
  }));

  s.load_more("root.big");
  assert_eq!(node_paths(s.rows()).len(), 2 + 100);
  s.load_more("root[\"big\"]");
  assert_eq!(node_paths(s.rows()).len(), 2 + 150);
}

#[test]
fn replacing_document_resets_lazy_windows_and_measurements() {
  let mut config = ViewerConfig::default();
  config.performance.enable_virtualization = true;
  let (mut s, _) = session(json!({"big": (0..300).collect::<Vec<_>>()}), config);
  s.rows();
  s.load_more("root.big");
  s.measure_row(0, 100.0);
  assert_eq!(node_paths(s.rows()).len(), 2 + 100);

  s.replace_document(json!({"big": (1000..1300).collect::<Vec<_>>()}));
  assert_eq!(node_paths(s.rows()).len(), 2 + 50);
  let row_count = s.rows().len();
  assert_eq!(s.total_size(), row_count as f64 * 24.0);
}

#[test]
fn virtualized_rows_are_windowed() {
  let doc = Value::Array((0..1000).map(|i| json!(i)).collect());
  let mut config = ViewerConfig::default();
  config.performance.enable_virtualization = true;
  config.performance.lazy_load_threshold = 10_000;
  config.performance.virtual_item_height = 20.0;
  config.performance.container_height = 200.0;
  let (mut s, _) = session(doc, config);

  s.rows();
  s.scroll_to(500.0);
  let visible = s.visible_rows();
  assert_eq!(visible.len(), 21);
  assert_eq!(visible[0].0.index, 20);
  assert_eq!(s.total_size(), 1001.0 * 20.0);
  assert_eq!(s.performance_stats().rendered_nodes, 21);

  s.enable_virtualization(false);
  assert_eq!(s.visible_rows().len(), 1001);
  assert_eq!(s.performance_stats().rendered_nodes, 1001);
}

#[test]
fn performance_stats_reflect_document_and_search() {
  let (mut s, _) = session(john(), ViewerConfig::default());
  s.search("o");
  s.rows();
  let stats = s.performance_stats();
  assert_eq!(stats.total_nodes, 9);
  assert_eq!(stats.rendered_nodes, 9);
  assert_eq!(stats.search_matches, s.matches().match_count);
  assert!(stats.render_time_ms >= 0.0);
  assert!(stats.memory_usage_bytes.unwrap_or(0) > 0);
}

#[test]
fn engine_routes_calls_to_sessions() {
  let eng = ViewerEngine::new(EngineOptions::default());
  let info = eng.open_document(json!([1, 2, 3, 4, 5]), None, None).unwrap();
  let sid = info.session_id.as_str();
  assert_eq!(info.root_name, "root");

  assert_eq!(eng.rows(sid).unwrap().len(), 6);
  assert!(!eng.toggle(sid, "root").unwrap());
  assert_eq!(eng.rows(sid).unwrap().len(), 1);
  assert_eq!(eng.search(sid, "4").unwrap(), 2);
  assert!(eng.toggle(sid, "root.missing").unwrap());

  eng.set(sid, "root[0]", json!("one")).unwrap();
  assert_eq!(eng.get(sid, "[0]").unwrap(), Some(json!("one")));

  let p1 = eng.list_children(sid, "root", None, 2).unwrap();
  assert_eq!(p1.items.len(), 2);
  assert_eq!(p1.items[0].path, "root[0]");
  assert_eq!(p1.items[0].preview, "\"one\"");
  let p2 = eng.list_children(sid, "root", p1.next_cursor.as_deref(), 2).unwrap();
  assert_eq!(p2.items[0].path, "root[2]");
  let p3 = eng.list_children(sid, "root", p2.next_cursor.as_deref(), 2).unwrap();
  assert_eq!(p3.items.len(), 1);
  assert!(p3.reached_end);
  assert!(p3.next_cursor.is_none());
  assert!(matches!(
    eng.list_children(sid, "root", Some("not a cursor"), 2),
    Err(ViewerError::BadCursor(_))
  ));

  assert_eq!(eng.performance_stats(sid).unwrap().total_nodes, 6);
  assert_eq!(eng.session_info(sid).unwrap(), info);

  eng.close(sid).unwrap();
  assert!(matches!(eng.rows(sid), Err(ViewerError::UnknownSession(_))));
  assert!(matches!(eng.close(sid), Err(ViewerError::UnknownSession(_))));
}

#[test]
fn engine_caps_open_sessions() {
  let eng = ViewerEngine::new(EngineOptions {
    max_sessions: 1,
    ..EngineOptions::default()
  });
  let config = ViewerConfig {
    root_name: "data".into(),
    ..ViewerConfig::default()
  };
  let info = eng.open_document("{}", Some(config), None).unwrap();
  assert_eq!(info.root_name, "data");
  assert!(matches!(
    eng.open_document("{}", None, None),
    Err(ViewerError::InvalidArg(_))
  ));

  let other = eng.clone();
  std::thread::spawn(move || other.close(&info.session_id).unwrap())
    .join()
    .unwrap();
  assert!(eng.open_document("{}", None, None).is_ok());
}

struct Reentrant {
  engine: ViewerEngine,
  session_id: Arc<Mutex<Option<String>>>,
  changes: Arc<Mutex<Vec<(String, Value)>>>,
}

impl ViewerObserver for Reentrant {
  fn on_change(&mut self, path: &str, _old: &Value, _new: &Value) {
    let Some(sid) = self.session_id.lock().clone() else {
      return;
    };
    let doc = self.engine.get(&sid, "root").unwrap().unwrap();
    self.changes.lock().push((path.to_string(), doc));
    if path == "root.a" {
      self.engine.set(&sid, "root.b", json!(3)).unwrap();
    }
  }
}

#[test]
fn observer_can_call_back_into_engine() {
  let eng = ViewerEngine::new(EngineOptions::default());
  let session_id = Arc::new(Mutex::new(None));
  let changes = Arc::new(Mutex::new(Vec::new()));
  let observer = Reentrant {
    engine: eng.clone(),
    session_id: session_id.clone(),
    changes: changes.clone(),
  };
  let info = eng
    .open_document(json!({"a": 1}), None, Some(Box::new(observer)))
    .unwrap();
  *session_id.lock() = Some(info.session_id.clone());

  let (tx, rx) = std::sync::mpsc::channel();
  let worker = eng.clone();
  let sid = info.session_id.clone();
  std::thread::spawn(move || {
    let _ = tx.send(worker.set(&sid, "root.a", json!(2)).is_ok());
  });
  assert_eq!(rx.recv_timeout(Duration::from_secs(3)), Ok(true));

  assert_eq!(
    *changes.lock(),
    vec![
      ("root.a".to_string(), json!({"a": 2})),
      ("root.b".to_string(), json!({"a": 2, "b": 3})),
    ]
  );
  assert_eq!(
    eng.get(&info.session_id, "root").unwrap(),
    Some(json!({"a": 2, "b": 3}))
  );
}

#[test]
fn one_busy_session_does_not_block_another() {
  let eng = ViewerEngine::new(EngineOptions::default());
  let slow = eng.open_document(json!({"a": 1}), None, None).unwrap();
  let other = eng.open_document(json!({"b": 2}), None, None).unwrap();

  let (tx, rx) = std::sync::mpsc::channel();
  let worker = eng.clone();
  eng
    .with_session(&slow.session_id, |_| {
      std::thread::spawn(move || {
        let _ = tx.send(worker.get(&other.session_id, "b").unwrap());
      });
      assert_eq!(rx.recv_timeout(Duration::from_secs(3)), Ok(Some(json!(2))));
    })
    .unwrap();
}
