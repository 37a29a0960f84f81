use jv_core::{EngineOptions, TreeRow, ViewerEngine};

fn main() -> Result<(), String> {
  let mut args = std::env::args().skip(1);
  let path = args.next().ok_or_else(|| {
    "usage: cargo run -p jv_core --example smoke_tree -- <file.json> [query]".to_string()
  })?;
  let query = args.next();

  let text = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
  let eng = ViewerEngine::new(EngineOptions::default());
  let info = eng.open_document(text, None, None).map_err(|e| e.to_string())?;
  let sid = info.session_id.as_str();

  if let Some(q) = query {
    let n = eng.search(sid, &q).map_err(|e| e.to_string())?;
    println!("matches={n}");
  }

  for row in eng.rows(sid).map_err(|e| e.to_string())? {
    let indent = "  ".repeat(row.depth());
    match row {
      TreeRow::Node(n) => {
        let mark = if n.highlight.any() { "*" } else { " " };
        println!("{indent}{mark}{}: {}", n.key, n.display);
      }
      TreeRow::MoreHidden { hidden, .. } => println!("{indent}... ({hidden} more items hidden)"),
      TreeRow::LoadMore { remaining, .. } => println!("{indent}[load {remaining} more]"),
    }
  }

  let stats = eng.performance_stats(sid).map_err(|e| e.to_string())?;
  println!(
    "total_nodes={} rendered_nodes={} render_time_ms={:.3}",
    stats.total_nodes, stats.rendered_nodes, stats.render_time_ms
  );
  Ok(())
}
