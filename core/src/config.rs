use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
  expansion::Collapsed,
  path::DEFAULT_ROOT_NAME,
  render::{LazyWindow, RenderOptions},
  virtualize::VirtualizerOptions,
};

/// Knobs for very large documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceConfig {
  pub enable_virtualization: bool,
  pub virtual_item_height: f64,
  pub virtual_overscan: usize,
  /// Parents with more children than this start with a "load more" window when virtualized.
  pub lazy_load_threshold: usize,
  /// Quiet period before a typed query is applied, in milliseconds.
  pub debounce_delay: u64,
  pub max_initial_render: usize,
  pub container_height: f64,
}

impl Default for PerformanceConfig {
  fn default() -> Self {
    Self {
      enable_virtualization: false,
      virtual_item_height: 24.0,
      virtual_overscan: 5,
      lazy_load_threshold: 100,
      debounce_delay: 300,
      max_initial_render: 50,
      container_height: 600.0,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
  pub editable: bool,
  pub show_types: bool,
  /// `light`, `dark`, or a custom class name.
  pub theme: String,
  pub max_render_depth: usize,
  /// Children rendered per node before a "more hidden" marker.
  pub max_nodes: usize,
  pub root_name: String,
  pub collapsed: Collapsed,
  /// Query applied when the document opens.
  pub search: String,
  pub show_controls: bool,
  pub preview_max_chars: usize,
  #[serde(flatten)]
  pub performance: PerformanceConfig,
}

impl Default for ViewerConfig {
  fn default() -> Self {
    Self {
      editable: false,
      show_types: true,
      theme: "light".to_string(),
      max_render_depth: 6,
      max_nodes: 2000,
      root_name: DEFAULT_ROOT_NAME.to_string(),
      collapsed: Collapsed::default(),
      search: String::new(),
      show_controls: true,
      preview_max_chars: 300,
      performance: PerformanceConfig::default(),
    }
  }
}

impl ViewerConfig {
  pub fn theme_class(&self) -> String {
    match self.theme.as_str() {
      "light" | "dark" => format!("jv-theme-{}", self.theme),
      custom => custom.to_string(),
    }
  }

  pub fn debounce_delay(&self) -> Duration {
    Duration::from_millis(self.performance.debounce_delay)
  }

  pub(crate) fn render_options(&self) -> RenderOptions {
    let lazy = self.performance.enable_virtualization.then_some(LazyWindow {
      threshold: self.performance.lazy_load_threshold,
      initial: self.performance.max_initial_render,
    });
    RenderOptions {
      root_name: self.root_name.clone(),
      max_render_depth: self.max_render_depth,
      max_nodes: self.max_nodes,
      lazy,
    }
  }

  pub(crate) fn virtualizer_options(&self, item_count: usize) -> VirtualizerOptions {
    VirtualizerOptions {
      item_count,
      item_size: self.performance.virtual_item_height,
      container_height: self.performance.container_height,
      overscan: self.performance.virtual_overscan,
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn config_reads_camel_case_with_defaults() {
    let cfg: ViewerConfig = serde_json::from_value(json!({
      "editable": true,
      "maxNodes": 1000,
      "collapsed": 2,
      "enableVirtualization": true,
      "debounceDelay": 150
    }))
    .unwrap();
    assert!(cfg.editable);
    assert_eq!(cfg.max_nodes, 1000);
    assert_eq!(cfg.collapsed, Collapsed::Depth(2));
    assert!(cfg.performance.enable_virtualization);
    assert_eq!(cfg.debounce_delay(), Duration::from_millis(150));
    assert_eq!(cfg.root_name, "root");
    assert_eq!(cfg.performance.virtual_overscan, 5);
  }

  #[test]
  fn theme_class_passes_custom_names_through() {
    let mut cfg = ViewerConfig::default();
    assert_eq!(cfg.theme_class(), "jv-theme-light");
    cfg.theme = "solarized".into();
    assert_eq!(cfg.theme_class(), "solarized");
  }
}
