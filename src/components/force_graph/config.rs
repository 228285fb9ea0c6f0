//! Graph configuration: defaults, typed access and resolution from partial JSON.
//!
//! Hosts hand in a partial configuration as JSON. It is deep-merged over the
//! serialized defaults and read back into [`GraphConfig`], so unknown keys are
//! tolerated and every missing key takes its default.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::error::{ErrorKind, GraphError};
use super::types::{LabelFns, LabelPosition, LinkLabelFn, NodeLabelFn, NodeSize, SymbolType};
use super::utils::{fail, merge};

/// Keyword meaning "keep the normal value when highlighted".
pub const SAME: &str = "SAME";

/// A highlight override: either an explicit value or [`Highlight::Same`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Highlight<T> {
	#[default]
	Same,
	Value(T),
}

impl<T: Clone> Highlight<T> {
	/// The highlight value, or `normal` when the override is [`Highlight::Same`].
	pub fn resolve(&self, normal: T) -> T {
		match self {
			Highlight::Same => normal,
			Highlight::Value(v) => v.clone(),
		}
	}
}

impl<T: Serialize> Serialize for Highlight<T> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Highlight::Same => serializer.serialize_str(SAME),
			Highlight::Value(v) => v.serialize(serializer),
		}
	}
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Highlight<T> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = Value::deserialize(deserializer)?;
		if raw.as_str() == Some(SAME) {
			return Ok(Highlight::Same);
		}
		serde_json::from_value(raw)
			.map(Highlight::Value)
			.map_err(serde::de::Error::custom)
	}
}

/// Where a label comes from: a named field of the element, or a function.
#[derive(Clone)]
pub enum LabelProperty<F> {
	Field(String),
	Func(F),
}

impl<F> LabelProperty<F> {
	pub fn field(name: &str) -> Self {
		LabelProperty::Field(name.to_string())
	}
}

impl<F> fmt::Debug for LabelProperty<F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LabelProperty::Field(name) => f.debug_tuple("Field").field(name).finish(),
			LabelProperty::Func(_) => f.write_str("Func(..)"),
		}
	}
}

impl<F> PartialEq for LabelProperty<F> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(LabelProperty::Field(a), LabelProperty::Field(b)) => a == b,
			_ => false,
		}
	}
}

// Functions have no JSON form; they are installed after deserialization.
impl<F> Serialize for LabelProperty<F> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			LabelProperty::Field(name) => serializer.serialize_str(name),
			LabelProperty::Func(_) => serializer.serialize_none(),
		}
	}
}

impl<'de, F> Deserialize<'de> for LabelProperty<F> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		String::deserialize(deserializer).map(LabelProperty::Field)
	}
}

/// Link path shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkType {
	#[default]
	Straight,
	CurveSmooth,
	CurveFull,
}

/// Tuning of the force simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct D3Config {
	pub alpha_target: f64,
	/// Many-body strength. Negative values repel.
	pub gravity: f64,
	pub link_length: f64,
	pub link_strength: f64,
	pub disable_link_force: bool,
}

impl Default for D3Config {
	fn default() -> Self {
		Self {
			alpha_target: 0.05,
			gravity: -100.0,
			link_length: 100.0,
			link_strength: 1.0,
			disable_link_force: false,
		}
	}
}

/// Node defaults and highlight overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
	pub color: String,
	pub font_color: String,
	pub font_size: f64,
	pub font_weight: String,
	pub highlight_color: Highlight<String>,
	pub highlight_font_size: Highlight<f64>,
	pub highlight_font_weight: Highlight<String>,
	pub highlight_stroke_color: Highlight<String>,
	pub highlight_stroke_width: Highlight<f64>,
	pub label_property: LabelProperty<NodeLabelFn>,
	pub label_position: Option<LabelPosition>,
	pub mouse_cursor: String,
	pub opacity: f64,
	pub render_label: bool,
	pub size: NodeSize,
	pub stroke_color: String,
	pub stroke_width: f64,
	pub svg: String,
	pub symbol_type: SymbolType,
}

impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			color: "#d3d3d3".into(),
			font_color: "black".into(),
			font_size: 8.0,
			font_weight: "normal".into(),
			highlight_color: Highlight::Same,
			highlight_font_size: Highlight::Same,
			highlight_font_weight: Highlight::Same,
			highlight_stroke_color: Highlight::Same,
			highlight_stroke_width: Highlight::Same,
			label_property: LabelProperty::field("id"),
			label_position: None,
			mouse_cursor: "pointer".into(),
			opacity: 1.0,
			render_label: true,
			size: NodeSize::Area(200.0),
			stroke_color: "none".into(),
			stroke_width: 1.5,
			svg: String::new(),
			symbol_type: SymbolType::Circle,
		}
	}
}

/// Link defaults and highlight overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkConfig {
	pub color: String,
	pub font_color: String,
	pub font_size: f64,
	pub font_weight: String,
	pub highlight_color: Highlight<String>,
	pub highlight_font_weight: Highlight<String>,
	pub label_property: LabelProperty<LinkLabelFn>,
	pub mouse_cursor: String,
	pub opacity: f64,
	pub render_label: bool,
	pub semantic_stroke_width: bool,
	pub stroke_width: f64,
	pub marker_width: f64,
	pub marker_height: f64,
	#[serde(rename = "type")]
	pub link_type: LinkType,
	pub stroke_dasharray: f64,
	pub stroke_dashoffset: f64,
	pub stroke_linecap: String,
}

impl Default for LinkConfig {
	fn default() -> Self {
		Self {
			color: "#d3d3d3".into(),
			font_color: "black".into(),
			font_size: 8.0,
			font_weight: "normal".into(),
			highlight_color: Highlight::Same,
			highlight_font_weight: Highlight::Same,
			label_property: LabelProperty::field("label"),
			mouse_cursor: "pointer".into(),
			opacity: 1.0,
			render_label: false,
			semantic_stroke_width: false,
			stroke_width: 1.5,
			marker_width: 6.0,
			marker_height: 6.0,
			link_type: LinkType::Straight,
			stroke_dasharray: 0.0,
			stroke_dashoffset: 0.0,
			stroke_linecap: "butt".into(),
		}
	}
}

/// Complete graph configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphConfig {
	pub width: f64,
	pub height: f64,
	pub directed: bool,
	pub collapsible: bool,
	/// Highlight breadth: 0 self only, 1 neighbours, 2 every link.
	pub highlight_degree: u8,
	pub highlight_opacity: f64,
	pub min_zoom: f64,
	pub max_zoom: f64,
	pub focus_zoom: f64,
	pub initial_zoom: Option<f64>,
	pub node_highlight_behavior: bool,
	pub link_highlight_behavior: bool,
	pub static_graph: bool,
	pub freeze_all_drag_events: bool,
	pub automatic_rearrange_after_drop_node: bool,
	pub d3: D3Config,
	pub node: NodeConfig,
	pub link: LinkConfig,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			width: 800.0,
			height: 400.0,
			directed: false,
			collapsible: false,
			highlight_degree: 1,
			highlight_opacity: 1.0,
			min_zoom: 0.1,
			max_zoom: 8.0,
			focus_zoom: 1.0,
			initial_zoom: None,
			node_highlight_behavior: false,
			link_highlight_behavior: false,
			static_graph: false,
			freeze_all_drag_events: false,
			automatic_rearrange_after_drop_node: false,
			d3: D3Config::default(),
			node: NodeConfig::default(),
			link: LinkConfig::default(),
		}
	}
}

impl GraphConfig {
	/// Clamps a zoom factor into `[min_zoom, max_zoom]`.
	pub fn clamp_zoom(&self, k: f64) -> f64 {
		k.max(self.min_zoom).min(self.max_zoom)
	}
}

/// Serialized default configuration, the base every override merges over.
pub fn default_config_value() -> Value {
	serde_json::to_value(GraphConfig::default()).unwrap_or(Value::Null)
}

/// Merges `overrides` over the defaults.
///
/// Returns the merged JSON (kept for later config diffing) and the typed view
/// with `label_fns` installed.
pub fn resolve_config(overrides: &Value, label_fns: &LabelFns) -> Result<(Value, GraphConfig), GraphError> {
	let merged = merge(&default_config_value(), overrides);
	let mut config: GraphConfig = serde_json::from_value(merged.clone())
		.map_err(|e| fail(ErrorKind::InvalidConfig, "Graph", e.to_string()))?;
	if let Some(f) = &label_fns.node {
		config.node.label_property = LabelProperty::Func(f.clone());
	}
	if let Some(f) = &label_fns.link {
		config.link.label_property = LabelProperty::Func(f.clone());
	}
	Ok((merged, config))
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use serde_json::json;

	use super::super::types::GraphNode;
	use super::*;

	#[test]
	fn defaults_round_trip_through_json() {
		let (merged, config) = resolve_config(&json!({}), &LabelFns::default()).unwrap();
		assert_eq!(config, GraphConfig::default());
		assert_eq!(merged["node"]["highlightColor"], json!("SAME"));
		assert_eq!(merged["link"]["type"], json!("STRAIGHT"));
		assert_eq!(merged["d3"]["gravity"], json!(-100.0));
	}

	#[test]
	fn partial_overrides_merge_over_defaults() {
		let overrides = json!({
			"directed": true,
			"node": { "highlightColor": "red", "size": { "width": 10, "height": 4 } },
			"link": { "type": "CURVE_SMOOTH" }
		});
		let (_, config) = resolve_config(&overrides, &LabelFns::default()).unwrap();
		assert!(config.directed);
		assert_eq!(config.node.highlight_color, Highlight::Value("red".to_string()));
		assert_eq!(config.node.highlight_stroke_color, Highlight::Same);
		assert_eq!(
			config.node.size,
			NodeSize::Box {
				width: 10.0,
				height: 4.0
			}
		);
		assert_eq!(config.node.color, "#d3d3d3");
		assert_eq!(config.link.link_type, LinkType::CurveSmooth);
	}

	#[test]
	fn label_functions_replace_label_property() {
		let label_fns = LabelFns {
			node: Some(Rc::new(|n: &GraphNode| format!("<{}>", n.id))),
			link: None,
		};
		let (_, config) = resolve_config(&json!({}), &label_fns).unwrap();
		assert!(matches!(config.node.label_property, LabelProperty::Func(_)));
		assert_eq!(config.link.label_property, LabelProperty::field("label"));
	}

	#[test]
	fn malformed_config_is_rejected() {
		let err = resolve_config(&json!({ "highlightDegree": "wide" }), &LabelFns::default())
			.unwrap_err();
		assert_eq!(err.kind, ErrorKind::InvalidConfig);
	}

	#[test]
	fn highlight_resolves_against_normal_value() {
		assert_eq!(Highlight::Same.resolve(2.0), 2.0);
		assert_eq!(Highlight::Value(4.0).resolve(2.0), 4.0);
	}
}
