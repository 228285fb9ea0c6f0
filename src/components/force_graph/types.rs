//! Graph data structures accepted by the state engine.
//!
//! Nodes and links deserialize from the JSON contract
//! `{ nodes: [{ id, ... }], links: [{ source, target, value?, ... }] }`.
//! Ids may be given as strings or numbers and are stringified. Fields the
//! engine does not recognize are kept in `extra` so label lookups and diffing
//! see the whole user record.

use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Node identity. Unique within a graph and immutable.
pub type NodeId = String;

fn deserialize_id<'de, D>(deserializer: D) -> Result<NodeId, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::String(s) => Ok(s),
		Value::Number(n) => Ok(n.to_string()),
		Value::Bool(b) => Ok(b.to_string()),
		other => Err(serde::de::Error::custom(format!(
			"expected a string or number id, found {other}"
		))),
	}
}

/// Renders a JSON scalar as label text. Containers and null yield `None`.
pub(crate) fn value_as_label(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

/// Simulation-owned part of a node: position, velocity and simulation index.
///
/// Mutated continuously by the simulation; survives re-initialization for
/// nodes whose id persists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Motion {
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub index: Option<usize>,
}

/// Node size: a symbol area, or a box for custom views.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSize {
	Area(f64),
	Box { width: f64, height: f64 },
}

impl NodeSize {
	/// Scales every dimension by `factor`.
	pub fn scaled(self, factor: f64) -> Self {
		match self {
			NodeSize::Area(a) => NodeSize::Area(a * factor),
			NodeSize::Box { width, height } => NodeSize::Box {
				width: width * factor,
				height: height * factor,
			},
		}
	}
}

/// Shape drawn for a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolType {
	#[default]
	Circle,
	Cross,
	Diamond,
	Square,
	Star,
	Triangle,
	Wye,
}

/// Where a node label is placed relative to the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPosition {
	Left,
	Right,
	Top,
	Bottom,
	Center,
}

/// Per-node visual overrides. `None` falls back to the configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeStyle {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub opacity: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub size: Option<NodeSize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub svg: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub symbol_type: Option<SymbolType>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub font_color: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stroke_width: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stroke_color: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label_property: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub label_position: Option<LabelPosition>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub render_label: Option<bool>,
}

/// A graph vertex.
///
/// Identity (`id`), user data (`style`, `extra`) and the simulation part
/// (`motion`) live in one record. On re-initialization identity, motion and
/// `highlighted` survive by id match; everything else comes from fresh input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	#[serde(deserialize_with = "deserialize_id")]
	pub id: NodeId,
	#[serde(flatten)]
	pub motion: Motion,
	#[serde(default)]
	pub highlighted: bool,
	/// Set when the node has no incident links in the adjacency matrix.
	#[serde(rename = "_orphan", default)]
	pub orphan: bool,
	#[serde(flatten)]
	pub style: NodeStyle,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl GraphNode {
	pub fn new(id: impl Into<NodeId>) -> Self {
		Self {
			id: id.into(),
			..Default::default()
		}
	}

	/// Reads a field by its JSON name, for label lookup.
	pub fn field(&self, name: &str) -> Option<String> {
		match name {
			"id" => Some(self.id.clone()),
			"color" => self.style.color.clone(),
			"svg" => self.style.svg.clone(),
			_ => self.extra.get(name).and_then(value_as_label),
		}
	}
}

/// A point a link path passes through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

/// Per-link visual overrides.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkStyle {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub opacity: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stroke_width: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub font_color: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub font_size: Option<f64>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub break_points: Vec<Point>,
}

/// A canonical graph edge: endpoints as plain ids, as supplied by the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
	#[serde(deserialize_with = "deserialize_id")]
	pub source: NodeId,
	#[serde(deserialize_with = "deserialize_id")]
	pub target: NodeId,
	/// Connection weight. Kept raw so non-numeric values can be rejected.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
	#[serde(flatten)]
	pub style: LinkStyle,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl GraphLink {
	pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			..Default::default()
		}
	}
}

/// Complete graph data: nodes and links.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
	pub nodes: Vec<GraphNode>,
	#[serde(default)]
	pub links: Vec<GraphLink>,
	/// Node the view should be centered on.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub focused_node_id: Option<NodeId>,
}

/// Computes a node label from the whole node record.
pub type NodeLabelFn = Rc<dyn Fn(&GraphNode) -> String>;
/// Computes a link label from the whole link record.
pub type LinkLabelFn = Rc<dyn Fn(&GraphLink) -> String>;

/// Label functions that replace `node.labelProperty` / `link.labelProperty`.
///
/// Functions cannot be expressed in the JSON configuration, so they travel
/// beside it and are installed after the configuration merge.
#[derive(Clone, Default)]
pub struct LabelFns {
	pub node: Option<NodeLabelFn>,
	pub link: Option<LinkLabelFn>,
}

impl std::fmt::Debug for LabelFns {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LabelFns")
			.field("node", &self.node.is_some())
			.field("link", &self.link.is_some())
			.finish()
	}
}

/// Everything the engine needs to (re)initialize a graph instance.
#[derive(Clone, Debug, Default)]
pub struct GraphInput {
	/// User-supplied instance id.
	pub id: String,
	pub data: GraphData,
	/// Partial configuration, merged over the defaults.
	pub config: Value,
	pub label_fns: LabelFns,
}

impl GraphInput {
	pub fn new(id: impl Into<String>, data: GraphData, config: Value) -> Self {
		Self {
			id: id.into(),
			data,
			config,
			label_fns: LabelFns::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn node_keeps_unknown_fields_and_stringifies_id() {
		let node: GraphNode =
			serde_json::from_value(json!({ "id": 7, "name": "seven", "color": "red", "x": 3.5 }))
				.unwrap();
		assert_eq!(node.id, "7");
		assert_eq!(node.motion.x, 3.5);
		assert_eq!(node.style.color.as_deref(), Some("red"));
		assert_eq!(node.field("name").as_deref(), Some("seven"));
		assert!(!node.extra.contains_key("x"));
		assert!(!node.extra.contains_key("color"));
	}

	#[test]
	fn link_reads_value_and_break_points() {
		let link: GraphLink = serde_json::from_value(json!({
			"source": "a",
			"target": 2,
			"value": 3,
			"breakPoints": [{ "x": 1, "y": 2 }],
			"label": "edge"
		}))
		.unwrap();
		assert_eq!(link.target, "2");
		assert_eq!(link.value, Some(json!(3)));
		assert_eq!(link.style.break_points, vec![Point { x: 1.0, y: 2.0 }]);
		assert_eq!(link.extra.get("label"), Some(&json!("edge")));
	}

	#[test]
	fn node_size_accepts_number_or_box() {
		let area: NodeSize = serde_json::from_value(json!(300)).unwrap();
		let boxed: NodeSize = serde_json::from_value(json!({ "width": 40, "height": 20 })).unwrap();
		assert_eq!(area, NodeSize::Area(300.0));
		assert_eq!(
			boxed.scaled(0.5),
			NodeSize::Box {
				width: 20.0,
				height: 10.0
			}
		);
	}
}
