//! Per-element render props.
//!
//! Pure functions turning a node or link, the configuration and the current
//! highlight/zoom context into a flat prop record. Props are rebuilt on every
//! frame and never cached: opacity, highlight and sizes all depend on
//! transient state.
//!
//! Geometric values are divided by the zoom factor so they keep a constant
//! size on screen.

use std::fmt;
use std::rc::Rc;

use super::config::{GraphConfig, Highlight, LabelProperty};
use super::marker::{MarkerId, marker_id};
use super::paths::build_link_path_definition;
use super::state::{Adjacency, HighlightedLink, NodeMap, SimulationLink};
use super::types::{GraphNode, LabelPosition, NodeSize, Point, SymbolType, value_as_label};

/// Receives the id of the node an event happened on.
pub type NodeCallback = Rc<dyn Fn(&str)>;
/// Receives the source and target ids of the link an event happened on.
pub type LinkCallback = Rc<dyn Fn(&str, &str)>;

/// Host callbacks for node interactions.
#[derive(Clone, Default)]
pub struct NodeCallbacks {
	pub on_click: Option<NodeCallback>,
	pub on_right_click: Option<NodeCallback>,
	pub on_mouse_over: Option<NodeCallback>,
	pub on_mouse_out: Option<NodeCallback>,
}

/// Host callbacks for link interactions.
#[derive(Clone, Default)]
pub struct LinkCallbacks {
	pub on_click: Option<LinkCallback>,
	pub on_right_click: Option<LinkCallback>,
	pub on_mouse_over: Option<LinkCallback>,
	pub on_mouse_out: Option<LinkCallback>,
}

impl fmt::Debug for NodeCallbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeCallbacks").finish_non_exhaustive()
	}
}

impl fmt::Debug for LinkCallbacks {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LinkCallbacks").finish_non_exhaustive()
	}
}

fn inverse_zoom(zoom: f64) -> f64 {
	if zoom > 0.0 { 1.0 / zoom } else { 1.0 }
}

fn highlighted_or<'a>(highlight: bool, value: &'a Highlight<String>, normal: &'a str) -> &'a str {
	match value {
		Highlight::Value(v) if highlight => v,
		_ => normal,
	}
}

/// Everything needed to draw one node.
#[derive(Debug)]
pub struct NodeProps<'a> {
	/// The node record the props were derived from.
	pub node: &'a GraphNode,
	pub id: &'a str,
	pub cx: f64,
	pub cy: f64,
	/// Label offset from the node center.
	pub dx: f64,
	pub fill: &'a str,
	pub stroke: &'a str,
	pub stroke_width: f64,
	pub font_color: &'a str,
	pub font_size: f64,
	pub font_weight: &'a str,
	pub label: String,
	pub label_position: Option<LabelPosition>,
	pub render_label: bool,
	pub opacity: f64,
	pub size: NodeSize,
	pub svg: &'a str,
	pub symbol_type: SymbolType,
	pub cursor: &'a str,
	pub highlighted: bool,
	callbacks: &'a NodeCallbacks,
}

impl NodeProps<'_> {
	pub fn click(&self) {
		if let Some(cb) = &self.callbacks.on_click {
			cb(self.id);
		}
	}

	pub fn right_click(&self) {
		if let Some(cb) = &self.callbacks.on_right_click {
			cb(self.id);
		}
	}

	pub fn mouse_over(&self) {
		if let Some(cb) = &self.callbacks.on_mouse_over {
			cb(self.id);
		}
	}

	pub fn mouse_out(&self) {
		if let Some(cb) = &self.callbacks.on_mouse_out {
			cb(self.id);
		}
	}
}

fn is_link_endpoint(id: &str, link: Option<&HighlightedLink>) -> bool {
	link.is_some_and(|l| l.source == id || l.target == id)
}

fn node_label(node: &GraphNode, config: &GraphConfig) -> String {
	match &config.node.label_property {
		LabelProperty::Func(f) => f(node),
		LabelProperty::Field(field) => {
			let field = node.style.label_property.as_deref().unwrap_or(field);
			node.field(field).unwrap_or_else(|| node.id.clone())
		}
	}
}

/// Builds the props for `node`.
pub fn build_node_props<'a>(
	node: &'a GraphNode,
	config: &'a GraphConfig,
	callbacks: &'a NodeCallbacks,
	highlighted_node: Option<&str>,
	highlighted_link: Option<&HighlightedLink>,
	zoom: f64,
) -> NodeProps<'a> {
	let cfg = &config.node;
	let highlight = node.highlighted || is_link_endpoint(&node.id, highlighted_link);
	let someone_highlighted = highlighted_node.is_some() || highlighted_link.is_some();

	let opacity = if someone_highlighted {
		if highlight { cfg.opacity } else { config.highlight_opacity }
	} else {
		node.style.opacity.unwrap_or(cfg.opacity)
	};

	let fill = highlighted_or(
		highlight,
		&cfg.highlight_color,
		node.style.color.as_deref().unwrap_or(&cfg.color),
	);
	let stroke = highlighted_or(
		highlight,
		&cfg.highlight_stroke_color,
		node.style.stroke_color.as_deref().unwrap_or(&cfg.stroke_color),
	);
	let font_weight = highlighted_or(highlight, &cfg.highlight_font_weight, &cfg.font_weight);
	let normal_stroke_width = node.style.stroke_width.unwrap_or(cfg.stroke_width);
	let stroke_width = if highlight {
		cfg.highlight_stroke_width.resolve(normal_stroke_width)
	} else {
		normal_stroke_width
	};
	let font_size = if highlight {
		cfg.highlight_font_size.resolve(cfg.font_size)
	} else {
		cfg.font_size
	};

	let t = inverse_zoom(zoom);
	let size = node.style.size.unwrap_or(cfg.size);
	let label_position = node.style.label_position.or(cfg.label_position);
	let offset = match size {
		NodeSize::Area(area) => area,
		NodeSize::Box { width, height } => match label_position {
			Some(LabelPosition::Left | LabelPosition::Right) => width,
			_ => height,
		},
	};

	NodeProps {
		node,
		id: &node.id,
		cx: node.motion.x,
		cy: node.motion.y,
		dx: font_size * t + offset / 100.0 + 1.5,
		fill,
		stroke,
		stroke_width: stroke_width * t,
		font_color: node.style.font_color.as_deref().unwrap_or(&cfg.font_color),
		font_size: font_size * t,
		font_weight,
		label: node_label(node, config),
		label_position,
		render_label: node.style.render_label.unwrap_or(cfg.render_label),
		opacity,
		size: size.scaled(t),
		svg: node.style.svg.as_deref().unwrap_or(&cfg.svg),
		symbol_type: node.style.symbol_type.unwrap_or(cfg.symbol_type),
		cursor: &cfg.mouse_cursor,
		highlighted: highlight,
		callbacks,
	}
}

/// Everything needed to draw one link.
#[derive(Debug)]
pub struct LinkProps<'a> {
	pub link: &'a SimulationLink,
	pub source: &'a str,
	pub target: &'a str,
	/// SVG path definition.
	pub d: String,
	pub stroke: &'a str,
	pub stroke_width: f64,
	pub stroke_dasharray: f64,
	pub stroke_dashoffset: f64,
	pub stroke_linecap: &'a str,
	pub opacity: f64,
	pub marker_id: Option<MarkerId>,
	pub label: Option<String>,
	pub font_size: Option<f64>,
	pub font_color: Option<&'a str>,
	pub font_weight: Option<&'a str>,
	pub cursor: &'a str,
	pub highlighted: bool,
	callbacks: &'a LinkCallbacks,
}

impl LinkProps<'_> {
	pub fn click(&self) {
		if let Some(cb) = &self.callbacks.on_click {
			cb(self.source, self.target);
		}
	}

	pub fn right_click(&self) {
		if let Some(cb) = &self.callbacks.on_right_click {
			cb(self.source, self.target);
		}
	}

	pub fn mouse_over(&self) {
		if let Some(cb) = &self.callbacks.on_mouse_over {
			cb(self.source, self.target);
		}
	}

	pub fn mouse_out(&self) {
		if let Some(cb) = &self.callbacks.on_mouse_out {
			cb(self.source, self.target);
		}
	}
}

fn position(nodes: &NodeMap, id: &str) -> Point {
	nodes
		.get(id)
		.map(|n| Point {
			x: n.motion.x,
			y: n.motion.y,
		})
		.unwrap_or_default()
}

fn link_weight(adjacency: &Adjacency, source: &str, target: &str) -> f64 {
	let lookup = |a: &str, b: &str| adjacency.get(a).and_then(|row| row.get(b)).copied();
	[lookup(source, target), lookup(target, source)]
		.into_iter()
		.flatten()
		.find(|&w| w != 0.0)
		.unwrap_or(1.0)
}

fn link_label(link: &SimulationLink, config: &GraphConfig) -> Option<String> {
	match &config.link.label_property {
		LabelProperty::Func(f) => Some(f(&link.link)),
		LabelProperty::Field(field) => link.link.extra.get(field).and_then(value_as_label),
	}
}

/// Builds the props for `link`.
#[allow(clippy::too_many_arguments)]
pub fn build_link_props<'a>(
	link: &'a SimulationLink,
	nodes: &NodeMap,
	adjacency: &Adjacency,
	config: &'a GraphConfig,
	callbacks: &'a LinkCallbacks,
	highlighted_node: Option<&str>,
	highlighted_link: Option<&HighlightedLink>,
	zoom: f64,
) -> LinkProps<'a> {
	let cfg = &config.link;
	let (source, target) = (link.source(), link.target());

	let d = build_link_path_definition(
		position(nodes, source),
		position(nodes, target),
		cfg.link_type,
		&link.link.style.break_points,
	);

	let main_node_participates = match config.highlight_degree {
		0 => false,
		2 => true,
		_ => highlighted_node.is_some_and(|h| h == source || h == target),
	};
	let endpoint_highlighted = |id: &str| nodes.get(id).is_some_and(|n| n.highlighted);
	let guilty_node =
		main_node_participates && endpoint_highlighted(source) && endpoint_highlighted(target);
	let guilty_link = highlighted_link.is_some_and(|l| l.source == source && l.target == target);
	let highlight = guilty_node || guilty_link;

	let opacity = if highlighted_node.is_some() || highlighted_link.is_some() {
		if highlight { cfg.opacity } else { config.highlight_opacity }
	} else {
		link.link.style.opacity.unwrap_or(cfg.opacity)
	};

	let stroke = highlighted_or(
		highlight,
		&cfg.highlight_color,
		link.link.style.color.as_deref().unwrap_or(&cfg.color),
	);

	let t = inverse_zoom(zoom);
	let mut stroke_width = link.link.style.stroke_width.unwrap_or(cfg.stroke_width) * t;
	if cfg.semantic_stroke_width {
		stroke_width += link_weight(adjacency, source, target) * stroke_width / 10.0;
	}

	let marker_id = config.directed.then(|| marker_id(highlight, zoom, config));

	let (label, font_size, font_color, font_weight) = if cfg.render_label {
		(
			link_label(link, config),
			Some(link.link.style.font_size.unwrap_or(cfg.font_size) * t),
			Some(link.link.style.font_color.as_deref().unwrap_or(&cfg.font_color)),
			Some(highlighted_or(highlight, &cfg.highlight_font_weight, &cfg.font_weight)),
		)
	} else {
		(None, None, None, None)
	};

	LinkProps {
		link,
		source,
		target,
		d,
		stroke,
		stroke_width,
		stroke_dasharray: cfg.stroke_dasharray,
		stroke_dashoffset: cfg.stroke_dashoffset,
		stroke_linecap: &cfg.stroke_linecap,
		opacity,
		marker_id,
		label,
		font_size,
		font_color,
		font_weight,
		cursor: &cfg.mouse_cursor,
		highlighted: highlight,
		callbacks,
	}
}
