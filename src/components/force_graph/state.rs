//! Graph state engine.
//!
//! Reconciles external graph data with the simulation state. A [`GraphState`]
//! is derived, never appended to: every data or configuration change that
//! alters the elements produces a fresh state through [`initialize_state`],
//! carrying over what must survive (node motion, highlight, hidden links) from
//! the previous one.
//!
//! Nodes live in an id-keyed arena ([`NodeMap`]). Simulation links refer to
//! nodes by key and are matched to canonical links by position across
//! rebuilds, so the simulation keeps its accumulated state.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::Value;

use super::config::{GraphConfig, resolve_config};
use super::error::{ErrorKind, GraphError};
use super::simulation::{Simulation, SimulationFactory};
use super::types::{GraphData, GraphInput, GraphLink, GraphNode, NodeId};
use super::utils::{fail, is_deep_equal, merge, omit};

/// Node arena, keyed by id, in input order.
pub type NodeMap = IndexMap<NodeId, GraphNode>;
/// Node id to neighbour id to connection weight.
pub type Adjacency = HashMap<NodeId, HashMap<NodeId, f64>>;

/// Node fields that never take part in element diffing: simulation output
/// and engine-managed flags.
pub const NODE_FIELDS_EXCLUDED_FROM_DIFF: [&str; 7] =
	["x", "y", "vx", "vy", "index", "highlighted", "_orphan"];

/// A link as seen by the simulation: endpoints resolved to arena keys.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationLink {
	/// Position of the canonical link this entry mirrors.
	pub index: usize,
	/// The canonical link, with its custom visual props.
	pub link: GraphLink,
	/// Numeric `value` of the canonical link.
	pub value: Option<f64>,
	pub is_hidden: bool,
}

impl SimulationLink {
	fn new(index: usize, link: GraphLink, value: Option<f64>) -> Self {
		Self {
			index,
			link,
			value,
			is_hidden: false,
		}
	}

	pub fn source(&self) -> &str {
		&self.link.source
	}

	pub fn target(&self) -> &str {
		&self.link.target
	}

	/// Adjacency weight derived from `value` (1 when absent or zero).
	pub fn weight(&self) -> f64 {
		match self.value {
			Some(v) if v != 0.0 => v,
			_ => 1.0,
		}
	}
}

/// The link designated as highlighted from outside (e.g. on link hover).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightedLink {
	pub source: NodeId,
	pub target: NodeId,
}

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor (1.0 = 100%).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// Translate-scale-translate transform centering the view on a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FocusTransform {
	/// Viewport center.
	pub translate: (f64, f64),
	pub scale: f64,
	/// Negated node position.
	pub offset: (f64, f64),
}

impl FocusTransform {
	/// The same transform collapsed into a single pan/zoom.
	pub fn view(&self) -> ViewTransform {
		ViewTransform {
			x: self.translate.0 + self.scale * self.offset.0,
			y: self.translate.1 + self.scale * self.offset.1,
			k: self.scale,
		}
	}
}

impl fmt::Display for FocusTransform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"translate({}, {}) scale({}) translate({}, {})",
			self.translate.0, self.translate.1, self.scale, self.offset.0, self.offset.1
		)
	}
}

/// Canonical state of one graph instance.
///
/// Owns the simulation: dropping the state stops it.
pub struct GraphState {
	pub id: String,
	pub config: GraphConfig,
	/// Merged configuration as JSON, the reference for config diffing.
	pub config_value: Value,
	pub nodes: NodeMap,
	/// Canonical links, as supplied.
	pub links: Vec<GraphLink>,
	pub d3_links: Vec<SimulationLink>,
	pub adjacency: Adjacency,
	pub simulation: Box<dyn Simulation>,
	pub highlighted_node: Option<NodeId>,
	pub highlighted_link: Option<HighlightedLink>,
	/// Current zoom factor.
	pub transform: f64,
	/// Link indices hidden by each collapsed node.
	pub collapsed: HashMap<NodeId, Vec<usize>>,
	pub config_updated: bool,
	pub d3_config_updated: bool,
	pub new_graph_elements: bool,
}

impl fmt::Debug for GraphState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GraphState")
			.field("id", &self.id)
			.field("nodes", &self.nodes.len())
			.field("links", &self.d3_links.len())
			.field("highlighted_node", &self.highlighted_node)
			.field("transform", &self.transform)
			.finish_non_exhaustive()
	}
}

impl Drop for GraphState {
	fn drop(&mut self) {
		self.simulation.stop();
	}
}

fn link_value(link: &GraphLink) -> Result<Option<f64>, GraphError> {
	match &link.value {
		None => Ok(None),
		Some(Value::Number(n)) => Ok(n.as_f64()),
		Some(other) => Err(fail(
			ErrorKind::InvalidLinkValue,
			"Graph",
			format!(
				"link {} -> {} has non-numeric value {other}",
				link.source, link.target
			),
		)),
	}
}

fn validate(data: &GraphData) -> Result<Vec<Option<f64>>, GraphError> {
	if data.nodes.is_empty() {
		return Err(fail(
			ErrorKind::InsufficientData,
			"Graph",
			"no nodes were supplied, a graph needs at least one node",
		));
	}

	let ids: HashSet<&str> = data.nodes.iter().map(|n| n.id.as_str()).collect();
	data.links
		.iter()
		.map(|link| {
			for endpoint in [&link.source, &link.target] {
				if !ids.contains(endpoint.as_str()) {
					return Err(fail(
						ErrorKind::InvalidLink,
						"Graph",
						format!(
							"link {} -> {} references node \"{endpoint}\" which is not in the nodes list",
							link.source, link.target
						),
					));
				}
			}
			link_value(link)
		})
		.collect()
}

fn initialize_nodes(nodes: &[GraphNode], previous: Option<&GraphState>) -> NodeMap {
	let mut map = NodeMap::with_capacity(nodes.len());
	for node in nodes {
		let mut next = node.clone();
		next.orphan = false;
		match previous.and_then(|p| p.nodes.get(&node.id)) {
			Some(prev) => {
				next.motion = prev.motion.clone();
				next.highlighted = prev.highlighted;
			}
			None => next.highlighted = false,
		}
		if map.insert(next.id.clone(), next).is_some() {
			warn!("graph: duplicate node id \"{}\", keeping the last one", node.id);
		}
	}
	map
}

fn initialize_links(
	links: &[GraphLink],
	values: Vec<Option<f64>>,
	config: &GraphConfig,
	previous: Option<&GraphState>,
) -> Vec<SimulationLink> {
	let toggled_directed = previous.is_some_and(|p| p.config.directed != config.directed);

	links.iter()
		.zip(values)
		.enumerate()
		.map(|(index, (link, value))| {
			let mut next = SimulationLink::new(index, link.clone(), value);
			if let Some(prev) = previous.and_then(|p| p.d3_links.get(index)) {
				let same_endpoints = prev.source() == link.source && prev.target() == link.target;
				next.is_hidden =
					config.collapsible && !toggled_directed && same_endpoints && prev.is_hidden;
			}
			next
		})
		.collect()
}

/// Builds the adjacency matrix. Every node gets a row.
///
/// Undirected graphs get symmetric entries. With `collapsible`, hidden links
/// weigh 0.
pub fn build_adjacency(nodes: &NodeMap, links: &[SimulationLink], config: &GraphConfig) -> Adjacency {
	let mut adjacency: Adjacency = nodes.keys().map(|id| (id.clone(), HashMap::new())).collect();
	for link in links {
		let weight = if config.collapsible && link.is_hidden {
			0.0
		} else {
			link.weight()
		};
		adjacency
			.entry(link.source().to_string())
			.or_default()
			.insert(link.target().to_string(), weight);
		if !config.directed {
			adjacency
				.entry(link.target().to_string())
				.or_default()
				.insert(link.source().to_string(), weight);
		}
	}
	adjacency
}

/// Sets `orphan` on every node without nonzero in- or out-edges.
pub fn tag_orphans(nodes: &mut NodeMap, adjacency: &Adjacency) {
	for (id, node) in nodes.iter_mut() {
		let degree = super::collapse::compute_node_degree(id, adjacency);
		node.orphan = degree.in_degree == 0 && degree.out_degree == 0;
	}
}

fn normalize_id(id: &str) -> String {
	id.chars()
		.map(|c| if c.is_whitespace() { '_' } else { c })
		.collect()
}

/// Validates `input` and derives a fresh graph state.
///
/// With a `previous` state, node motion and highlight carry over by id and
/// simulation links carry over by index. Fails without building anything when
/// the input is invalid. The returned simulation is loaded but idle.
pub fn initialize_state(
	input: &GraphInput,
	previous: Option<&GraphState>,
	factory: &dyn SimulationFactory,
) -> Result<GraphState, GraphError> {
	let values = validate(&input.data)?;
	let (config_value, mut config) = resolve_config(&input.config, &input.label_fns)?;

	let mut nodes = initialize_nodes(&input.data.nodes, previous);
	let d3_links = initialize_links(&input.data.links, values, &config, previous);
	let adjacency = build_adjacency(&nodes, &d3_links, &config);
	tag_orphans(&mut nodes, &adjacency);

	let id = normalize_id(&input.id);
	let mut simulation = factory.create(config.width, config.height, config.d3.gravity);
	simulation.configure(&config.d3);
	simulation.set_nodes_and_links(&nodes, &d3_links);

	config.focus_zoom = config.clamp_zoom(config.focus_zoom);

	let collapsed = match previous {
		Some(prev) if config.collapsible => prev
			.collapsed
			.iter()
			.filter(|(node_id, _)| nodes.contains_key(*node_id))
			.map(|(node_id, hidden)| {
				let still_hidden = hidden
					.iter()
					.copied()
					.filter(|&i| d3_links.get(i).is_some_and(|l| l.is_hidden))
					.collect::<Vec<_>>();
				(node_id.clone(), still_hidden)
			})
			.filter(|(_, hidden)| !hidden.is_empty())
			.collect(),
		_ => HashMap::new(),
	};

	info!(
		"graph {id}: initialized {} nodes, {} links",
		nodes.len(),
		d3_links.len()
	);

	Ok(GraphState {
		id,
		config,
		config_value,
		nodes,
		links: input.data.links.clone(),
		d3_links,
		adjacency,
		simulation,
		highlighted_node: None,
		highlighted_link: None,
		transform: 1.0,
		collapsed,
		config_updated: false,
		d3_config_updated: false,
		new_graph_elements: false,
	})
}

/// Outcome of [`diff_elements`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElementsDiff {
	/// Some node (ignoring simulation output) or link differs.
	pub graph_elements_updated: bool,
	/// Counts, node ids or link endpoints differ.
	pub new_graph_elements: bool,
}

fn comparable_node(node: &GraphNode) -> Value {
	match serde_json::to_value(node) {
		Ok(Value::Object(map)) => Value::Object(omit(&map, &NODE_FIELDS_EXCLUDED_FROM_DIFF)),
		_ => Value::Null,
	}
}

fn comparable_links(links: &[GraphLink]) -> Value {
	serde_json::to_value(links).unwrap_or(Value::Null)
}

/// Compares incoming data against the current state.
pub fn diff_elements(next: &GraphData, state: &GraphState) -> ElementsDiff {
	let next_nodes = Value::Array(next.nodes.iter().map(comparable_node).collect());
	let state_nodes = Value::Array(state.nodes.values().map(comparable_node).collect());

	let next_ids: HashSet<&str> = next.nodes.iter().map(|n| n.id.as_str()).collect();
	let state_ids: HashSet<&str> = state.nodes.keys().map(String::as_str).collect();
	let next_pairs: HashSet<(&str, &str)> = next
		.links
		.iter()
		.map(|l| (l.source.as_str(), l.target.as_str()))
		.collect();
	let state_pairs: HashSet<(&str, &str)> = state
		.links
		.iter()
		.map(|l| (l.source.as_str(), l.target.as_str()))
		.collect();

	let new_graph_elements = next.nodes.len() != state.nodes.len()
		|| next.links.len() != state.links.len()
		|| next_ids != state_ids
		|| next_pairs != state_pairs;

	let graph_elements_updated = new_graph_elements
		|| !is_deep_equal(&next_nodes, &state_nodes)
		|| !is_deep_equal(&comparable_links(&next.links), &comparable_links(&state.links));

	ElementsDiff {
		graph_elements_updated,
		new_graph_elements,
	}
}

/// Outcome of [`diff_config`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigDiff {
	pub config_updated: bool,
	pub d3_config_updated: bool,
}

/// Compares an incoming partial configuration against the current one.
///
/// The partial configuration is merged over the defaults first, so a key left
/// out means "default". An absent or empty configuration never signals an
/// update.
pub fn diff_config(next: &Value, state: &GraphState) -> ConfigDiff {
	let empty = match next {
		Value::Null => true,
		Value::Object(map) => map.is_empty(),
		_ => false,
	};
	if empty {
		return ConfigDiff::default();
	}

	let merged = merge(&super::config::default_config_value(), next);
	ConfigDiff {
		config_updated: !is_deep_equal(&merged, &state.config_value),
		d3_config_updated: !is_deep_equal(&merged["d3"], &state.config_value["d3"]),
	}
}

/// The transform centering the viewport on `node` at the focus zoom.
pub fn compute_focus_transform(node: Option<&GraphNode>, config: &GraphConfig) -> Option<FocusTransform> {
	let node = node?;
	Some(FocusTransform {
		translate: (config.width / 2.0, config.height / 2.0),
		scale: config.focus_zoom,
		offset: (-node.motion.x, -node.motion.y),
	})
}

/// Result of [`set_highlight`].
#[derive(Clone, Debug, PartialEq)]
pub struct HighlightUpdate {
	pub nodes: NodeMap,
	/// The active focus node, `None` after deactivation.
	pub highlighted_node: Option<NodeId>,
}

/// Toggles highlight on `node_id`, and on its neighbours unless
/// `highlight_degree` is 0. Returns new maps; `nodes` is left untouched.
pub fn set_highlight(
	nodes: &NodeMap,
	adjacency: &Adjacency,
	config: &GraphConfig,
	node_id: &str,
	active: bool,
) -> HighlightUpdate {
	let mut next = nodes.clone();
	let Some(node) = next.get_mut(node_id) else {
		return HighlightUpdate {
			nodes: next,
			highlighted_node: None,
		};
	};
	node.highlighted = active;

	if config.highlight_degree != 0 {
		if let Some(neighbours) = adjacency.get(node_id) {
			for neighbour in neighbours.keys() {
				if let Some(n) = next.get_mut(neighbour) {
					n.highlighted = active;
				}
			}
		}
	}

	HighlightUpdate {
		nodes: next,
		highlighted_node: active.then(|| node_id.to_string()),
	}
}

impl GraphState {
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.get(id)
	}

	/// Applies [`set_highlight`] and stores the result.
	pub fn highlight_node(&mut self, node_id: &str, active: bool) {
		let update = set_highlight(&self.nodes, &self.adjacency, &self.config, node_id, active);
		self.nodes = update.nodes;
		self.highlighted_node = update.highlighted_node;
	}

	/// Advances the simulation one step. Returns whether anything moved.
	pub fn tick(&mut self, dt: f64) -> bool {
		self.simulation.step(dt, &mut self.nodes)
	}

	pub fn restart_simulation(&mut self) {
		debug!("graph {}: simulation restarted", self.id);
		self.simulation.restart();
	}

	pub fn pause_simulation(&mut self) {
		self.simulation.pause();
	}

	pub fn stop_simulation(&mut self) {
		debug!("graph {}: simulation stopped", self.id);
		self.simulation.stop();
	}

	/// Pushes link visibility changes made in place into the simulation.
	/// Node momentum is kept.
	pub fn sync_simulation_links(&mut self) {
		self.simulation.set_links(&self.d3_links);
	}

	/// Takes over the simulation of `previous`, so node momentum and cooling
	/// carry on through the rebuild. Only valid when both states hold the same
	/// nodes under the same d3 configuration and viewport; `previous` is left
	/// with this state's fresh simulation.
	pub fn adopt_simulation(&mut self, previous: &mut GraphState) {
		std::mem::swap(&mut self.simulation, &mut previous.simulation);
		self.sync_simulation_links();
		debug!("graph {}: simulation carried over", self.id);
	}
}
