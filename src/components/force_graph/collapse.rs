//! Collapse and expand: hiding a node's links without deleting them.
//!
//! Collapsing marks every visible incident link of a node hidden and zeroes its
//! adjacency weight. The hidden link indices are remembered per node so that
//! expanding restores exactly those links with their value-derived weight.

use log::debug;

use super::config::GraphConfig;
use super::state::{Adjacency, GraphState, SimulationLink};
use super::types::NodeId;

/// In- and out-degree of a node, counting nonzero adjacency entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeDegree {
	pub in_degree: usize,
	pub out_degree: usize,
}

/// Counts incoming edges (rows holding `node_id` with nonzero weight) and
/// outgoing edges (nonzero entries of `node_id`'s own row).
pub fn compute_node_degree(node_id: &str, adjacency: &Adjacency) -> NodeDegree {
	let out_degree = adjacency
		.get(node_id)
		.map_or(0, |row| row.values().filter(|&&w| w != 0.0).count());
	let in_degree = adjacency
		.values()
		.filter(|row| row.get(node_id).is_some_and(|&w| w != 0.0))
		.count();
	NodeDegree {
		in_degree,
		out_degree,
	}
}

/// Links and adjacency after a collapse, plus the indices it hid.
#[derive(Clone, Debug, PartialEq)]
pub struct CollapseOutcome {
	pub links: Vec<SimulationLink>,
	pub adjacency: Adjacency,
	pub hidden: Vec<usize>,
}

fn set_weight(adjacency: &mut Adjacency, link: &SimulationLink, weight: f64, directed: bool) {
	adjacency
		.entry(link.source().to_string())
		.or_default()
		.insert(link.target().to_string(), weight);
	if !directed {
		adjacency
			.entry(link.target().to_string())
			.or_default()
			.insert(link.source().to_string(), weight);
	}
}

/// Hides every visible link incident to `node_id`.
pub fn collapse_node(
	node_id: &str,
	links: &[SimulationLink],
	adjacency: &Adjacency,
	config: &GraphConfig,
) -> CollapseOutcome {
	let mut links = links.to_vec();
	let mut adjacency = adjacency.clone();
	let mut hidden = Vec::new();

	for (i, link) in links.iter_mut().enumerate() {
		let incident = link.source() == node_id || link.target() == node_id;
		if incident && !link.is_hidden {
			link.is_hidden = true;
			set_weight(&mut adjacency, link, 0.0, config.directed);
			hidden.push(i);
		}
	}

	CollapseOutcome {
		links,
		adjacency,
		hidden,
	}
}

/// Restores the links at `hidden`: visible again, value-derived weight.
pub fn expand_node(
	hidden: &[usize],
	links: &[SimulationLink],
	adjacency: &Adjacency,
	config: &GraphConfig,
) -> (Vec<SimulationLink>, Adjacency) {
	let mut links = links.to_vec();
	let mut adjacency = adjacency.clone();
	for &i in hidden {
		if let Some(link) = links.get_mut(i) {
			link.is_hidden = false;
			set_weight(&mut adjacency, link, link.weight(), config.directed);
		}
	}
	(links, adjacency)
}

fn is_leaf(node_id: &str, adjacency: &Adjacency, directed: bool) -> bool {
	let NodeDegree {
		in_degree,
		out_degree,
	} = compute_node_degree(node_id, adjacency);
	if directed {
		in_degree <= 1 && out_degree == 0
	} else {
		in_degree <= 1 && out_degree <= 1
	}
}

/// Connections from `root` to neighbours that hang off it alone.
pub fn leaf_connections(root: &str, adjacency: &Adjacency, directed: bool) -> Vec<(NodeId, NodeId)> {
	let Some(row) = adjacency.get(root) else {
		return Vec::new();
	};
	let mut leaves: Vec<(NodeId, NodeId)> = row
		.keys()
		.filter(|target| is_leaf(target, adjacency, directed))
		.map(|target| (root.to_string(), target.clone()))
		.collect();
	leaves.sort();
	leaves
}

/// Whether a node should be drawn under collapse.
///
/// Nodes that never had links are always visible; others need at least one
/// visible incident link.
pub fn is_node_visible(node_id: &str, links: &[SimulationLink], adjacency: &Adjacency) -> bool {
	let has_links = links
		.iter()
		.any(|l| l.source() == node_id || l.target() == node_id);
	if !has_links {
		return true;
	}
	let degree = compute_node_degree(node_id, adjacency);
	degree.in_degree > 0 || degree.out_degree > 0
}

/// What [`GraphState::toggle_collapse`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollapseToggle {
	/// Links were hidden.
	Collapsed(usize),
	/// Previously hidden links were restored.
	Expanded(usize),
	/// The node had no visible links to hide.
	Unchanged,
}

impl GraphState {
	/// Collapses `node_id`, remembering the links it hid.
	pub fn collapse(&mut self, node_id: &str) -> usize {
		let outcome = collapse_node(node_id, &self.d3_links, &self.adjacency, &self.config);
		let count = outcome.hidden.len();
		self.d3_links = outcome.links;
		self.adjacency = outcome.adjacency;
		if count > 0 {
			self.collapsed
				.entry(node_id.to_string())
				.or_default()
				.extend(outcome.hidden);
			debug!(
				"graph {}: collapsed \"{node_id}\", {count} links hidden, leaves {:?}",
				self.id,
				leaf_connections(node_id, &self.adjacency, self.config.directed)
			);
		}
		count
	}

	/// Expands `node_id`, restoring the links its collapse hid.
	pub fn expand(&mut self, node_id: &str) -> usize {
		let Some(hidden) = self.collapsed.remove(node_id) else {
			return 0;
		};
		let (links, adjacency) = expand_node(&hidden, &self.d3_links, &self.adjacency, &self.config);
		self.d3_links = links;
		self.adjacency = adjacency;
		debug!(
			"graph {}: expanded \"{node_id}\", {} links restored",
			self.id,
			hidden.len()
		);
		hidden.len()
	}

	/// Expands a collapsed node, collapses any other.
	pub fn toggle_collapse(&mut self, node_id: &str) -> CollapseToggle {
		if self.collapsed.contains_key(node_id) {
			return CollapseToggle::Expanded(self.expand(node_id));
		}
		match self.collapse(node_id) {
			0 => CollapseToggle::Unchanged,
			n => CollapseToggle::Collapsed(n),
		}
	}

	/// Whether `node_id` should be drawn.
	pub fn is_node_visible(&self, node_id: &str) -> bool {
		!self.config.collapsible || is_node_visible(node_id, &self.d3_links, &self.adjacency)
	}
}
