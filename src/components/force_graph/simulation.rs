//! Force simulation collaborator.
//!
//! The engine talks to the physics through [`Simulation`]: it hands over the
//! node arena and the simulation links, registers a tick callback, and asks
//! for steps. [`ForceSimulation`] implements it on top of `force_graph`, which
//! integrates node motion under the many-body force. Link springs, the
//! horizontal/vertical centering forces and the cooling factor are applied on
//! top, so links can change without resetting node momentum.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, ForceGraph, NodeData, SimulationParameters};
use log::debug;

use super::config::D3Config;
use super::state::{NodeMap, SimulationLink};
use super::types::NodeId;

/// Strength of the pull towards the horizontal center.
pub const FORCE_X: f64 = 0.06;
/// Strength of the pull towards the vertical center.
pub const FORCE_Y: f64 = 0.06;

/// Scale from d3-style many-body strength to `force_graph` charge.
const CHARGE_SCALE: f64 = 1.5;
/// Per-step approach of `alpha` towards `alpha_target`.
const ALPHA_DECAY: f64 = 0.0228;

/// Invoked after every simulation step that moved nodes.
pub type TickCallback = Box<dyn FnMut()>;

/// A long-lived layout process attached to one graph state.
///
/// Implementations must be cheap to stop and must drop their tick callback
/// on [`Simulation::stop`], so no callback outlives the owning state.
pub trait Simulation {
	/// Applies many-body/link tuning.
	fn configure(&mut self, d3: &D3Config);
	/// Replaces the simulated elements. Existing positions are taken from
	/// `nodes`; hidden links exert no force.
	fn set_nodes_and_links(&mut self, nodes: &NodeMap, links: &[SimulationLink]);
	/// Replaces the links only. Node positions, momentum and cooling carry on.
	fn set_links(&mut self, links: &[SimulationLink]);
	/// Registers the redraw callback, replacing any previous one.
	fn on_tick(&mut self, callback: TickCallback);
	/// Advances one step and writes positions back into `nodes`.
	/// Returns `false` when the simulation is not running.
	fn step(&mut self, dt: f64, nodes: &mut NodeMap) -> bool;
	/// Fixes a node at a position, or releases it with `None`.
	fn pin(&mut self, id: &str, position: Option<(f64, f64)>);
	/// Releases every pinned node.
	fn unpin_all(&mut self);
	/// Reheats and resumes the simulation.
	fn restart(&mut self);
	/// Suspends stepping, keeping the tick callback.
	fn pause(&mut self);
	/// Suspends stepping and drops the tick callback.
	fn stop(&mut self);
	fn is_running(&self) -> bool;
}

/// Creates simulations for new graph states.
pub trait SimulationFactory {
	fn create(&self, width: f64, height: f64, gravity: f64) -> Box<dyn Simulation>;
}

/// Node payload carried through `force_graph`.
#[derive(Clone, Debug, Default)]
pub struct SimNode {
	pub id: NodeId,
}

/// A visible link resolved to simulation nodes, d3-style: `strength` is
/// scaled down for well-connected endpoints and `bias` moves the less
/// connected end further.
#[derive(Clone, Copy, Debug)]
struct Spring {
	source: DefaultNodeIdx,
	target: DefaultNodeIdx,
	strength: f64,
	bias: f64,
}

/// [`Simulation`] backed by `force_graph`.
pub struct ForceSimulation {
	graph: ForceGraph<SimNode, ()>,
	gravity: f64,
	link_strength: f64,
	link_length: f64,
	springs: Vec<Spring>,
	indices: HashMap<NodeId, DefaultNodeIdx>,
	order: HashMap<NodeId, usize>,
	pinned: HashSet<NodeId>,
	center: (f64, f64),
	link_force: bool,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	tick_callback: Option<TickCallback>,
}

fn simulation_parameters(gravity: f64) -> SimulationParameters {
	SimulationParameters {
		force_charge: ((-gravity).max(0.0) * CHARGE_SCALE) as f32,
		force_spring: 0.0,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	}
}

impl ForceSimulation {
	pub fn new(width: f64, height: f64, gravity: f64) -> Self {
		Self {
			graph: ForceGraph::new(simulation_parameters(gravity)),
			gravity,
			link_strength: 1.0,
			link_length: D3Config::default().link_length,
			springs: Vec::new(),
			indices: HashMap::new(),
			order: HashMap::new(),
			pinned: HashSet::new(),
			center: (width / 2.0, height / 2.0),
			link_force: true,
			alpha: 1.0,
			alpha_target: D3Config::default().alpha_target,
			running: false,
			tick_callback: None,
		}
	}

	/// Initial placement for never-simulated nodes: a phyllotaxis spiral
	/// around the center, so no two nodes start on the same spot.
	fn initial_position(&self, i: usize) -> (f64, f64) {
		let radius = 10.0 * (0.5 + i as f64).sqrt();
		let angle = i as f64 * PI * (3.0 - 5f64.sqrt());
		(
			self.center.0 + radius * angle.cos(),
			self.center.1 + radius * angle.sin(),
		)
	}

	/// Pulls linked nodes towards `link_length` apart, scaled by `alpha`.
	fn apply_springs(&mut self, alpha: f64) {
		if !self.link_force || self.springs.is_empty() {
			return;
		}
		let mut positions = HashMap::with_capacity(self.indices.len());
		self.graph.visit_nodes(|node| {
			positions.insert(node.index(), (node.x() as f64, node.y() as f64));
		});

		let mut shift: HashMap<DefaultNodeIdx, (f64, f64)> = HashMap::new();
		for spring in &self.springs {
			let (Some(&(sx, sy)), Some(&(tx, ty))) =
				(positions.get(&spring.source), positions.get(&spring.target))
			else {
				continue;
			};
			let (dx, dy) = (tx - sx, ty - sy);
			let distance = (dx * dx + dy * dy).sqrt();
			if distance == 0.0 {
				continue;
			}
			let k = (distance - self.link_length) / distance * alpha * spring.strength;
			let (fx, fy) = (dx * k, dy * k);
			let t = shift.entry(spring.target).or_default();
			t.0 -= fx * spring.bias;
			t.1 -= fy * spring.bias;
			let s = shift.entry(spring.source).or_default();
			s.0 += fx * (1.0 - spring.bias);
			s.1 += fy * (1.0 - spring.bias);
		}

		self.graph.visit_nodes_mut(|node| {
			if node.data.is_anchor {
				return;
			}
			if let Some(&(dx, dy)) = shift.get(&node.index()) {
				node.data.x += dx as f32;
				node.data.y += dy as f32;
			}
		});
	}
}

impl Simulation for ForceSimulation {
	fn configure(&mut self, d3: &D3Config) {
		self.gravity = d3.gravity;
		self.link_strength = d3.link_strength;
		self.link_length = d3.link_length;
		self.link_force = !d3.disable_link_force;
		self.alpha_target = d3.alpha_target;
	}

	fn set_nodes_and_links(&mut self, nodes: &NodeMap, links: &[SimulationLink]) {
		let mut graph = ForceGraph::new(simulation_parameters(self.gravity));
		let mut indices = HashMap::with_capacity(nodes.len());
		let mut order = HashMap::with_capacity(nodes.len());

		for (i, node) in nodes.values().enumerate() {
			let fresh = node.motion.index.is_none() && node.motion.x == 0.0 && node.motion.y == 0.0;
			let (x, y) = if fresh {
				self.initial_position(i)
			} else {
				(node.motion.x, node.motion.y)
			};
			let idx = graph.add_node(NodeData {
				x: x as f32,
				y: y as f32,
				mass: 10.0,
				is_anchor: self.pinned.contains(&node.id),
				user_data: SimNode {
					id: node.id.clone(),
				},
			});
			indices.insert(node.id.clone(), idx);
			order.insert(node.id.clone(), i);
		}

		self.pinned.retain(|id| indices.contains_key(id));
		self.graph = graph;
		self.indices = indices;
		self.order = order;
		self.set_links(links);
		debug!("simulation: loaded {} nodes", self.indices.len());
	}

	fn set_links(&mut self, links: &[SimulationLink]) {
		let resolved: Vec<(DefaultNodeIdx, DefaultNodeIdx)> = links
			.iter()
			.filter(|l| !l.is_hidden && l.source() != l.target())
			.filter_map(|l| Some((*self.indices.get(l.source())?, *self.indices.get(l.target())?)))
			.collect();

		let mut count: HashMap<DefaultNodeIdx, f64> = HashMap::new();
		for (s, t) in &resolved {
			*count.entry(*s).or_default() += 1.0;
			*count.entry(*t).or_default() += 1.0;
		}

		let link_strength = self.link_strength;
		self.springs = resolved
			.into_iter()
			.map(|(source, target)| {
				let cs = count.get(&source).copied().unwrap_or(1.0);
				let ct = count.get(&target).copied().unwrap_or(1.0);
				Spring {
					source,
					target,
					strength: link_strength / cs.min(ct),
					bias: cs / (cs + ct),
				}
			})
			.collect();
		debug!("simulation: {} active links", self.springs.len());
	}

	fn on_tick(&mut self, callback: TickCallback) {
		self.tick_callback = Some(callback);
	}

	fn step(&mut self, dt: f64, nodes: &mut NodeMap) -> bool {
		if !self.running {
			return false;
		}

		self.alpha += (self.alpha_target - self.alpha) * ALPHA_DECAY;
		let alpha = self.alpha;
		self.graph.update((dt * alpha) as f32);
		self.apply_springs(alpha);

		let (cx, cy) = self.center;
		self.graph.visit_nodes_mut(|node| {
			if node.data.is_anchor {
				return;
			}
			let (x, y) = (node.data.x as f64, node.data.y as f64);
			node.data.x = (x + (cx - x) * FORCE_X * alpha) as f32;
			node.data.y = (y + (cy - y) * FORCE_Y * alpha) as f32;
		});

		let order = &self.order;
		self.graph.visit_nodes(|node| {
			let id = &node.data.user_data.id;
			if let Some(target) = nodes.get_mut(id) {
				let (x, y) = (node.x() as f64, node.y() as f64);
				if dt > 0.0 {
					target.motion.vx = (x - target.motion.x) / dt;
					target.motion.vy = (y - target.motion.y) / dt;
				}
				target.motion.x = x;
				target.motion.y = y;
				target.motion.index = order.get(id).copied();
			}
		});

		if let Some(callback) = self.tick_callback.as_mut() {
			callback();
		}
		true
	}

	fn pin(&mut self, id: &str, position: Option<(f64, f64)>) {
		let Some(&idx) = self.indices.get(id) else {
			return;
		};
		match position {
			Some(_) => {
				self.pinned.insert(id.to_string());
			}
			None => {
				self.pinned.remove(id);
			}
		}
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				if let Some((x, y)) = position {
					node.data.x = x as f32;
					node.data.y = y as f32;
				}
				node.data.is_anchor = position.is_some();
			}
		});
	}

	fn unpin_all(&mut self) {
		self.pinned.clear();
		self.graph.visit_nodes_mut(|node| node.data.is_anchor = false);
	}

	fn restart(&mut self) {
		self.alpha = 1.0;
		self.running = true;
	}

	fn pause(&mut self) {
		self.running = false;
	}

	fn stop(&mut self) {
		self.running = false;
		self.tick_callback = None;
	}

	fn is_running(&self) -> bool {
		self.running
	}
}

/// Builds [`ForceSimulation`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForceSimulationFactory;

impl SimulationFactory for ForceSimulationFactory {
	fn create(&self, width: f64, height: f64, gravity: f64) -> Box<dyn Simulation> {
		Box::new(ForceSimulation::new(width, height, gravity))
	}
}
