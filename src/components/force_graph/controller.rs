//! Interaction controller.
//!
//! [`GraphController`] is the single owner of a [`GraphState`]. It applies
//! data and configuration updates, keeps the view transform, translates
//! pointer input into drags, pans and zooms, and forwards interactions to the
//! host callbacks. Everything runs on one thread: the animation loop calls
//! [`GraphController::tick`] and event handlers call the `on_*` methods, each
//! to completion.
//!
//! The simulation follows a cancel-before-replace discipline: when a state is
//! replaced, the old simulation is stopped (dropping its tick callback) before
//! the new one is started.

use std::cell::Cell;
use std::collections::HashSet;
use std::f64::consts::PI;
use std::rc::Rc;

use log::{debug, info, warn};
use serde_json::Value;

use super::builder::{LinkCallbacks, LinkProps, NodeCallbacks, NodeProps, build_link_props, build_node_props};
use super::collapse::CollapseToggle;
use super::config::GraphConfig;
use super::error::GraphError;
use super::simulation::{ForceSimulationFactory, Simulation, SimulationFactory};
use super::state::{
	ConfigDiff, ElementsDiff, GraphState, HighlightedLink, ViewTransform, compute_focus_transform, diff_config,
	diff_elements, initialize_state,
};
use super::types::{GraphData, GraphInput, NodeId, NodeSize, Point};

/// Smallest hit radius around a node, in screen pixels.
pub const MIN_NODE_HIT_RADIUS: f64 = 6.0;
/// Distance from a link within which the pointer hits it, in screen pixels.
pub const LINK_HIT_DISTANCE: f64 = 4.0;

/// Host callbacks for every interaction the graph emits.
#[derive(Clone, Debug, Default)]
pub struct GraphCallbacks {
	pub node: NodeCallbacks,
	pub link: LinkCallbacks,
}

#[derive(Clone, Debug)]
struct DragState {
	node: NodeId,
	start: (f64, f64),
	node_start: (f64, f64),
	moved: bool,
}

#[derive(Clone, Copy, Debug)]
struct PanState {
	start: (f64, f64),
	view_start: (f64, f64),
}

/// Owns one graph instance and drives it from host events.
pub struct GraphController {
	state: GraphState,
	input: GraphInput,
	factory: Box<dyn SimulationFactory>,
	callbacks: GraphCallbacks,
	view: ViewTransform,
	drag: Option<DragState>,
	pan: Option<PanState>,
	pinned: HashSet<NodeId>,
	dirty: Rc<Cell<bool>>,
}

impl std::fmt::Debug for GraphController {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GraphController")
			.field("state", &self.state)
			.field("view", &self.view)
			.field("dragging", &self.drag.as_ref().map(|d| &d.node))
			.finish_non_exhaustive()
	}
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len2 = dx * dx + dy * dy;
	let t = if len2 > 0.0 {
		(((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
	} else {
		0.0
	};
	let (cx, cy) = (a.x + t * dx, a.y + t * dy);
	((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

fn hits_node(props: &NodeProps<'_>, x: f64, y: f64, k: f64) -> bool {
	let (dx, dy) = (x - props.cx, y - props.cy);
	let slop = MIN_NODE_HIT_RADIUS / k;
	match props.size {
		NodeSize::Area(area) => {
			let r = (area / PI).sqrt().max(slop);
			dx * dx + dy * dy <= r * r
		}
		NodeSize::Box { width, height } => {
			dx.abs() <= (width / 2.0).max(slop) && dy.abs() <= (height / 2.0).max(slop)
		}
	}
}

impl GraphController {
	/// Initializes the graph and starts its simulation (unless static).
	pub fn new(
		input: GraphInput,
		callbacks: GraphCallbacks,
		factory: Box<dyn SimulationFactory>,
	) -> Result<Self, GraphError> {
		let state = initialize_state(&input, None, factory.as_ref())?;
		let focused = input.data.focused_node_id.clone();
		let mut controller = Self {
			state,
			input,
			factory,
			callbacks,
			view: ViewTransform::default(),
			drag: None,
			pan: None,
			pinned: HashSet::new(),
			dirty: Rc::new(Cell::new(true)),
		};
		controller.apply_initial_zoom();
		if let Some(id) = focused {
			controller.focus_node(&id);
		}
		controller.restart_simulation();
		Ok(controller)
	}

	/// [`GraphController::new`] with the `force_graph` backed simulation.
	pub fn with_force_simulation(input: GraphInput, callbacks: GraphCallbacks) -> Result<Self, GraphError> {
		Self::new(input, callbacks, Box::new(ForceSimulationFactory))
	}

	pub fn state(&self) -> &GraphState {
		&self.state
	}

	pub fn config(&self) -> &GraphConfig {
		&self.state.config
	}

	pub fn view(&self) -> ViewTransform {
		self.view
	}

	pub fn is_dragging(&self) -> bool {
		self.drag.is_some()
	}

	pub fn is_panning(&self) -> bool {
		self.pan.is_some()
	}

	fn apply_initial_zoom(&mut self) {
		let Some(zoom) = self.state.config.initial_zoom else {
			return;
		};
		let k = self.state.config.clamp_zoom(zoom);
		let (cx, cy) = (self.state.config.width / 2.0, self.state.config.height / 2.0);
		self.view = ViewTransform {
			x: cx * (1.0 - k),
			y: cy * (1.0 - k),
			k,
		};
		self.state.transform = k;
	}

	/// Applies new data and configuration.
	///
	/// Re-initializes only when elements or configuration actually changed.
	/// On error the current state is kept untouched.
	pub fn update(&mut self, data: GraphData, config: Value) -> Result<(), GraphError> {
		let elements = diff_elements(&data, &self.state);
		let config_diff = diff_config(&config, &self.state);
		let focus_changed = data.focused_node_id != self.input.data.focused_node_id;

		if elements.graph_elements_updated || config_diff.config_updated {
			let mut input = self.input.clone();
			input.data = data;
			if config_diff.config_updated {
				input.config = config;
			}
			if let Err(e) = self.replace_state(&input, elements, config_diff) {
				warn!("graph {}: update rejected: {e}", self.state.id);
				return Err(e);
			}
			self.input = input;
		} else {
			self.input.data.focused_node_id = data.focused_node_id;
		}

		if focus_changed {
			if let Some(id) = self.input.data.focused_node_id.clone() {
				self.focus_node(&id);
			}
		}
		self.dirty.set(true);
		Ok(())
	}

	fn replace_state(
		&mut self,
		input: &GraphInput,
		elements: ElementsDiff,
		config: ConfigDiff,
	) -> Result<(), GraphError> {
		let mut next = initialize_state(input, Some(&self.state), self.factory.as_ref())?;
		let was_running = self.state.simulation.is_running();
		let same_viewport = next.config.width == self.state.config.width
			&& next.config.height == self.state.config.height;
		let carry_simulation = !elements.new_graph_elements && !config.d3_config_updated && same_viewport;
		if carry_simulation {
			next.adopt_simulation(&mut self.state);
		}
		self.state.stop_simulation();

		match self.state.highlighted_node.take() {
			Some(id) if next.nodes.contains_key(&id) => next.highlighted_node = Some(id),
			Some(id) => {
				for neighbour in self.state.adjacency.get(&id).into_iter().flat_map(|row| row.keys()) {
					if let Some(node) = next.nodes.get_mut(neighbour) {
						node.highlighted = false;
					}
				}
			}
			None => {}
		}
		next.highlighted_link = self.state.highlighted_link.take().filter(|l| {
			next.d3_links
				.iter()
				.any(|d| d.source() == l.source && d.target() == l.target)
		});
		next.transform = self.state.transform;
		next.config_updated = config.config_updated;
		next.d3_config_updated = config.d3_config_updated;
		next.new_graph_elements = elements.new_graph_elements;
		self.state = next;

		self.pinned.retain(|id| self.state.nodes.contains_key(id));
		for id in &self.pinned {
			if let Some(node) = self.state.nodes.get(id) {
				self.state.simulation.pin(id, Some((node.motion.x, node.motion.y)));
			}
		}
		if self
			.drag
			.as_ref()
			.is_some_and(|d| !self.state.nodes.contains_key(&d.node))
		{
			self.drag = None;
		}

		info!(
			"graph {}: state replaced (new elements: {}, config: {}, d3: {})",
			self.state.id, elements.new_graph_elements, config.config_updated, config.d3_config_updated
		);

		if self.state.config.static_graph {
			self.state.pause_simulation();
		} else if !carry_simulation && (elements.new_graph_elements || config.d3_config_updated || was_running) {
			self.restart_simulation();
		}
		Ok(())
	}

	/// Advances the simulation. Returns whether the graph needs a redraw.
	pub fn tick(&mut self, dt: f64) -> bool {
		let stepped = self.state.tick(dt);
		self.dirty.replace(false) || stepped
	}

	/// Reheats the simulation and registers the redraw callback. A static
	/// graph is paused instead.
	pub fn restart_simulation(&mut self) {
		if self.state.config.static_graph {
			self.state.pause_simulation();
			return;
		}
		let dirty = self.dirty.clone();
		self.state.simulation.on_tick(Box::new(move || dirty.set(true)));
		self.state.restart_simulation();
	}

	pub fn pause_simulation(&mut self) {
		self.state.pause_simulation();
	}

	/// Releases every pinned node and lets the layout settle again.
	pub fn reset_nodes_positions(&mut self) {
		self.pinned.clear();
		self.state.simulation.unpin_all();
		self.restart_simulation();
	}

	fn node_prop(&self, id: &str) -> Option<NodeProps<'_>> {
		let node = self.state.nodes.get(id)?;
		Some(build_node_props(
			node,
			&self.state.config,
			&self.callbacks.node,
			self.state.highlighted_node.as_deref(),
			self.state.highlighted_link.as_ref(),
			self.view.k,
		))
	}

	fn link_prop(&self, source: &str, target: &str) -> Option<LinkProps<'_>> {
		let link = self
			.state
			.d3_links
			.iter()
			.find(|l| l.source() == source && l.target() == target)?;
		Some(build_link_props(
			link,
			&self.state.nodes,
			&self.state.adjacency,
			&self.state.config,
			&self.callbacks.link,
			self.state.highlighted_node.as_deref(),
			self.state.highlighted_link.as_ref(),
			self.view.k,
		))
	}

	/// Props of every drawable node, in draw order.
	pub fn node_props(&self) -> Vec<NodeProps<'_>> {
		self.state
			.nodes
			.keys()
			.filter(|id| self.state.is_node_visible(id))
			.filter_map(|id| self.node_prop(id))
			.collect()
	}

	/// Props of every drawable link, in draw order.
	pub fn link_props(&self) -> Vec<LinkProps<'_>> {
		let k = self.view.k;
		self.state
			.d3_links
			.iter()
			.filter(|l| !l.is_hidden)
			.filter(|l| self.state.is_node_visible(l.source()) && self.state.is_node_visible(l.target()))
			.map(|l| {
				build_link_props(
					l,
					&self.state.nodes,
					&self.state.adjacency,
					&self.state.config,
					&self.callbacks.link,
					self.state.highlighted_node.as_deref(),
					self.state.highlighted_link.as_ref(),
					k,
				)
			})
			.collect()
	}

	pub fn on_mouse_over_node(&mut self, id: &str) {
		if self.state.config.node_highlight_behavior && self.drag.is_none() {
			self.state.highlight_node(id, true);
			self.dirty.set(true);
		}
		if let Some(props) = self.node_prop(id) {
			props.mouse_over();
		}
	}

	pub fn on_mouse_out_node(&mut self, id: &str) {
		if self.state.config.node_highlight_behavior && self.drag.is_none() {
			self.state.highlight_node(id, false);
			self.dirty.set(true);
		}
		if let Some(props) = self.node_prop(id) {
			props.mouse_out();
		}
	}

	/// Toggles collapse when the graph is collapsible, then notifies the host.
	pub fn on_click_node(&mut self, id: &str) {
		if self.state.config.collapsible && self.state.node(id).is_some() {
			if self.state.toggle_collapse(id) != CollapseToggle::Unchanged {
				self.state.sync_simulation_links();
				self.restart_simulation();
			}
			self.dirty.set(true);
		}
		if let Some(props) = self.node_prop(id) {
			props.click();
		}
	}

	pub fn on_right_click_node(&mut self, id: &str) {
		if let Some(props) = self.node_prop(id) {
			props.right_click();
		}
	}

	pub fn on_mouse_over_link(&mut self, source: &str, target: &str) {
		if self.state.config.link_highlight_behavior {
			self.state.highlighted_link = Some(HighlightedLink {
				source: source.to_string(),
				target: target.to_string(),
			});
			self.dirty.set(true);
		}
		if let Some(props) = self.link_prop(source, target) {
			props.mouse_over();
		}
	}

	pub fn on_mouse_out_link(&mut self, source: &str, target: &str) {
		if self.state.config.link_highlight_behavior {
			self.state.highlighted_link = None;
			self.dirty.set(true);
		}
		if let Some(props) = self.link_prop(source, target) {
			props.mouse_out();
		}
	}

	pub fn on_click_link(&mut self, source: &str, target: &str) {
		if let Some(props) = self.link_prop(source, target) {
			props.click();
		}
	}

	pub fn on_right_click_link(&mut self, source: &str, target: &str) {
		if let Some(props) = self.link_prop(source, target) {
			props.right_click();
		}
	}

	/// Starts dragging node `id` from screen point `(sx, sy)`.
	///
	/// Returns `false` when dragging is disabled or the node does not exist.
	/// The simulation is paused and the node pinned on the first move, so a
	/// plain click leaves the layout running.
	pub fn drag_start(&mut self, id: &str, sx: f64, sy: f64) -> bool {
		let config = &self.state.config;
		if config.static_graph || config.freeze_all_drag_events {
			return false;
		}
		let Some(node) = self.state.nodes.get(id) else {
			return false;
		};
		self.drag = Some(DragState {
			node: id.to_string(),
			start: (sx, sy),
			node_start: (node.motion.x, node.motion.y),
			moved: false,
		});
		true
	}

	/// Starts panning the view from screen point `(sx, sy)`.
	pub fn pan_start(&mut self, sx: f64, sy: f64) {
		self.pan = Some(PanState {
			start: (sx, sy),
			view_start: (self.view.x, self.view.y),
		});
	}

	/// Moves the dragged node, or pans, to follow the pointer.
	pub fn drag_move(&mut self, sx: f64, sy: f64) {
		if let Some(drag) = self.drag.as_mut() {
			if !drag.moved {
				drag.moved = true;
				self.state.pause_simulation();
				self.pinned.insert(drag.node.clone());
			}
			let k = self.view.k;
			let x = drag.node_start.0 + (sx - drag.start.0) / k;
			let y = drag.node_start.1 + (sy - drag.start.1) / k;
			if let Some(node) = self.state.nodes.get_mut(&drag.node) {
				node.motion.x = x;
				node.motion.y = y;
			}
			self.state.simulation.pin(&drag.node, Some((x, y)));
			self.dirty.set(true);
		} else if let Some(pan) = self.pan {
			self.view.x = pan.view_start.0 + (sx - pan.start.0);
			self.view.y = pan.view_start.1 + (sy - pan.start.1);
			self.dirty.set(true);
		}
	}

	/// Ends a drag or pan. A dropped node stays pinned unless
	/// `automaticRearrangeAfterDropNode` is set.
	pub fn drag_end(&mut self) {
		self.pan = None;
		let Some(drag) = self.drag.take() else {
			return;
		};
		if !drag.moved {
			return;
		}
		if self.state.config.automatic_rearrange_after_drop_node {
			self.state.simulation.pin(&drag.node, None);
			self.pinned.remove(&drag.node);
			self.restart_simulation();
		}
		debug!("graph {}: dropped \"{}\"", self.state.id, drag.node);
	}

	/// Zooms by `factor` keeping screen point `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let k = self.state.config.clamp_zoom(self.view.k * factor);
		let ratio = k / self.view.k;
		self.view.x = sx - (sx - self.view.x) * ratio;
		self.view.y = sy - (sy - self.view.y) * ratio;
		self.view.k = k;
		self.state.transform = k;
		self.dirty.set(true);
	}

	/// Centers the view on node `id` at the focus zoom.
	pub fn focus_node(&mut self, id: &str) -> bool {
		let Some(transform) = compute_focus_transform(self.state.node(id), &self.state.config) else {
			warn!("graph {}: cannot focus unknown node \"{id}\"", self.state.id);
			return false;
		};
		debug!("graph {}: focus {transform}", self.state.id);
		self.view = transform.view();
		self.state.transform = transform.scale;
		self.dirty.set(true);
		true
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point {
			x: (sx - self.view.x) / self.view.k,
			y: (sy - self.view.y) / self.view.k,
		}
	}

	/// The topmost drawable node under screen point `(sx, sy)`.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<NodeId> {
		let p = self.screen_to_graph(sx, sy);
		self.node_props()
			.into_iter()
			.rev()
			.find(|props| hits_node(props, p.x, p.y, self.view.k))
			.map(|props| props.id.to_string())
	}

	/// The topmost drawable link under screen point `(sx, sy)`.
	pub fn link_at_position(&self, sx: f64, sy: f64) -> Option<(NodeId, NodeId)> {
		let p = self.screen_to_graph(sx, sy);
		let position = |id: &str| {
			self.state
				.nodes
				.get(id)
				.map(|n| Point {
					x: n.motion.x,
					y: n.motion.y,
				})
				.unwrap_or_default()
		};
		self.link_props()
			.into_iter()
			.rev()
			.find(|props| {
				let threshold = (props.stroke_width / 2.0).max(LINK_HIT_DISTANCE / self.view.k);
				let mut points = vec![position(props.source)];
				points.extend(props.link.link.style.break_points.iter().copied());
				points.push(position(props.target));
				points
					.windows(2)
					.any(|w| distance_to_segment(p, w[0], w[1]) <= threshold)
			})
			.map(|props| (props.source.to_string(), props.target.to_string()))
	}

	/// Stops the simulation and drops pointer state. The controller keeps its
	/// data but no longer animates.
	pub fn teardown(&mut self) {
		self.state.stop_simulation();
		self.drag = None;
		self.pan = None;
		info!("graph {}: torn down", self.state.id);
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::collections::HashMap;

	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::components::force_graph::builder::{LinkCallback, NodeCallback};
	use crate::components::force_graph::config::D3Config;
	use crate::components::force_graph::error::ErrorKind;
	use crate::components::force_graph::simulation::TickCallback;
	use crate::components::force_graph::state::{NodeMap, SimulationLink};
	use crate::components::force_graph::types::GraphLink;

	#[derive(Default)]
	struct Log {
		created: usize,
		events: Vec<String>,
	}

	impl Log {
		fn position(&self, event: &str) -> Option<usize> {
			self.events.iter().position(|e| e == event)
		}
	}

	struct RecordingSimulation {
		n: usize,
		log: Rc<RefCell<Log>>,
		running: bool,
		tick: Option<TickCallback>,
	}

	impl RecordingSimulation {
		fn record(&self, event: String) {
			self.log.borrow_mut().events.push(format!("{}:{event}", self.n));
		}
	}

	impl Simulation for RecordingSimulation {
		fn configure(&mut self, _d3: &D3Config) {}

		fn set_nodes_and_links(&mut self, _nodes: &NodeMap, links: &[SimulationLink]) {
			let visible = links.iter().filter(|l| !l.is_hidden).count();
			self.record(format!("load {visible}"));
		}

		fn set_links(&mut self, links: &[SimulationLink]) {
			let visible = links.iter().filter(|l| !l.is_hidden).count();
			self.record(format!("links {visible}"));
		}

		fn on_tick(&mut self, callback: TickCallback) {
			self.tick = Some(callback);
		}

		fn step(&mut self, _dt: f64, _nodes: &mut NodeMap) -> bool {
			if !self.running {
				return false;
			}
			if let Some(tick) = self.tick.as_mut() {
				tick();
			}
			true
		}

		fn pin(&mut self, id: &str, position: Option<(f64, f64)>) {
			match position {
				Some(_) => self.record(format!("pin {id}")),
				None => self.record(format!("unpin {id}")),
			}
		}

		fn unpin_all(&mut self) {
			self.record("unpin all".into());
		}

		fn restart(&mut self) {
			self.running = true;
			self.record("restart".into());
		}

		fn pause(&mut self) {
			self.running = false;
			self.record("pause".into());
		}

		fn stop(&mut self) {
			self.running = false;
			self.tick = None;
			self.record("stop".into());
		}

		fn is_running(&self) -> bool {
			self.running
		}
	}

	struct RecordingFactory(Rc<RefCell<Log>>);

	impl SimulationFactory for RecordingFactory {
		fn create(&self, _width: f64, _height: f64, _gravity: f64) -> Box<dyn Simulation> {
			let n = {
				let mut log = self.0.borrow_mut();
				log.created += 1;
				log.created
			};
			Box::new(RecordingSimulation {
				n,
				log: self.0.clone(),
				running: false,
				tick: None,
			})
		}
	}

	fn data() -> GraphData {
		serde_json::from_value(json!({
			"nodes": [
				{ "id": "A", "x": 100, "y": 100 },
				{ "id": "B", "x": 200, "y": 100 },
				{ "id": "C", "x": 300, "y": 100 }
			],
			"links": [{ "source": "A", "target": "B" }, { "source": "B", "target": "C" }]
		}))
		.unwrap()
	}

	fn controller_with(config: Value, callbacks: GraphCallbacks) -> (GraphController, Rc<RefCell<Log>>) {
		let log = Rc::new(RefCell::new(Log::default()));
		let input = GraphInput::new("test", data(), config);
		let controller =
			GraphController::new(input, callbacks, Box::new(RecordingFactory(log.clone()))).unwrap();
		(controller, log)
	}

	fn controller(config: Value) -> (GraphController, Rc<RefCell<Log>>) {
		controller_with(config, GraphCallbacks::default())
	}

	type Calls = Rc<RefCell<Vec<String>>>;

	fn recording_callbacks() -> (GraphCallbacks, Calls) {
		let calls: Calls = Rc::default();
		let node = |tag: &'static str| -> Option<NodeCallback> {
			let calls = calls.clone();
			Some(Rc::new(move |id: &str| calls.borrow_mut().push(format!("{tag} {id}"))))
		};
		let link = |tag: &'static str| -> Option<LinkCallback> {
			let calls = calls.clone();
			Some(Rc::new(move |s: &str, t: &str| {
				calls.borrow_mut().push(format!("{tag} {s}-{t}"))
			}))
		};
		let callbacks = GraphCallbacks {
			node: NodeCallbacks {
				on_click: node("click"),
				on_right_click: node("right"),
				on_mouse_over: node("over"),
				on_mouse_out: node("out"),
			},
			link: LinkCallbacks {
				on_click: link("click"),
				on_right_click: link("right"),
				on_mouse_over: link("over"),
				on_mouse_out: link("out"),
			},
		};
		(callbacks, calls)
	}

	#[test]
	fn starts_simulation_unless_static() {
		let (mut c, log) = controller(json!({}));
		assert!(log.borrow().position("1:restart").is_some());
		assert!(c.tick(0.016));

		let (_, log) = controller(json!({ "staticGraph": true }));
		assert_eq!(log.borrow().position("1:restart"), None);
		assert!(log.borrow().position("1:pause").is_some());
	}

	#[test]
	fn topology_change_stops_old_simulation_before_starting_new() {
		let (mut c, log) = controller(json!({}));
		let mut next = data();
		next.nodes.push(serde_json::from_value(json!({ "id": "D" })).unwrap());
		next.links.push(GraphLink::new("C", "D"));
		c.update(next, json!({})).unwrap();

		let log = log.borrow();
		assert_eq!(log.created, 2);
		let stop = log.position("1:stop").unwrap();
		let start = log.position("2:restart").unwrap();
		assert!(stop < start);
		assert!(c.state().new_graph_elements);
		assert!(c.state().simulation.is_running());
		assert_eq!(c.state().nodes.len(), 4);
	}

	#[test]
	fn unchanged_input_keeps_the_state() {
		let (mut c, log) = controller(json!({ "width": 500 }));
		c.update(data(), json!({})).unwrap();
		c.update(data(), json!({ "width": 500 })).unwrap();
		assert_eq!(log.borrow().created, 1);
	}

	#[test]
	fn property_change_on_paused_graph_stays_paused() {
		let (mut c, log) = controller(json!({}));
		c.pause_simulation();
		let mut next = data();
		next.nodes[0].style.color = Some("red".into());
		c.update(next, json!({})).unwrap();

		let log = log.borrow();
		assert_eq!(log.created, 2);
		assert_eq!(log.position("2:restart"), None);
		assert_eq!(log.events.iter().filter(|e| *e == "1:restart").count(), 1);
		assert!(!c.state().simulation.is_running());
		assert_eq!(c.state().nodes["A"].style.color.as_deref(), Some("red"));
		assert!(!c.state().new_graph_elements);
	}

	#[test]
	fn property_change_carries_the_running_simulation_over() {
		let (mut c, log) = controller(json!({}));
		let mut next = data();
		next.nodes[1].style.color = Some("red".into());
		c.update(next, json!({ "linkHighlightBehavior": true })).unwrap();

		let log = log.borrow();
		let carried = log.position("1:links 2").unwrap();
		let fresh_stopped = log.position("2:stop").unwrap();
		assert!(carried < fresh_stopped);
		assert_eq!(log.position("1:stop"), None);
		assert_eq!(log.events.iter().filter(|e| *e == "1:restart").count(), 1);
		assert!(c.state().simulation.is_running());
		assert!(c.config().link_highlight_behavior);
	}

	#[test]
	fn removing_the_highlighted_node_clears_its_neighbours() {
		let (mut c, _) = controller(json!({ "nodeHighlightBehavior": true }));
		c.on_mouse_over_node("C");
		assert!(c.state().nodes["B"].highlighted);

		let next: GraphData = serde_json::from_value(json!({
			"nodes": [{ "id": "A", "x": 100, "y": 100 }, { "id": "B", "x": 200, "y": 100 }],
			"links": [{ "source": "A", "target": "B" }]
		}))
		.unwrap();
		c.update(next, json!({})).unwrap();
		assert_eq!(c.state().highlighted_node, None);
		assert!(c.state().nodes.values().all(|n| !n.highlighted));
	}

	#[test]
	fn d3_change_restarts_simulation() {
		let (mut c, log) = controller(json!({}));
		c.pause_simulation();
		c.update(data(), json!({ "d3": { "gravity": -250 } })).unwrap();
		assert!(c.state().d3_config_updated);
		assert!(log.borrow().position("2:restart").is_some());
		assert_eq!(c.config().d3.gravity, -250.0);
	}

	#[test]
	fn rejected_update_keeps_current_state() {
		let (mut c, log) = controller(json!({}));
		let mut bad = data();
		bad.links.push(GraphLink::new("A", "Z"));
		let err = c.update(bad, json!({})).unwrap_err();
		assert_eq!(err.kind, ErrorKind::InvalidLink);
		assert_eq!(c.state().d3_links.len(), 2);
		assert_eq!(log.borrow().created, 1);
		assert!(c.state().simulation.is_running());
	}

	#[test]
	fn hover_highlights_only_with_behavior() {
		let (callbacks, calls) = recording_callbacks();
		let (mut c, _) = controller_with(json!({}), callbacks.clone());
		c.on_mouse_over_node("A");
		assert_eq!(c.state().highlighted_node, None);
		assert_eq!(*calls.borrow(), vec!["over A".to_string()]);

		let (mut c, _) = controller_with(json!({ "nodeHighlightBehavior": true }), callbacks);
		c.on_mouse_over_node("A");
		assert_eq!(c.state().highlighted_node.as_deref(), Some("A"));
		assert!(c.state().nodes["B"].highlighted);
		assert!(!c.state().nodes["C"].highlighted);
		c.on_mouse_out_node("A");
		assert_eq!(c.state().highlighted_node, None);
		assert!(c.state().nodes.values().all(|n| !n.highlighted));
	}

	#[test]
	fn click_collapses_and_expands() {
		let (callbacks, calls) = recording_callbacks();
		let (mut c, log) = controller_with(json!({ "collapsible": true }), callbacks);

		c.on_click_node("B");
		assert!(c.link_props().is_empty());
		assert!(c.node_props().is_empty());
		assert!(log.borrow().position("1:links 0").is_some());
		assert_eq!(log.borrow().created, 1);

		c.on_click_node("B");
		assert_eq!(c.link_props().len(), 2);
		assert_eq!(c.node_props().len(), 3);
		assert_eq!(*calls.borrow(), vec!["click B".to_string(), "click B".to_string()]);
	}

	#[test]
	fn click_without_collapsible_only_notifies() {
		let (callbacks, calls) = recording_callbacks();
		let (mut c, _) = controller_with(json!({}), callbacks);
		c.on_click_node("B");
		c.on_right_click_node("C");
		assert_eq!(c.link_props().len(), 2);
		assert_eq!(*calls.borrow(), vec!["click B".to_string(), "right C".to_string()]);
	}

	#[test]
	fn link_hover_designates_highlighted_link() {
		let (callbacks, calls) = recording_callbacks();
		let (mut c, _) = controller_with(json!({ "linkHighlightBehavior": true }), callbacks);
		c.on_mouse_over_link("B", "C");
		let highlighted: Vec<bool> = c.link_props().iter().map(|p| p.highlighted).collect();
		assert_eq!(highlighted, vec![false, true]);
		c.on_mouse_out_link("B", "C");
		assert_eq!(c.state().highlighted_link, None);
		c.on_click_link("A", "B");
		assert_eq!(
			*calls.borrow(),
			vec!["over B-C".to_string(), "out B-C".to_string(), "click A-B".to_string()]
		);
	}

	#[test]
	fn dragging_pins_and_moves_the_node() {
		let (mut c, log) = controller(json!({}));
		assert!(c.drag_start("A", 100.0, 100.0));
		c.drag_move(110.0, 120.0);
		c.drag_end();

		let a = &c.state().nodes["A"];
		assert_eq!((a.motion.x, a.motion.y), (110.0, 120.0));
		let log = log.borrow();
		assert!(log.position("1:pause").is_some());
		assert!(log.position("1:pin A").is_some());
		assert_eq!(log.position("1:unpin A"), None);
		assert!(!c.is_dragging());
	}

	#[test]
	fn drop_rearranges_when_enabled() {
		let (mut c, log) = controller(json!({ "automaticRearrangeAfterDropNode": true }));
		c.drag_start("A", 0.0, 0.0);
		c.drag_move(5.0, 5.0);
		c.drag_end();
		let log = log.borrow();
		let unpin = log.position("1:unpin A").unwrap();
		assert_eq!(log.events.last().map(String::as_str), Some("1:restart"));
		assert!(unpin < log.events.len() - 1);
	}

	#[test]
	fn pressing_without_moving_leaves_the_layout_running() {
		let (mut c, log) = controller(json!({}));
		assert!(c.drag_start("A", 100.0, 100.0));
		c.drag_end();
		assert_eq!(log.borrow().position("1:pause"), None);
		assert_eq!(log.borrow().position("1:pin A"), None);
		assert!(c.state().simulation.is_running());
	}

	#[test]
	fn drag_is_disabled_when_frozen() {
		let (mut c, _) = controller(json!({ "freezeAllDragEvents": true }));
		assert!(!c.drag_start("A", 100.0, 100.0));
		let (mut c, _) = controller(json!({ "staticGraph": true }));
		assert!(!c.drag_start("A", 100.0, 100.0));
	}

	#[test]
	fn dragged_node_stays_pinned_across_updates() {
		let (mut c, log) = controller(json!({}));
		c.drag_start("A", 100.0, 100.0);
		c.drag_move(120.0, 100.0);
		c.drag_end();
		let mut next = data();
		next.nodes.push(serde_json::from_value(json!({ "id": "D" })).unwrap());
		c.update(next, json!({})).unwrap();
		assert!(log.borrow().position("2:pin A").is_some());
	}

	#[test]
	fn panning_moves_the_view() {
		let (mut c, _) = controller(json!({}));
		c.pan_start(10.0, 10.0);
		c.drag_move(30.0, 5.0);
		c.drag_end();
		assert_eq!((c.view().x, c.view().y), (20.0, -5.0));
		assert!(!c.is_panning());
	}

	#[test]
	fn zoom_is_clamped_around_the_cursor() {
		let (mut c, _) = controller(json!({ "maxZoom": 4 }));
		let before = c.screen_to_graph(250.0, 150.0);
		c.zoom_at(250.0, 150.0, 100.0);
		assert_eq!(c.view().k, 4.0);
		assert_eq!(c.state().transform, 4.0);
		let after = c.screen_to_graph(250.0, 150.0);
		assert!((before.x - after.x).abs() < 1e-9);
		assert!((before.y - after.y).abs() < 1e-9);

		c.zoom_at(0.0, 0.0, 1e-6);
		assert_eq!(c.view().k, 0.1);
	}

	#[test]
	fn initial_zoom_and_focused_node_set_the_view() {
		let (c, _) = controller(json!({ "initialZoom": 2 }));
		assert_eq!(
			c.view(),
			ViewTransform {
				x: -400.0,
				y: -200.0,
				k: 2.0
			}
		);

		let log = Rc::new(RefCell::new(Log::default()));
		let mut focused = data();
		focused.focused_node_id = Some("B".into());
		let input = GraphInput::new("test", focused, json!({ "focusZoom": 2 }));
		let c = GraphController::new(input, GraphCallbacks::default(), Box::new(RecordingFactory(log))).unwrap();
		assert_eq!(
			c.view(),
			ViewTransform {
				x: 0.0,
				y: 0.0,
				k: 2.0
			}
		);
	}

	#[test]
	fn update_focuses_newly_focused_node() {
		let (mut c, _) = controller(json!({}));
		let mut next = data();
		next.focused_node_id = Some("C".into());
		c.update(next, json!({})).unwrap();
		assert_eq!(
			c.view(),
			ViewTransform {
				x: 100.0,
				y: 100.0,
				k: 1.0
			}
		);
		assert!(!c.focus_node("Z"));
	}

	#[test]
	fn hit_testing_nodes_and_links() {
		let (c, _) = controller(json!({}));
		assert_eq!(c.node_at_position(105.0, 100.0).as_deref(), Some("A"));
		assert_eq!(c.node_at_position(150.0, 300.0), None);
		assert_eq!(
			c.link_at_position(150.0, 101.0),
			Some(("A".to_string(), "B".to_string()))
		);
		assert_eq!(c.link_at_position(150.0, 140.0), None);
	}

	#[test]
	fn teardown_stops_ticking() {
		let (mut c, log) = controller(json!({}));
		c.tick(0.016);
		c.teardown();
		assert!(log.borrow().position("1:stop").is_some());
		assert!(!c.tick(0.016));
	}

	#[test]
	fn reset_releases_pins_and_reheats() {
		let (mut c, log) = controller(json!({}));
		c.drag_start("A", 0.0, 0.0);
		c.drag_move(1.0, 1.0);
		c.drag_end();
		c.reset_nodes_positions();
		let log = log.borrow();
		assert!(log.position("1:unpin all").is_some());
		assert_eq!(log.events.last().map(String::as_str), Some("1:restart"));
	}

	#[test]
	fn highlighted_node_survives_property_updates() {
		let (mut c, _) = controller(json!({ "nodeHighlightBehavior": true }));
		c.on_mouse_over_node("B");
		let mut next = data();
		next.nodes[2].style.color = Some("blue".into());
		c.update(next, json!({})).unwrap();
		assert_eq!(c.state().highlighted_node.as_deref(), Some("B"));
		let lit: HashMap<&str, bool> = c
			.state()
			.nodes
			.values()
			.map(|n| (n.id.as_str(), n.highlighted))
			.collect();
		assert_eq!(lit, HashMap::from([("A", true), ("B", true), ("C", true)]));
	}
}
