//! Leptos component hosting a graph on a canvas element.
//!
//! The component owns a [`GraphController`] and wires DOM events to it:
//! hover and click hit-testing, node dragging, background panning, wheel
//! zoom and the context menu. An animation loop runs via
//! `requestAnimationFrame`, ticking the simulation and repainting when
//! something changed. Reactive `data`/`config` changes are applied through
//! [`GraphController::update`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info, warn};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::controller::{GraphCallbacks, GraphController};
use super::render::{self, ImageCache};
use super::types::{GraphData, GraphInput, LabelFns, NodeId};

/// Pointer travel, in pixels, below which a press-release counts as a click.
const CLICK_TOLERANCE: f64 = 3.0;
/// Simulation step per animation frame, in seconds.
const FRAME_DT: f64 = 0.016;

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Hovered {
	Node(NodeId),
	Link(NodeId, NodeId),
}

#[derive(Default)]
struct Shared {
	controller: RefCell<Option<GraphController>>,
	hovered: RefCell<Option<Hovered>>,
	pressed: Cell<Option<(f64, f64)>>,
	torn_down: Cell<bool>,
}

impl Shared {
	fn teardown(&self) {
		if self.torn_down.replace(true) {
			return;
		}
		if let Some(controller) = self.controller.borrow_mut().as_mut() {
			controller.teardown();
		}
	}
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn hit(controller: &GraphController, x: f64, y: f64) -> Option<Hovered> {
	controller
		.node_at_position(x, y)
		.map(Hovered::Node)
		.or_else(|| {
			controller
				.link_at_position(x, y)
				.map(|(s, t)| Hovered::Link(s, t))
		})
}

/// Fires out/over callbacks when the hovered element changes.
fn set_hovered(controller: &mut GraphController, hovered: &RefCell<Option<Hovered>>, next: Option<Hovered>) {
	let mut current = hovered.borrow_mut();
	if *current == next {
		return;
	}
	match current.take() {
		Some(Hovered::Node(id)) => controller.on_mouse_out_node(&id),
		Some(Hovered::Link(s, t)) => controller.on_mouse_out_link(&s, &t),
		None => {}
	}
	match &next {
		Some(Hovered::Node(id)) => controller.on_mouse_over_node(id),
		Some(Hovered::Link(s, t)) => controller.on_mouse_over_link(s, t),
		None => {}
	}
	*current = next;
}

fn set_cursor(canvas_ref: NodeRef<leptos::html::Canvas>, controller: &GraphController, hovered: Option<&Hovered>) {
	let Some(canvas) = canvas_ref.get_untracked() else {
		return;
	};
	let canvas: HtmlCanvasElement = canvas.into();
	let config = controller.config();
	let cursor = match hovered {
		Some(Hovered::Node(_)) => config.node.mouse_cursor.as_str(),
		Some(Hovered::Link(..)) => config.link.mouse_cursor.as_str(),
		None if controller.is_panning() => "grabbing",
		None => "grab",
	};
	let _ = web_sys::HtmlElement::style(&canvas).set_property("cursor", cursor);
}

fn size_canvas(canvas: &HtmlCanvasElement, controller: &GraphController) {
	let config = controller.config();
	canvas.set_width(config.width as u32);
	canvas.set_height(config.height as u32);
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok()??.dyn_into().ok()
}

fn request_frame(callback: &FrameCallback) {
	if let (Some(window), Some(cb)) = (web_sys::window(), callback.borrow().as_ref()) {
		let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
	}
}

/// Renders an interactive graph on a canvas element.
///
/// `data` and `config` are reactive: changes are diffed against the current
/// state and only rebuild what changed. `config` is a partial configuration
/// merged over the defaults; the canvas takes its `width` and `height`.
/// Invalid data is logged and leaves the previous graph on screen.
#[component]
pub fn GraphCanvas(
	#[prop(into)] id: String,
	#[prop(into)] data: Signal<GraphData>,
	#[prop(into, default = Signal::derive(|| Value::Null))] config: Signal<Value>,
	#[prop(optional)] callbacks: GraphCallbacks,
	#[prop(optional)] label_fns: LabelFns,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let shared = Rc::new(Shared::default());
	let images = Rc::new(RefCell::new(ImageCache::default()));
	let animate: FrameCallback = Rc::new(RefCell::new(None));

	let (shared_fx, animate_fx) = (shared.clone(), animate.clone());
	Effect::new(move |_| {
		let data = data.get();
		let config = config.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();

		{
			let mut slot = shared_fx.controller.borrow_mut();
			if let Some(controller) = slot.as_mut() {
				if let Err(e) = controller.update(data, config) {
					warn!("graph {id}: keeping previous graph: {e}");
				}
				size_canvas(&canvas, controller);
				return;
			}

			let mut input = GraphInput::new(id.clone(), data, config);
			input.label_fns = label_fns.clone();
			match GraphController::with_force_simulation(input, callbacks.clone()) {
				Ok(controller) => {
					size_canvas(&canvas, &controller);
					*slot = Some(controller);
				}
				Err(e) => {
					error!("graph {id}: {e}");
					return;
				}
			}
		}

		let Some(ctx) = context_2d(&canvas) else {
			error!("graph {id}: canvas has no 2d context");
			return;
		};
		info!("graph {id}: mounted");

		let (shared_anim, images_anim, animate_inner) = (shared_fx.clone(), images.clone(), animate_fx.clone());
		*animate_fx.borrow_mut() = Some(Closure::new(move || {
			if shared_anim.torn_down.get() {
				return;
			}
			if !canvas.is_connected() {
				shared_anim.teardown();
				return;
			}
			if let Some(controller) = shared_anim.controller.borrow_mut().as_mut() {
				let mut images = images_anim.borrow_mut();
				if controller.tick(FRAME_DT) || images.has_pending() {
					render::render(controller, &ctx, &mut images);
				}
			}
			request_frame(&animate_inner);
		}));
		request_frame(&animate_fx);
	});

	let stored = StoredValue::new_local(shared.clone());
	on_cleanup(move || {
		let _ = stored.try_with_value(|shared| shared.teardown());
	});

	let shared_md = shared.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if ev.button() != 0 {
			return;
		}
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		shared_md.pressed.set(Some((x, y)));
		if let Some(c) = shared_md.controller.borrow_mut().as_mut() {
			match c.node_at_position(x, y) {
				Some(id) => {
					c.drag_start(&id, x, y);
				}
				None => c.pan_start(x, y),
			}
		}
	};

	let shared_mm = shared.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(c) = shared_mm.controller.borrow_mut().as_mut() {
			if c.is_dragging() || c.is_panning() {
				c.drag_move(x, y);
			} else {
				let next = hit(c, x, y);
				set_hovered(c, &shared_mm.hovered, next);
			}
			set_cursor(canvas_ref, c, shared_mm.hovered.borrow().as_ref());
		}
	};

	let shared_mu = shared.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let pressed = shared_mu.pressed.take();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(c) = shared_mu.controller.borrow_mut().as_mut() {
			c.drag_end();
			let is_click = pressed.is_some_and(|(px, py)| {
				(x - px).abs() <= CLICK_TOLERANCE && (y - py).abs() <= CLICK_TOLERANCE
			});
			if is_click {
				match hit(c, x, y) {
					Some(Hovered::Node(id)) => c.on_click_node(&id),
					Some(Hovered::Link(s, t)) => c.on_click_link(&s, &t),
					None => {}
				}
			}
			set_cursor(canvas_ref, c, shared_mu.hovered.borrow().as_ref());
		}
	};

	let shared_ml = shared.clone();
	let on_mouseleave = move |_: MouseEvent| {
		shared_ml.pressed.set(None);
		if let Some(c) = shared_ml.controller.borrow_mut().as_mut() {
			c.drag_end();
			set_hovered(c, &shared_ml.hovered, None);
		}
	};

	let shared_cm = shared.clone();
	let on_contextmenu = move |ev: MouseEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(c) = shared_cm.controller.borrow_mut().as_mut() {
			match hit(c, x, y) {
				Some(Hovered::Node(id)) => c.on_right_click_node(&id),
				Some(Hovered::Link(s, t)) => c.on_right_click_link(&s, &t),
				None => {}
			}
		}
	};

	let shared_wh = shared;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(c) = shared_wh.controller.borrow_mut().as_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			c.zoom_at(x, y, factor);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:contextmenu=on_contextmenu
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
