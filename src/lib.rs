//! force-graph-state: interactive force-directed graph visualization.
//!
//! The crate keeps a reconciling graph state engine apart from its canvas
//! front-end. [`GraphState`] and the functions around it are plain Rust and
//! can be driven without a browser; [`GraphCanvas`] is the Leptos component
//! that puts a graph on screen.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::force_graph::{
	ErrorKind, GraphCallbacks, GraphCanvas, GraphConfig, GraphController, GraphData, GraphError,
	GraphInput, GraphLink, GraphNode, GraphState, LabelFns, compute_focus_transform, diff_config,
	diff_elements, initialize_state, set_highlight,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("force-graph: logging initialized");
}

/// Parses the JSON body of the script element with the given id.
fn load_script_json<T: DeserializeOwned>(element_id: &str) -> Option<T> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(element_id)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;

	match serde_json::from_str::<T>(&json_text) {
		Ok(value) => Some(value),
		Err(e) => {
			warn!("force-graph: failed to parse #{element_id}: {}", e);
			None
		}
	}
}

/// Graph data from `<script id="graph-data">`, as `{ nodes, links }`.
fn load_graph_data() -> Option<GraphData> {
	let data = load_script_json::<GraphData>("graph-data")?;
	info!(
		"force-graph: loaded {} nodes, {} links",
		data.nodes.len(),
		data.links.len()
	);
	Some(data)
}

/// Optional partial configuration from `<script id="graph-config">`.
fn load_graph_config() -> Value {
	load_script_json("graph-config").unwrap_or(Value::Null)
}

/// Main application component.
/// Loads graph data and configuration from the DOM and renders the graph.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let graph_data = load_graph_data().unwrap_or_default();
	let graph_config = load_graph_config();
	let data = Signal::derive(move || graph_data.clone());
	let config = Signal::derive(move || graph_config.clone());

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="graph-container">
			<GraphCanvas id="graph" data=data config=config />
			<div class="graph-overlay">
				<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
			</div>
		</div>
	}
}
