//! Force-directed graph visualization.
//!
//! The graph is modelled as a [`GraphState`] built from user data and a
//! partial JSON configuration:
//! - [`initialize_state`] merges the configuration, validates links and
//!   builds the node arena, adjacency and simulation links
//! - [`diff_elements`] and [`diff_config`] decide what an update changes
//! - [`set_highlight`] propagates hover highlighting without mutating the
//!   current arena
//! - the collapse subsystem hides and restores every link incident to a node
//!
//! [`GraphController`] drives a state through its lifecycle and interaction,
//! and [`GraphCanvas`] puts it on an HTML canvas.
//!
//! # Example
//!
//! ```ignore
//! use force_graph_state::{GraphCanvas, GraphData, GraphLink, GraphNode};
//!
//! let data = GraphData {
//!     nodes: vec![GraphNode::new("a"), GraphNode::new("b")],
//!     links: vec![GraphLink::new("a", "b")],
//!     focused_node_id: None,
//! };
//!
//! view! { <GraphCanvas id="deps" data=Signal::derive(move || data.clone()) /> }
//! ```

pub mod builder;
pub mod collapse;
mod component;
pub mod config;
pub mod controller;
pub mod error;
pub mod marker;
pub mod paths;
mod render;
pub mod simulation;
pub mod state;
pub mod types;
pub mod utils;

pub use builder::{LinkCallbacks, LinkProps, NodeCallbacks, NodeProps, build_link_props, build_node_props};
pub use collapse::{CollapseToggle, NodeDegree, compute_node_degree, is_node_visible};
pub use component::GraphCanvas;
pub use config::{GraphConfig, Highlight, LabelProperty};
pub use controller::{GraphCallbacks, GraphController};
pub use error::{ErrorKind, GraphError};
pub use render::ImageCache;
pub use simulation::{ForceSimulation, ForceSimulationFactory, Simulation, SimulationFactory};
pub use state::{
	GraphState, compute_focus_transform, diff_config, diff_elements, initialize_state, set_highlight,
};
pub use types::{GraphData, GraphInput, GraphLink, GraphNode, LabelFns, NodeId};
