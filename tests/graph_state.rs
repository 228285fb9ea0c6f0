//! End-to-end properties of the graph state engine, driven through the
//! public API without a browser.

use std::collections::HashSet;

use force_graph_state::components::force_graph::builder::{LinkCallbacks, build_link_props};
use force_graph_state::components::force_graph::collapse::compute_node_degree;
use force_graph_state::components::force_graph::simulation::ForceSimulationFactory;
use force_graph_state::components::force_graph::state::{NODE_FIELDS_EXCLUDED_FROM_DIFF, NodeMap};
use force_graph_state::components::force_graph::utils::{is_deep_equal, omit};
use force_graph_state::{
	ErrorKind, GraphData, GraphInput, GraphLink, GraphNode, GraphState, diff_elements, initialize_state,
	set_highlight,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

fn data(value: Value) -> GraphData {
	serde_json::from_value(value).unwrap()
}

fn chain() -> GraphData {
	data(json!({
		"nodes": [{ "id": "A" }, { "id": "B" }, { "id": "C" }],
		"links": [{ "source": "A", "target": "B" }, { "source": "B", "target": "C" }]
	}))
}

fn init(data: GraphData, config: Value) -> Result<GraphState, force_graph_state::GraphError> {
	initialize_state(&GraphInput::new("props", data, config), None, &ForceSimulationFactory)
}

fn comparable(nodes: &NodeMap) -> Value {
	Value::Array(
		nodes
			.values()
			.map(|n| match serde_json::to_value(n).unwrap() {
				Value::Object(map) => Value::Object(omit(&map, &NODE_FIELDS_EXCLUDED_FROM_DIFF)),
				other => other,
			})
			.collect(),
	)
}

/// Up to eight nodes and links between any of them, self-loops included.
fn graph_strategy() -> impl Strategy<Value = GraphData> {
	(1usize..8).prop_flat_map(|n| {
		proptest::collection::vec((0..n, 0..n), 0..12).prop_map(move |pairs| GraphData {
			nodes: (0..n).map(|i| GraphNode::new(format!("n{i}"))).collect(),
			links: pairs
				.into_iter()
				.map(|(s, t)| GraphLink::new(format!("n{s}"), format!("n{t}")))
				.collect(),
			focused_node_id: None,
		})
	})
}

proptest! {
	#[test]
	fn node_keys_and_adjacency_rows_match_input(graph in graph_strategy(), directed in any::<bool>()) {
		let state = init(graph.clone(), json!({ "directed": directed })).unwrap();
		let input_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
		let keys: HashSet<&str> = state.nodes.keys().map(String::as_str).collect();
		prop_assert_eq!(&keys, &input_ids);
		for id in input_ids {
			prop_assert!(state.adjacency.contains_key(id));
		}
	}

	#[test]
	fn undirected_adjacency_is_symmetric(graph in graph_strategy()) {
		let state = init(graph.clone(), json!({})).unwrap();
		for link in &graph.links {
			prop_assert_eq!(
				state.adjacency[&link.source].get(&link.target),
				state.adjacency[&link.target].get(&link.source)
			);
		}
	}

	#[test]
	fn orphans_are_exactly_unlinked_nodes(graph in graph_strategy()) {
		let state = init(graph.clone(), json!({})).unwrap();
		for node in state.nodes.values() {
			let linked = graph
				.links
				.iter()
				.any(|l| l.source == node.id || l.target == node.id);
			prop_assert_eq!(node.orphan, !linked, "node {}", node.id);
		}
	}

	#[test]
	fn reinitialization_is_idempotent(graph in graph_strategy()) {
		let input = GraphInput::new("props", graph, Value::Null);
		let first = initialize_state(&input, None, &ForceSimulationFactory).unwrap();
		let second = initialize_state(&input, Some(&first), &ForceSimulationFactory).unwrap();
		let third = initialize_state(&input, Some(&second), &ForceSimulationFactory).unwrap();
		prop_assert!(is_deep_equal(&comparable(&second.nodes), &comparable(&third.nodes)));
	}
}

#[test]
fn validation_rejects_bad_input() {
	let empty = init(data(json!({ "nodes": [], "links": [] })), Value::Null);
	assert_eq!(empty.err().map(|e| e.kind), Some(ErrorKind::InsufficientData));

	let mut dangling = chain();
	dangling.links.push(GraphLink::new("C", "Z"));
	let err = init(dangling, Value::Null).err().unwrap();
	assert_eq!(err.kind, ErrorKind::InvalidLink);
	assert!(err.message.contains('Z'));

	let mut bad_value = chain();
	bad_value.links[1].value = Some(json!("heavy"));
	assert_eq!(
		init(bad_value, Value::Null).err().map(|e| e.kind),
		Some(ErrorKind::InvalidLinkValue)
	);
}

#[test]
fn highlight_reaches_neighbours_only_at_degree_one() {
	let data = data(json!({
		"nodes": [{ "id": "A" }, { "id": "B" }, { "id": "C" }, { "id": "D" }],
		"links": [{ "source": "A", "target": "B" }, { "source": "C", "target": "D" }]
	}));
	let state = init(data.clone(), json!({ "highlightDegree": 1 })).unwrap();
	let update = set_highlight(&state.nodes, &state.adjacency, &state.config, "B", true);
	let lit: HashSet<&str> = update
		.nodes
		.values()
		.filter(|n| n.highlighted)
		.map(|n| n.id.as_str())
		.collect();
	assert_eq!(lit, HashSet::from(["A", "B"]));
	assert_eq!(update.highlighted_node.as_deref(), Some("B"));
	assert!(state.nodes.values().all(|n| !n.highlighted));

	let state = init(data, json!({ "highlightDegree": 0 })).unwrap();
	let update = set_highlight(&state.nodes, &state.adjacency, &state.config, "B", true);
	let lit: Vec<&str> = update
		.nodes
		.values()
		.filter(|n| n.highlighted)
		.map(|n| n.id.as_str())
		.collect();
	assert_eq!(lit, vec!["B"]);
}

#[test]
fn collapse_then_expand_restores_links_and_weights() {
	let mut data = chain();
	data.links[0].value = Some(json!(4));
	let mut state = init(data, json!({ "collapsible": true })).unwrap();
	let links_before: Vec<bool> = state.d3_links.iter().map(|l| l.is_hidden).collect();
	let adjacency_before = state.adjacency.clone();

	assert_eq!(state.collapse("B"), 2);
	assert!(state.d3_links.iter().all(|l| l.is_hidden));
	assert_eq!(state.adjacency["A"]["B"], 0.0);
	assert!(!state.is_node_visible("A"));

	assert_eq!(state.expand("B"), 2);
	let links_after: Vec<bool> = state.d3_links.iter().map(|l| l.is_hidden).collect();
	assert_eq!(links_after, links_before);
	assert_eq!(state.adjacency, adjacency_before);
	assert!(state.is_node_visible("A"));
}

#[test]
fn diff_detects_property_and_topology_changes() {
	let state = init(chain(), Value::Null).unwrap();

	let unchanged = diff_elements(&chain(), &state);
	assert!(!unchanged.graph_elements_updated);
	assert!(!unchanged.new_graph_elements);

	let mut recolored = chain();
	recolored.nodes[0].style.color = Some("red".into());
	let diff = diff_elements(&recolored, &state);
	assert!(diff.graph_elements_updated);
	assert!(!diff.new_graph_elements);

	let mut grown = chain();
	grown.nodes.push(GraphNode::new("D"));
	let diff = diff_elements(&grown, &state);
	assert!(diff.graph_elements_updated);
	assert!(diff.new_graph_elements);
}

#[test]
fn three_node_chain_adjacency_and_degrees() {
	let state = init(chain(), json!({ "directed": false })).unwrap();
	let expected = json!({ "A": { "B": 1.0 }, "B": { "A": 1.0, "C": 1.0 }, "C": { "B": 1.0 } });
	assert_eq!(serde_json::to_value(&state.adjacency).unwrap(), expected);
	assert_eq!(compute_node_degree("A", &state.adjacency).out_degree, 1);
	assert_eq!(compute_node_degree("C", &state.adjacency).out_degree, 1);
	assert!(state.nodes.values().all(|n| !n.orphan));
}

#[test]
fn every_link_highlights_at_degree_two() {
	let mut state = init(chain(), json!({ "highlightDegree": 2 })).unwrap();
	state.highlight_node("B", true);
	let callbacks = LinkCallbacks::default();
	for link in &state.d3_links {
		let props = build_link_props(
			link,
			&state.nodes,
			&state.adjacency,
			&state.config,
			&callbacks,
			state.highlighted_node.as_deref(),
			state.highlighted_link.as_ref(),
			1.0,
		);
		assert!(props.highlighted, "{} -> {}", link.source(), link.target());
	}
}
