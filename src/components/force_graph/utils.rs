//! Structural helpers over `serde_json::Value` trees.
//!
//! Graph configuration and element records are plain nested data, so equality,
//! merging and cloning walk them recursively. Every traversal stops descending
//! at [`MAX_DEPTH`]. The cutoff is a safety valve against pathological nesting,
//! not a guarantee of correctness for arbitrarily deep data: past it, values
//! are compared by identity (containers) or by value (scalars), and merged or
//! cloned wholesale.

use serde_json::{Map, Value};

use super::error::{ErrorKind, GraphError};

/// Maximum recursion depth for the structural helpers.
pub const MAX_DEPTH: usize = 20;

fn is_container(value: &Value) -> bool {
	matches!(value, Value::Object(_) | Value::Array(_))
}

fn is_empty_container(value: &Value) -> bool {
	match value {
		Value::Object(map) => map.is_empty(),
		Value::Array(items) => items.is_empty(),
		_ => false,
	}
}

/// Structural equality for nested objects and arrays.
///
/// Arrays are compared as objects keyed by index. An empty container never
/// equals a non-empty one, and key sets must match exactly.
pub fn is_deep_equal(a: &Value, b: &Value) -> bool {
	if std::ptr::eq(a, b) {
		return true;
	}
	deep_equal_at(a, b, 0)
}

fn deep_equal_at(a: &Value, b: &Value, depth: usize) -> bool {
	if !is_container(a) || !is_container(b) {
		return a == b;
	}
	if is_empty_container(a) != is_empty_container(b) {
		return false;
	}
	if depth >= MAX_DEPTH {
		return std::ptr::eq(a, b) || (is_empty_container(a) && is_empty_container(b));
	}

	match (a, b) {
		(Value::Object(ma), Value::Object(mb)) => {
			ma.len() == mb.len()
				&& ma.iter().all(|(key, va)| {
					mb.get(key)
						.is_some_and(|vb| deep_equal_at(va, vb, depth + 1))
				})
		}
		(Value::Array(xa), Value::Array(xb)) => {
			xa.len() == xb.len()
				&& xa
					.iter()
					.zip(xb)
					.all(|(va, vb)| deep_equal_at(va, vb, depth + 1))
		}
		// An object never equals an array, even when both are keyed alike.
		_ => false,
	}
}

/// Deep-merges `overrides` over `base`.
///
/// Nested objects merge key by key. Scalars and arrays in `overrides` replace
/// the corresponding `base` value wholesale, whatever the array lengths. Keys
/// absent from `overrides` keep the `base` value; keys only present in
/// `overrides` are added.
pub fn merge(base: &Value, overrides: &Value) -> Value {
	merge_at(base, overrides, 0)
}

fn merge_at(base: &Value, overrides: &Value, depth: usize) -> Value {
	match (base, overrides) {
		(Value::Object(b), Value::Object(o)) if depth < MAX_DEPTH => {
			let mut merged = Map::with_capacity(b.len().max(o.len()));
			for (key, bv) in b {
				let value = match o.get(key) {
					Some(ov) => merge_at(bv, ov, depth + 1),
					None => bv.clone(),
				};
				merged.insert(key.clone(), value);
			}
			for (key, ov) in o {
				if !b.contains_key(key) {
					merged.insert(key.clone(), ov.clone());
				}
			}
			Value::Object(merged)
		}
		// Absent or null override keeps the base value.
		(_, Value::Null) => base.clone(),
		_ => overrides.clone(),
	}
}

/// Recursive structural copy, bounded by [`MAX_DEPTH`].
pub fn deep_clone(value: &Value) -> Value {
	clone_at(value, 0)
}

fn clone_at(value: &Value, depth: usize) -> Value {
	if depth >= MAX_DEPTH {
		return value.clone();
	}
	match value {
		Value::Object(map) => Value::Object(
			map.iter()
				.map(|(k, v)| (k.clone(), clone_at(v, depth + 1)))
				.collect(),
		),
		Value::Array(items) => Value::Array(items.iter().map(|v| clone_at(v, depth + 1)).collect()),
		other => other.clone(),
	}
}

/// Returns a new object holding only `keys` (those present in `object`).
pub fn pick(object: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
	keys.iter()
		.filter_map(|&k| object.get(k).map(|v| (k.to_string(), v.clone())))
		.collect()
}

/// Returns a new object holding every key of `object` except `keys`.
pub fn omit(object: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
	object
		.iter()
		.filter(|(k, _)| !keys.contains(&k.as_str()))
		.map(|(k, v)| (k.clone(), v.clone()))
		.collect()
}

/// Builds the engine's tagged error. `context` names the raising component.
pub fn fail(kind: ErrorKind, context: &'static str, message: impl Into<String>) -> GraphError {
	GraphError {
		kind,
		context,
		message: message.into(),
	}
}
