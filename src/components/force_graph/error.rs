//! Error taxonomy for graph state initialization.

use thiserror::Error;

/// Category of a [`GraphError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ErrorKind {
	/// No nodes were supplied.
	#[error("insufficient data")]
	InsufficientData,
	/// A link references a node id that is not part of the node collection.
	#[error("invalid link")]
	InvalidLink,
	/// A link declares a `value` that is not numeric.
	#[error("invalid link value")]
	InvalidLinkValue,
	/// The merged configuration could not be read as a graph configuration.
	#[error("invalid configuration")]
	InvalidConfig,
}

/// A tagged, human-readable failure raised by the graph engine.
///
/// `context` names the component that raised the error (e.g. `"Graph"`),
/// `message` carries the offending ids or values.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("force-graph :: {context} :: {kind}: {message}")]
pub struct GraphError {
	pub kind: ErrorKind,
	pub context: &'static str,
	pub message: String,
}

impl GraphError {
	pub fn kind(&self) -> ErrorKind {
		self.kind
	}
}
