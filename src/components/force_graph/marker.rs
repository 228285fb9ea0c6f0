//! Arrowhead markers for directed links.
//!
//! Three sizes, each with a highlighted variant. The size steps up with the
//! zoom level relative to `max_zoom`, so arrows stay legible when zoomed out.

use super::config::GraphConfig;

/// Identifies one of the predefined arrowhead markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerId {
	Small,
	SmallHighlighted,
	Medium,
	MediumHighlighted,
	Large,
	LargeHighlighted,
}

impl MarkerId {
	pub const ALL: [MarkerId; 6] = [
		MarkerId::Small,
		MarkerId::SmallHighlighted,
		MarkerId::Medium,
		MarkerId::MediumHighlighted,
		MarkerId::Large,
		MarkerId::LargeHighlighted,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			MarkerId::Small => "marker-small",
			MarkerId::SmallHighlighted => "marker-small-highlighted",
			MarkerId::Medium => "marker-medium",
			MarkerId::MediumHighlighted => "marker-medium-highlighted",
			MarkerId::Large => "marker-large",
			MarkerId::LargeHighlighted => "marker-large-highlighted",
		}
	}

	pub fn is_highlighted(self) -> bool {
		matches!(
			self,
			MarkerId::SmallHighlighted | MarkerId::MediumHighlighted | MarkerId::LargeHighlighted
		)
	}

	/// Distance the arrow tip is pulled back from the target center.
	pub fn offset(self) -> f64 {
		match self {
			MarkerId::Small | MarkerId::SmallHighlighted => 13.0,
			MarkerId::Medium | MarkerId::MediumHighlighted => 16.0,
			MarkerId::Large | MarkerId::LargeHighlighted => 18.0,
		}
	}
}

/// Picks the marker for a link at zoom `k`.
///
/// Below `max_zoom / 4` markers are small, below `max_zoom / 2` medium,
/// large otherwise.
pub fn marker_id(highlighted: bool, k: f64, config: &GraphConfig) -> MarkerId {
	let medium_from = config.max_zoom / 4.0;
	let large_from = config.max_zoom / 2.0;
	match (k < medium_from, k < large_from, highlighted) {
		(true, _, false) => MarkerId::Small,
		(true, _, true) => MarkerId::SmallHighlighted,
		(false, true, false) => MarkerId::Medium,
		(false, true, true) => MarkerId::MediumHighlighted,
		(false, false, false) => MarkerId::Large,
		(false, false, true) => MarkerId::LargeHighlighted,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn marker_size_follows_zoom() {
		let config = GraphConfig::default();
		assert_eq!(marker_id(false, 1.0, &config), MarkerId::Small);
		assert_eq!(marker_id(false, 2.0, &config), MarkerId::Medium);
		assert_eq!(marker_id(true, 3.9, &config), MarkerId::MediumHighlighted);
		assert_eq!(marker_id(true, 4.0, &config), MarkerId::LargeHighlighted);
		assert_eq!(MarkerId::LargeHighlighted.as_str(), "marker-large-highlighted");
	}
}
