//! Link path definitions.
//!
//! Links are described as SVG path strings: a move to the source, then one
//! elliptical arc segment per break point and one to the target. The arc
//! radius picks the shape. A zero radius draws a straight segment.

use super::config::LinkType;
use super::types::Point;

fn arc_radius(link_type: LinkType, from: Point, to: Point) -> f64 {
	match link_type {
		LinkType::Straight => 0.0,
		LinkType::CurveSmooth => {
			let (dx, dy) = (to.x - from.x, to.y - from.y);
			(dx * dx + dy * dy).sqrt()
		}
		LinkType::CurveFull => 1.0,
	}
}

/// Builds the path from `source` through `break_points` to `target`.
pub fn build_link_path_definition(
	source: Point,
	target: Point,
	link_type: LinkType,
	break_points: &[Point],
) -> String {
	let mut path = format!("M{},{}", source.x, source.y);
	let mut previous = source;
	for &point in break_points.iter().chain(std::iter::once(&target)) {
		let radius = arc_radius(link_type, previous, point);
		path.push_str(&format!(" A{radius},{radius} 0 0,1 {},{}", point.x, point.y));
		previous = point;
	}
	path
}

#[cfg(test)]
mod tests {
	use super::*;

	fn p(x: f64, y: f64) -> Point {
		Point { x, y }
	}

	#[test]
	fn straight_path_has_zero_radius() {
		assert_eq!(
			build_link_path_definition(p(0.0, 0.0), p(3.0, 4.0), LinkType::Straight, &[]),
			"M0,0 A0,0 0 0,1 3,4"
		);
	}

	#[test]
	fn smooth_curve_uses_segment_length() {
		assert_eq!(
			build_link_path_definition(p(0.0, 0.0), p(3.0, 4.0), LinkType::CurveSmooth, &[]),
			"M0,0 A5,5 0 0,1 3,4"
		);
	}

	#[test]
	fn break_points_add_segments() {
		assert_eq!(
			build_link_path_definition(
				p(0.0, 0.0),
				p(10.0, 0.0),
				LinkType::CurveFull,
				&[p(5.0, 5.0)]
			),
			"M0,0 A1,1 0 0,1 5,5 A1,1 0 0,1 10,0"
		);
	}
}
