//! Canvas painter for the graph.
//!
//! Draws the prop records produced by the builder. Nothing here decides what
//! a node or link looks like; it only turns props into canvas calls.
//! Two passes for z-ordering: links first, then nodes with their labels.
//! Both run in world space under the view transform.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use js_sys::Array;
use log::warn;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement, Path2d};

use super::builder::{LinkProps, NodeProps};
use super::config::GraphConfig;
use super::controller::GraphController;
use super::types::{LabelPosition, NodeSize, Point, SymbolType};

/// Loaded node images, keyed by URL.
#[derive(Debug, Default)]
pub struct ImageCache {
	images: HashMap<String, HtmlImageElement>,
	pending: bool,
}

impl ImageCache {
	/// The image for `url` once it has finished loading. Starts the load on
	/// first request.
	fn get(&mut self, url: &str) -> Option<&HtmlImageElement> {
		if !self.images.contains_key(url) {
			match HtmlImageElement::new() {
				Ok(image) => {
					image.set_src(url);
					self.images.insert(url.to_string(), image);
				}
				Err(e) => {
					warn!("render: cannot create image for {url}: {e:?}");
					return None;
				}
			}
		}
		let image = self.images.get(url).filter(|image| image.complete());
		self.pending |= image.is_none();
		image
	}

	/// Whether the last paint skipped an image that was still loading.
	pub fn has_pending(&self) -> bool {
		self.pending
	}
}

/// Paints the whole graph.
pub fn render(controller: &GraphController, ctx: &CanvasRenderingContext2d, images: &mut ImageCache) {
	let config = controller.config();
	let view = controller.view();
	images.pending = false;

	ctx.clear_rect(0.0, 0.0, config.width, config.height);
	ctx.save();
	let _ = ctx.translate(view.x, view.y);
	let _ = ctx.scale(view.k, view.k);

	for link in controller.link_props() {
		draw_link(ctx, &link, controller, config, view.k);
	}
	for node in controller.node_props() {
		draw_node(ctx, &node, images);
	}

	ctx.restore();
	ctx.set_global_alpha(1.0);
}

fn draw_link(
	ctx: &CanvasRenderingContext2d,
	props: &LinkProps<'_>,
	controller: &GraphController,
	config: &GraphConfig,
	k: f64,
) {
	let Ok(path) = Path2d::new_with_path_string(&props.d) else {
		return;
	};

	ctx.set_global_alpha(props.opacity);
	ctx.set_stroke_style_str(props.stroke);
	ctx.set_line_width(props.stroke_width);
	ctx.set_line_cap(props.stroke_linecap);
	if props.stroke_dasharray > 0.0 {
		let dash = JsValue::from_f64(props.stroke_dasharray / k);
		let _ = ctx.set_line_dash(&Array::of2(&dash, &dash));
		ctx.set_line_dash_offset(props.stroke_dashoffset / k);
	} else {
		let _ = ctx.set_line_dash(&Array::new());
	}
	ctx.stroke_with_path(&path);
	let _ = ctx.set_line_dash(&Array::new());

	let nodes = &controller.state().nodes;
	let position = |id: &str| {
		nodes
			.get(id)
			.map(|n| Point {
				x: n.motion.x,
				y: n.motion.y,
			})
			.unwrap_or_default()
	};
	let source = position(props.source);
	let target = position(props.target);
	let from = props
		.link
		.link
		.style
		.break_points
		.last()
		.copied()
		.unwrap_or(source);

	if let Some(marker) = props.marker_id {
		let length = config.link.marker_width / k;
		let half_width = config.link.marker_height / 2.0 / k;
		if let Some(points) = arrowhead(from, target, marker.offset() / k, length, half_width) {
			ctx.set_fill_style_str(props.stroke);
			ctx.begin_path();
			ctx.move_to(points[0].x, points[0].y);
			ctx.line_to(points[1].x, points[1].y);
			ctx.line_to(points[2].x, points[2].y);
			ctx.close_path();
			ctx.fill();
		}
	}

	if let (Some(label), Some(size)) = (&props.label, props.font_size) {
		ctx.set_font(&format!(
			"{} {size}px sans-serif",
			props.font_weight.unwrap_or("normal")
		));
		ctx.set_fill_style_str(props.font_color.unwrap_or("black"));
		ctx.set_text_align("center");
		ctx.set_text_baseline("bottom");
		let _ = ctx.fill_text(label, (source.x + target.x) / 2.0, (source.y + target.y) / 2.0);
	}
}

/// Tip and both back corners of an arrow pointing from `from` to `to`, with
/// the tip pulled back by `offset`. `None` for zero-length links.
fn arrowhead(from: Point, to: Point, offset: f64, length: f64, half_width: f64) -> Option<[Point; 3]> {
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 1e-6 {
		return None;
	}
	let (ux, uy) = (dx / dist, dy / dist);
	let tip = Point {
		x: to.x - ux * offset,
		y: to.y - uy * offset,
	};
	let back = Point {
		x: tip.x - ux * length,
		y: tip.y - uy * length,
	};
	let (px, py) = (-uy * half_width, ux * half_width);
	Some([
		tip,
		Point {
			x: back.x + px,
			y: back.y + py,
		},
		Point {
			x: back.x - px,
			y: back.y - py,
		},
	])
}

const SQRT3: f64 = 1.732_050_807_568_877_2;

/// Outline of a symbol of the given area centered on the origin. Circles
/// have no outline and return an empty list.
fn symbol_outline(symbol: SymbolType, area: f64) -> Vec<Point> {
	let p = |x: f64, y: f64| Point { x, y };
	match symbol {
		SymbolType::Circle => Vec::new(),
		SymbolType::Square => {
			let h = area.sqrt() / 2.0;
			vec![p(-h, -h), p(h, -h), p(h, h), p(-h, h)]
		}
		SymbolType::Diamond => {
			let tan30 = (1.0f64 / 3.0).sqrt();
			let y = (area / (tan30 * 2.0)).sqrt();
			let x = y * tan30;
			vec![p(0.0, -y), p(x, 0.0), p(0.0, y), p(-x, 0.0)]
		}
		SymbolType::Triangle => {
			let y = -(area / (SQRT3 * 3.0)).sqrt();
			vec![p(0.0, y * 2.0), p(-SQRT3 * y, -y), p(SQRT3 * y, -y)]
		}
		SymbolType::Cross => {
			let r = (area / 5.0).sqrt() / 2.0;
			let t = 3.0 * r;
			vec![
				p(-t, -r),
				p(-r, -r),
				p(-r, -t),
				p(r, -t),
				p(r, -r),
				p(t, -r),
				p(t, r),
				p(r, r),
				p(r, t),
				p(-r, t),
				p(-r, r),
				p(-t, r),
			]
		}
		SymbolType::Star => {
			let ka = 0.890_813_091_529_285_2;
			let kr = (PI / 10.0).sin() / (7.0 * PI / 10.0).sin();
			let (kx, ky) = ((TAU / 10.0).sin() * kr, -(TAU / 10.0).cos() * kr);
			let r = (area * ka).sqrt();
			let (x, y) = (kx * r, ky * r);
			let mut points = vec![p(0.0, -r), p(x, y)];
			for i in 1..5 {
				let a = TAU * i as f64 / 5.0;
				let (s, c) = a.sin_cos();
				points.push(p(s * r, -c * r));
				points.push(p(c * x - s * y, s * x + c * y));
			}
			points
		}
		SymbolType::Wye => {
			let k = 1.0 / 12f64.sqrt();
			let a = (k / 2.0 + 1.0) * 3.0;
			let r = (area / a).sqrt();
			let (x0, y0) = (r / 2.0, r * k);
			let (x1, y1) = (x0, r * k + r);
			let (x2, y2) = (-x1, y1);
			let (c, s) = (-0.5, SQRT3 / 2.0);
			vec![
				p(x0, y0),
				p(x1, y1),
				p(x2, y2),
				p(c * x0 - s * y0, s * x0 + c * y0),
				p(c * x1 - s * y1, s * x1 + c * y1),
				p(c * x2 - s * y2, s * x2 + c * y2),
				p(c * x0 + s * y0, c * y0 - s * x0),
				p(c * x1 + s * y1, c * y1 - s * x1),
				p(c * x2 + s * y2, c * y2 - s * x2),
			]
		}
	}
}

/// Width and height of the box a node occupies.
fn node_extent(size: NodeSize) -> (f64, f64) {
	match size {
		NodeSize::Area(area) => {
			let side = area.sqrt();
			(side, side)
		}
		NodeSize::Box { width, height } => (width, height),
	}
}

fn trace_node_shape(ctx: &CanvasRenderingContext2d, props: &NodeProps<'_>) {
	let (cx, cy) = (props.cx, props.cy);
	ctx.begin_path();
	match props.size {
		NodeSize::Box { width, height } => ctx.rect(cx - width / 2.0, cy - height / 2.0, width, height),
		NodeSize::Area(area) => match props.symbol_type {
			SymbolType::Circle => {
				let _ = ctx.arc(cx, cy, (area / PI).sqrt(), 0.0, TAU);
			}
			symbol => {
				let outline = symbol_outline(symbol, area);
				if let Some((first, rest)) = outline.split_first() {
					ctx.move_to(cx + first.x, cy + first.y);
					for point in rest {
						ctx.line_to(cx + point.x, cy + point.y);
					}
				}
				ctx.close_path();
			}
		},
	}
}

fn draw_node(ctx: &CanvasRenderingContext2d, props: &NodeProps<'_>, images: &mut ImageCache) {
	ctx.set_global_alpha(props.opacity);

	let image = if props.svg.is_empty() {
		None
	} else {
		images.get(props.svg)
	};
	if let Some(image) = image {
		let (w, h) = node_extent(props.size);
		let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
			image,
			props.cx - w / 2.0,
			props.cy - h / 2.0,
			w,
			h,
		);
	} else {
		trace_node_shape(ctx, props);
		ctx.set_fill_style_str(props.fill);
		ctx.fill();
		if props.stroke != "none" && props.stroke_width > 0.0 {
			ctx.set_stroke_style_str(props.stroke);
			ctx.set_line_width(props.stroke_width);
			ctx.stroke();
		}
	}

	if props.render_label && !props.label.is_empty() {
		draw_node_label(ctx, props);
	}
}

fn draw_node_label(ctx: &CanvasRenderingContext2d, props: &NodeProps<'_>) {
	ctx.set_font(&format!("{} {}px sans-serif", props.font_weight, props.font_size));
	ctx.set_fill_style_str(props.font_color);
	let (x, y, align, baseline) = match props.label_position {
		Some(LabelPosition::Left) => (props.cx - props.dx, props.cy, "right", "middle"),
		Some(LabelPosition::Top) => (props.cx, props.cy - props.dx, "center", "bottom"),
		Some(LabelPosition::Bottom) => (props.cx, props.cy + props.dx, "center", "top"),
		Some(LabelPosition::Center) => (props.cx, props.cy, "center", "middle"),
		Some(LabelPosition::Right) | None => (props.cx + props.dx, props.cy, "left", "middle"),
	};
	ctx.set_text_align(align);
	ctx.set_text_baseline(baseline);
	let _ = ctx.fill_text(&props.label, x, y);
}
