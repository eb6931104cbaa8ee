//! Edge connection geometry.
//!
//! Every edge is drawn as one quadratic curve between two anchor points on the boundaries of its
//! (already normalized) node rectangles. All functions here are pure and total: identical input
//! produces bit-identical output, including for zero-length edges.

use crate::util::fmt_num_into;
use jcanvas_core::geom::{Point, Rect, Vector, point};
use jcanvas_core::{EndKind, Side};
use serde::{Deserialize, Serialize};

/// Below this chord length the start→end direction is undefined.
const DEGENERATE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct EdgeOptions {
    /// Control point displacement as a fraction of the start→end distance.
    pub curvature: f64,
    /// Control point distance from the start point when start and end coincide.
    pub degenerate_offset: f64,
}

impl Default for EdgeOptions {
    fn default() -> Self {
        Self {
            curvature: 0.2,
            degenerate_offset: 40.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for LayoutPoint {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeGeometry {
    /// Resolved sides; inferred when the document left them unspecified.
    pub from_side: Side,
    pub to_side: Side,
    pub start: LayoutPoint,
    pub end: LayoutPoint,
    pub control: LayoutPoint,
    /// Point on the curve at t = 0.5.
    pub label_point: LayoutPoint,
    /// Straight-line distance between start and end.
    pub length: f64,
    /// Distance of the control point from the chord midpoint.
    pub bend: f64,
    pub arrow_at_start: bool,
    pub arrow_at_end: bool,
    /// SVG path data: `M sx,sy Q cx,cy ex,ey`.
    pub path: String,
}

impl EdgeGeometry {
    pub fn with_ends(mut self, from_end: EndKind, to_end: EndKind) -> Self {
        self.arrow_at_start = from_end.is_arrow();
        self.arrow_at_end = to_end.is_arrow();
        self
    }

    pub fn is_degenerate(&self) -> bool {
        self.length < DEGENERATE_EPSILON
    }
}

pub fn anchor_point(rect: &Rect, side: Side) -> Point {
    let x = rect.origin.x;
    let y = rect.origin.y;
    let w = rect.size.width;
    let h = rect.size.height;
    match side {
        Side::Top => point(x + w / 2.0, y),
        Side::Right => point(x + w, y + h / 2.0),
        Side::Bottom => point(x + w / 2.0, y + h),
        Side::Left => point(x, y + h / 2.0),
    }
}

/// Picks the side of `rect` whose anchor is closest to the center of `other`.
///
/// Ties resolve in `Side::ALL` order (top, right, bottom, left).
pub fn infer_side(rect: &Rect, other: &Rect) -> Side {
    let target = other.center();
    let mut best = Side::Top;
    let mut best_dist = f64::INFINITY;
    for side in Side::ALL {
        let d = (anchor_point(rect, side) - target).square_length();
        if d < best_dist {
            best = side;
            best_dist = d;
        }
    }
    best
}

/// Computes the geometry of an edge between two normalized rectangles.
///
/// Arrow flags default to the document defaults (no arrow at the start, an arrow at the end);
/// use [`EdgeGeometry::with_ends`] to apply explicit ones.
pub fn compute_edge(
    from: &Rect,
    to: &Rect,
    from_side: Option<Side>,
    to_side: Option<Side>,
    options: &EdgeOptions,
) -> EdgeGeometry {
    let from_side = from_side.unwrap_or_else(|| infer_side(from, to));
    let to_side = to_side.unwrap_or_else(|| infer_side(to, from));

    let start = anchor_point(from, from_side);
    let end = anchor_point(to, to_side);
    let chord = end - start;
    let length = chord.length();
    let outward = from_side.outward();

    let (control, bend) = if length < DEGENERATE_EPSILON {
        (start + outward * options.degenerate_offset, options.degenerate_offset)
    } else {
        let mid = start.lerp(end, 0.5);
        let mut normal: Vector = Vector::new(-chord.y, chord.x) / length;
        if normal.dot(outward) < 0.0 {
            normal = -normal;
        }
        let bend = options.curvature * length;
        (mid + normal * bend, bend)
    };

    let label_point = quadratic_point(start, control, end, 0.5);

    let mut path = String::with_capacity(48);
    path.push('M');
    push_pair(&mut path, start);
    path.push_str(" Q");
    push_pair(&mut path, control);
    path.push(' ');
    push_pair(&mut path, end);

    EdgeGeometry {
        from_side,
        to_side,
        start: start.into(),
        end: end.into(),
        control: control.into(),
        label_point: label_point.into(),
        length,
        bend,
        arrow_at_start: EndKind::from_default().is_arrow(),
        arrow_at_end: EndKind::to_default().is_arrow(),
        path,
    }
}

fn quadratic_point(p0: Point, p1: Point, p2: Point, t: f64) -> Point {
    let u = 1.0 - t;
    point(
        u * u * p0.x + 2.0 * u * t * p1.x + t * t * p2.x,
        u * u * p0.y + 2.0 * u * t * p1.y + t * t * p2.y,
    )
}

fn push_pair(out: &mut String, p: Point) {
    fmt_num_into(out, p.x);
    out.push(',');
    fmt_num_into(out, p.y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use jcanvas_core::geom::rect;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn anchor_points_are_exact() {
        let r = rect(0.0, 0.0, 100.0, 50.0);
        assert_eq!(anchor_point(&r, Side::Top), point(50.0, 0.0));
        assert_eq!(anchor_point(&r, Side::Right), point(100.0, 25.0));
        assert_eq!(anchor_point(&r, Side::Bottom), point(50.0, 50.0));
        assert_eq!(anchor_point(&r, Side::Left), point(0.0, 25.0));
    }

    #[test]
    fn inferred_side_faces_the_other_rectangle() {
        let a = rect(0.0, 0.0, 100.0, 100.0);
        assert_eq!(infer_side(&a, &rect(500.0, 0.0, 100.0, 100.0)), Side::Right);
        assert_eq!(infer_side(&a, &rect(-500.0, 0.0, 100.0, 100.0)), Side::Left);
        assert_eq!(infer_side(&a, &rect(0.0, 500.0, 100.0, 100.0)), Side::Bottom);
        assert_eq!(infer_side(&a, &rect(0.0, -500.0, 100.0, 100.0)), Side::Top);
    }

    #[test]
    fn inferred_side_ties_follow_priority_order() {
        let a = rect(0.0, 0.0, 100.0, 100.0);
        // Exactly diagonal: top/right tie, bottom/right tie, and so on.
        assert_eq!(infer_side(&a, &rect(200.0, -200.0, 100.0, 100.0)), Side::Top);
        assert_eq!(infer_side(&a, &rect(200.0, 200.0, 100.0, 100.0)), Side::Right);
        assert_eq!(infer_side(&a, &rect(-200.0, 200.0, 100.0, 100.0)), Side::Bottom);
        // Same center: all four anchors are equidistant.
        assert_eq!(infer_side(&a, &a), Side::Top);
    }

    #[test]
    fn horizontal_edge_bends_only_along_y() {
        let from = rect(0.0, 28.0, 400.0, 225.0);
        let to = rect(590.0, 28.0, 400.0, 225.0);
        let g = compute_edge(
            &from,
            &to,
            Some(Side::Right),
            Some(Side::Left),
            &EdgeOptions::default(),
        );
        assert_eq!(g.start, LayoutPoint { x: 400.0, y: 140.5 });
        assert_eq!(g.end, LayoutPoint { x: 590.0, y: 140.5 });
        assert!(approx_eq(g.control.x, 495.0));
        assert!(approx_eq(g.control.y, 140.5 + 0.2 * 190.0));
        assert!(approx_eq(g.length, 190.0));
        assert_eq!(g.path, "M400,140.5 Q495,178.5 590,140.5");
        assert!(!g.arrow_at_start);
        assert!(g.arrow_at_end);
    }

    #[test]
    fn control_point_bends_toward_the_from_side() {
        // Start on the bottom of `from` and end up and to the left: the left normal of the chord
        // points up and has to be flipped to face downward.
        let from = rect(0.0, 0.0, 100.0, 100.0);
        let to = rect(-400.0, -300.0, 100.0, 100.0);
        let g = compute_edge(
            &from,
            &to,
            Some(Side::Bottom),
            Some(Side::Right),
            &EdgeOptions::default(),
        );
        let mid_y = (g.start.y + g.end.y) / 2.0;
        assert!(g.control.y > mid_y, "{g:?}");
    }

    #[test]
    fn unspecified_sides_are_inferred_deterministically() {
        let from = rect(0.0, 0.0, 100.0, 100.0);
        let to = rect(400.0, 20.0, 100.0, 100.0);
        let first = compute_edge(&from, &to, None, None, &EdgeOptions::default());
        let second = compute_edge(&from, &to, None, None, &EdgeOptions::default());
        assert_eq!(first, second);
        assert_eq!(first.from_side, Side::Right);
        assert_eq!(first.to_side, Side::Left);
    }

    #[test]
    fn zero_length_edges_use_a_fixed_offset() {
        let r = rect(10.0, 10.0, 100.0, 50.0);
        let g = compute_edge(
            &r,
            &r,
            Some(Side::Top),
            Some(Side::Top),
            &EdgeOptions::default(),
        );
        assert!(g.is_degenerate());
        assert_eq!(g.start, g.end);
        assert_eq!(g.control, LayoutPoint { x: 60.0, y: -30.0 });
        assert!(g.control.x.is_finite() && g.control.y.is_finite());
        assert!(g.label_point.x.is_finite() && g.label_point.y.is_finite());
    }

    #[test]
    fn explicit_ends_override_defaults() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(100.0, 0.0, 10.0, 10.0);
        let g = compute_edge(&a, &b, None, None, &EdgeOptions::default())
            .with_ends(EndKind::Arrow, EndKind::None);
        assert!(g.arrow_at_start);
        assert!(!g.arrow_at_end);
    }

    #[test]
    fn label_point_lies_between_midpoint_and_control() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(100.0, 0.0, 10.0, 10.0);
        let g = compute_edge(
            &a,
            &b,
            Some(Side::Right),
            Some(Side::Left),
            &EdgeOptions::default(),
        );
        let mid_y = (g.start.y + g.end.y) / 2.0;
        assert!(approx_eq(g.label_point.y, mid_y + g.bend / 2.0));
    }
}
