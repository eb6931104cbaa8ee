//! Coordinate normalization.
//!
//! Canvas coordinates are unbounded integers (often negative). The layout computed here is a
//! single translation that moves the bounding box of all nodes into non-negative space, plus the
//! resulting canvas extent. It is computed once per conversion and every node rectangle and edge
//! endpoint downstream goes through the same offset.

use crate::{Error, Result};
use indexmap::IndexMap;
use jcanvas_core::Node;
use jcanvas_core::geom::{Rect, rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct LayoutOptions {
    /// Extra space added on every side of the bounding box.
    pub margin: u32,
}

impl LayoutOptions {
    pub fn with_margin(margin: u32) -> Self {
        Self { margin }
    }
}

/// Axis-aligned bounds of all node rectangles, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl BoundingBox {
    pub fn of_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Option<Self> {
        let mut it = nodes.into_iter();
        let first = it.next()?;
        let mut b = Self {
            min_x: first.x,
            min_y: first.y,
            max_x: first.right(),
            max_y: first.bottom(),
        };
        for n in it {
            b.min_x = b.min_x.min(n.x);
            b.min_y = b.min_y.min(n.y);
            b.max_x = b.max_x.max(n.right());
            b.max_y = b.max_y.max(n.bottom());
        }
        Some(b)
    }

    /// `None` when the span does not fit in an `i64`.
    pub fn width(&self) -> Option<i64> {
        self.max_x.checked_sub(self.min_x)
    }

    pub fn height(&self) -> Option<i64> {
        self.max_y.checked_sub(self.min_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasLayout {
    /// Added to every document x coordinate.
    pub offset_x: i64,
    /// Added to every document y coordinate.
    pub offset_y: i64,
    pub canvas_width: i64,
    pub canvas_height: i64,
    pub margin: i64,
}

/// A node rectangle after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl LayoutRect {
    pub fn to_rect(self) -> Rect {
        rect(
            self.x as f64,
            self.y as f64,
            self.width as f64,
            self.height as f64,
        )
    }
}

/// Computes the translation and extent for `nodes`.
///
/// Fails when a node's far edge or the padded canvas extent does not fit in 64-bit coordinates.
pub fn compute_layout(nodes: &[Node], options: &LayoutOptions) -> Result<CanvasLayout> {
    let margin = i64::from(options.margin);
    for node in nodes {
        if node.x.checked_add(node.width).is_none() || node.y.checked_add(node.height).is_none() {
            return Err(Error::InvalidModel {
                message: format!(
                    "node `{}` extends past the representable coordinate range",
                    node.id
                ),
            });
        }
    }

    let Some(bounds) = BoundingBox::of_nodes(nodes) else {
        tracing::debug!(margin, "empty canvas; using degenerate layout");
        return Ok(CanvasLayout {
            offset_x: margin,
            offset_y: margin,
            canvas_width: 2 * margin,
            canvas_height: 2 * margin,
            margin,
        });
    };

    let axis = |min: i64, span: Option<i64>| -> Option<(i64, i64)> {
        let offset = margin.checked_sub(min)?;
        let extent = span?.checked_add(2 * margin)?;
        Some((offset, extent))
    };
    let (offset_x, canvas_width) = axis(bounds.min_x, bounds.width())
        .ok_or_else(|| extent_overflow(nodes, "x", |n| (n.x, n.right()), margin))?;
    let (offset_y, canvas_height) = axis(bounds.min_y, bounds.height())
        .ok_or_else(|| extent_overflow(nodes, "y", |n| (n.y, n.bottom()), margin))?;

    let layout = CanvasLayout {
        offset_x,
        offset_y,
        canvas_width,
        canvas_height,
        margin,
    };
    tracing::debug!(
        offset_x = layout.offset_x,
        offset_y = layout.offset_y,
        width = layout.canvas_width,
        height = layout.canvas_height,
        "canvas layout computed"
    );
    Ok(layout)
}

fn extent_overflow(
    nodes: &[Node],
    axis: &str,
    span: impl Fn(&Node) -> (i64, i64),
    margin: i64,
) -> Error {
    let near = nodes.iter().min_by_key(|n| span(n).0).map_or("", |n| n.id.as_str());
    let far = nodes.iter().max_by_key(|n| span(n).1).map_or("", |n| n.id.as_str());
    Error::InvalidModel {
        message: format!(
            "nodes `{near}` and `{far}` are too far apart on the {axis} axis \
             for 64-bit coordinates (margin {margin})"
        ),
    }
}

impl CanvasLayout {
    pub fn normalize(&self, node: &Node) -> LayoutRect {
        LayoutRect {
            x: node.x.saturating_add(self.offset_x),
            y: node.y.saturating_add(self.offset_y),
            width: node.width,
            height: node.height,
        }
    }

    /// Normalized rectangles keyed by node id, in document order.
    pub fn node_rects(&self, nodes: &[Node]) -> IndexMap<String, Rect> {
        nodes
            .iter()
            .map(|n| (n.id.clone(), self.normalize(n).to_rect()))
            .collect()
    }
}
