//! Renderer-agnostic output of a conversion run.
//!
//! The manifest lists nodes in document order (which is also z-order: first is bottom) and edges
//! in document order. Assets are embedded as base64 so a renderer never has to touch the
//! filesystem.

use crate::assets::{AssetMap, ResolveStrategy, ResolvedAsset};
use crate::edge::{EdgeGeometry, EdgeOptions, compute_edge};
use crate::layout::{CanvasLayout, LayoutRect};
use crate::{Error, Result};
use base64::Engine as _;
use indexmap::IndexMap;
use jcanvas_core::geom::Rect;
use jcanvas_core::{BackgroundStyle, Canvas, ColorPalette, NodeKind};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub layout: CanvasLayout,
    pub nodes: Vec<NodeDescriptor>,
    pub edges: Vec<EdgeDescriptor>,
}

impl Manifest {
    pub fn width(&self) -> i64 {
        self.layout.canvas_width
    }

    pub fn height(&self) -> i64 {
        self.layout.canvas_height
    }

    pub fn node(&self, id: &str) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeDescriptor> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: String,
    pub rect: LayoutRect,
    /// Resolved CSS color; `None` inherits the renderer default.
    pub color: Option<String>,
    pub content: NodeContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeContent {
    Text {
        text: String,
    },
    File {
        file: String,
        subpath: Option<String>,
        asset: EmbeddedAsset,
    },
    Link {
        url: String,
    },
    Group {
        label: Option<String>,
        background: Option<EmbeddedAsset>,
        background_style: Option<BackgroundStyle>,
    },
}

/// An asset ready for inline transport, or the placeholder for one that was not found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EmbeddedAsset {
    Embedded {
        mime_type: String,
        /// Standard base64 (padded).
        data: String,
        source: PathBuf,
        strategy: ResolveStrategy,
    },
    Missing {
        path: String,
        tried: Vec<PathBuf>,
    },
}

impl EmbeddedAsset {
    pub fn encode(asset: &ResolvedAsset) -> Self {
        match &asset.hit {
            Some(hit) => EmbeddedAsset::Embedded {
                mime_type: hit.mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(&hit.bytes),
                source: hit.path.clone(),
                strategy: hit.strategy,
            },
            None => EmbeddedAsset::Missing {
                path: asset.requested.clone(),
                tried: asset.tried.clone(),
            },
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, EmbeddedAsset::Missing { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, EmbeddedAsset::Embedded { mime_type, .. } if mime_type.starts_with("image/"))
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            EmbeddedAsset::Embedded { mime_type, .. } => Some(mime_type),
            EmbeddedAsset::Missing { .. } => None,
        }
    }

    /// `data:<mime>;base64,<payload>`, for embedded assets.
    pub fn data_url(&self) -> Option<String> {
        match self {
            EmbeddedAsset::Embedded {
                mime_type, data, ..
            } => Some(format!("data:{mime_type};base64,{data}")),
            EmbeddedAsset::Missing { .. } => None,
        }
    }

    /// Decodes the payload back into the original bytes.
    pub fn decode(&self) -> Option<std::result::Result<Vec<u8>, base64::DecodeError>> {
        match self {
            EmbeddedAsset::Embedded { data, .. } => {
                Some(base64::engine::general_purpose::STANDARD.decode(data))
            }
            EmbeddedAsset::Missing { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDescriptor {
    pub id: String,
    pub from_node: String,
    pub to_node: String,
    pub geometry: EdgeGeometry,
    pub color: Option<String>,
    pub label: Option<String>,
}

/// Edge geometries keyed by edge id.
pub type EdgeGeometryMap = FxHashMap<String, EdgeGeometry>;

/// Computes the geometry of every edge from normalized node rectangles.
pub fn compute_edge_geometries(
    canvas: &Canvas,
    rects: &IndexMap<String, Rect>,
    options: &EdgeOptions,
) -> Result<EdgeGeometryMap> {
    let mut out = EdgeGeometryMap::default();
    out.reserve(canvas.edges.len());
    for edge in &canvas.edges {
        let from = node_rect(rects, &edge.from_node, &edge.id)?;
        let to = node_rect(rects, &edge.to_node, &edge.id)?;
        let geometry = compute_edge(from, to, edge.from_side, edge.to_side, options)
            .with_ends(edge.from_end, edge.to_end);
        if geometry.is_degenerate() {
            tracing::debug!(edge = %edge.id, "zero-length edge; using fallback control point");
        }
        out.insert(edge.id.clone(), geometry);
    }
    Ok(out)
}

fn node_rect<'a>(
    rects: &'a IndexMap<String, Rect>,
    node_id: &str,
    edge_id: &str,
) -> Result<&'a Rect> {
    rects.get(node_id).ok_or_else(|| Error::InvalidModel {
        message: format!("edge `{edge_id}` references node `{node_id}` without a layout rectangle"),
    })
}

fn embedded_for(assets: &AssetMap, node_id: &str) -> Result<EmbeddedAsset> {
    let asset = assets.get(node_id).ok_or_else(|| Error::InvalidModel {
        message: format!("no resolved asset for node `{node_id}`"),
    })?;
    Ok(EmbeddedAsset::encode(asset))
}

/// Assembles the manifest. Pure composition: no I/O, no rendering decisions.
pub fn build_manifest(
    canvas: &Canvas,
    layout: &CanvasLayout,
    assets: &AssetMap,
    geometries: &EdgeGeometryMap,
    palette: &ColorPalette,
) -> Result<Manifest> {
    let mut nodes = Vec::with_capacity(canvas.nodes.len());
    for node in &canvas.nodes {
        let content = match &node.kind {
            NodeKind::Text { text } => NodeContent::Text { text: text.clone() },
            NodeKind::File { file, subpath } => NodeContent::File {
                file: file.clone(),
                subpath: subpath.clone(),
                asset: embedded_for(assets, &node.id)?,
            },
            NodeKind::Link { url } => NodeContent::Link { url: url.clone() },
            NodeKind::Group {
                label,
                background,
                background_style,
            } => NodeContent::Group {
                label: label.clone(),
                background: match background {
                    Some(_) => Some(embedded_for(assets, &node.id)?),
                    None => None,
                },
                background_style: *background_style,
            },
        };
        nodes.push(NodeDescriptor {
            id: node.id.clone(),
            rect: layout.normalize(node),
            color: palette.resolve(node.color.as_deref()).map(|c| c.into_owned()),
            content,
        });
    }

    let mut edges = Vec::with_capacity(canvas.edges.len());
    for edge in &canvas.edges {
        let geometry = geometries.get(&edge.id).ok_or_else(|| Error::InvalidModel {
            message: format!("no geometry computed for edge `{}`", edge.id),
        })?;
        edges.push(EdgeDescriptor {
            id: edge.id.clone(),
            from_node: edge.from_node.clone(),
            to_node: edge.to_node.clone(),
            geometry: geometry.clone(),
            color: palette.resolve(edge.color.as_deref()).map(|c| c.into_owned()),
            label: edge.label.clone(),
        });
    }

    Ok(Manifest {
        layout: *layout,
        nodes,
        edges,
    })
}
