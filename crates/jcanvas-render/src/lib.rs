#![forbid(unsafe_code)]

//! Headless JSON Canvas conversion.
//!
//! `convert` runs the whole pipeline: parse + validate, normalize coordinates, resolve and embed
//! file assets, compute edge geometry, and assemble a [`Manifest`]. The manifest is renderer
//! agnostic; [`html::render_html`] turns it into one self-contained HTML document.

pub mod assets;
pub mod edge;
pub mod html;
pub mod layout;
pub mod manifest;

mod util;

pub use assets::{
    AssetMap, AssetResolver, AssetRole, AssetWarning, ResolveOptions, ResolveStrategy,
    ResolvedAsset,
};
pub use edge::{EdgeGeometry, EdgeOptions, LayoutPoint};
pub use html::{HtmlOptions, render_html};
pub use layout::{CanvasLayout, LayoutOptions, LayoutRect, compute_layout};
pub use manifest::{EdgeDescriptor, EmbeddedAsset, Manifest, NodeContent, NodeDescriptor};

use jcanvas_core::{Canvas, ColorPalette};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Canvas(#[from] jcanvas_core::Error),
    #[error("invalid canvas model: {message}")]
    InvalidModel { message: String },
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub layout: LayoutOptions,
    pub edge: EdgeOptions,
    pub resolve: ResolveOptions,
    pub palette: ColorPalette,
    /// Resolve file assets concurrently (requires the `parallel` feature).
    pub parallel_assets: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            edge: EdgeOptions::default(),
            resolve: ResolveOptions::default(),
            palette: ColorPalette::default(),
            parallel_assets: true,
        }
    }
}

impl ConvertOptions {
    pub fn new(resolve: ResolveOptions) -> Self {
        Self {
            resolve,
            ..Default::default()
        }
    }

    pub fn with_margin(mut self, margin: u32) -> Self {
        self.layout.margin = margin;
        self
    }

    pub fn with_parallel_assets(mut self, parallel: bool) -> Self {
        self.parallel_assets = parallel;
        self
    }
}

/// The result of a successful conversion. Missing assets are not failures; they are listed in
/// `warnings` and shown as placeholders in the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub manifest: Manifest,
    pub warnings: Vec<AssetWarning>,
}

impl Conversion {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Parses, validates and converts a JSON Canvas document.
///
/// Parse and validation errors are returned before any filesystem access.
pub fn convert(text: &str, options: &ConvertOptions) -> Result<Conversion> {
    let canvas = jcanvas_core::parse_document(text)?;
    convert_canvas(&canvas, options)
}

/// Converts an already validated canvas.
pub fn convert_canvas(canvas: &Canvas, options: &ConvertOptions) -> Result<Conversion> {
    let layout = compute_layout(&canvas.nodes, &options.layout)?;
    let rects = layout.node_rects(&canvas.nodes);

    let resolver = AssetResolver::new(options.resolve.clone());
    let assets = assets::resolve_canvas_assets(canvas, &resolver, options.parallel_assets);

    let geometries = manifest::compute_edge_geometries(canvas, &rects, &options.edge)?;
    let manifest =
        manifest::build_manifest(canvas, &layout, &assets, &geometries, &options.palette)?;

    let warnings = assets::asset_warnings(canvas, &assets);
    for warning in &warnings {
        tracing::warn!(node = %warning.node_id, path = %warning.path, "{warning}");
    }

    Ok(Conversion { manifest, warnings })
}
