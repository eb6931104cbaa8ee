#![forbid(unsafe_code)]

//! `jcanvas` converts JSON Canvas documents into self-contained visual artifacts, headlessly.
//!
//! The default build only exposes the parser and validated graph model (`jcanvas-core`).
//!
//! # Features
//!
//! - `render`: enable layout, edge geometry, asset embedding and HTML output (`jcanvas::render`)

pub use jcanvas_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use jcanvas_render::assets::{AssetRequest, asset_requests, mime_type_for};
    pub use jcanvas_render::edge::{anchor_point, compute_edge, infer_side};
    pub use jcanvas_render::html::sanitize_url;
    pub use jcanvas_render::{
        AssetResolver, AssetRole, AssetWarning, CanvasLayout, Conversion, ConvertOptions,
        EdgeDescriptor, EdgeGeometry, EdgeOptions, EmbeddedAsset, HtmlOptions, LayoutOptions,
        LayoutPoint, LayoutRect, Manifest, NodeContent, NodeDescriptor, ResolveOptions,
        ResolveStrategy, ResolvedAsset, compute_layout, convert, convert_canvas, render_html,
    };

    use jcanvas_core::Canvas;
    use std::path::{Path, PathBuf};

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Canvas(#[from] jcanvas_core::Error),
        #[error(transparent)]
        Render(#[from] jcanvas_render::Error),
        #[error("failed to read {}: {source}", path.display())]
        Io {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Convenience wrapper that bundles conversion and HTML options.
    ///
    /// `convert_file` derives the canvas directory from the document path; everything else uses
    /// the options as configured.
    #[derive(Debug, Clone, Default)]
    pub struct Converter {
        pub options: ConvertOptions,
        pub html: HtmlOptions,
    }

    impl Converter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
            self.options.resolve.root_dir = Some(root_dir.into());
            self
        }

        pub fn with_canvas_dir(mut self, canvas_dir: impl Into<PathBuf>) -> Self {
            self.options.resolve.canvas_dir = canvas_dir.into();
            self
        }

        pub fn with_margin(mut self, margin: u32) -> Self {
            self.options.layout.margin = margin;
            self
        }

        pub fn with_title(mut self, title: impl Into<String>) -> Self {
            self.html.title = title.into();
            self
        }

        /// Toggles the embedded pan/zoom viewer in HTML output.
        pub fn with_interactive(mut self, interactive: bool) -> Self {
            self.html.interactive = interactive;
            self
        }

        /// Parses and validates only; no filesystem access.
        pub fn validate_str(&self, text: &str) -> Result<Canvas> {
            Ok(jcanvas_core::parse_document(text)?)
        }

        pub fn convert_str(&self, text: &str) -> Result<Conversion> {
            Ok(jcanvas_render::convert(text, &self.options)?)
        }

        pub fn convert_file(&self, path: impl AsRef<Path>) -> Result<Conversion> {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).map_err(|source| HeadlessError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let mut options = self.options.clone();
            options.resolve.canvas_dir = canvas_dir_of(path);
            Ok(jcanvas_render::convert(&text, &options)?)
        }

        pub fn render_html(&self, conversion: &Conversion) -> String {
            jcanvas_render::render_html(&conversion.manifest, &self.html)
        }

        /// Converts `text` and renders it to HTML in one step.
        pub fn html_from_str(&self, text: &str) -> Result<(String, Vec<AssetWarning>)> {
            let conversion = self.convert_str(text)?;
            let html = self.render_html(&conversion);
            Ok((html, conversion.warnings))
        }
    }

    /// The directory assets are resolved against for a document at `path`.
    pub fn canvas_dir_of(path: &Path) -> PathBuf {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
