#![forbid(unsafe_code)]

//! JSON Canvas parser + validated graph model (headless).
//!
//! Design goals:
//! - fail fast: malformed or invalid documents never yield a partial graph
//! - every validation failure names the offending node/edge id and the invariant it broke
//! - pure functions only; no filesystem access (asset lookup lives in `jcanvas-render`)

pub mod color;
pub mod error;
pub mod geom;
pub mod model;
pub mod parse;

pub use color::{ColorPalette, DEFAULT_PRESETS};
pub use error::{Error, Result, Subject, ValidationError, Violation};
pub use model::{BackgroundStyle, Canvas, Edge, EndKind, Node, NodeKind, Side};
pub use parse::{parse_document, validate_document};
