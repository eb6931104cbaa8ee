//! File asset lookup.
//!
//! A referenced path is tried against an ordered chain of strategies; the first strategy that
//! yields a readable regular file wins. Lookup failures never propagate as errors: they become a
//! `ResolvedAsset` without a hit, which later turns into a placeholder and an [`AssetWarning`].

use jcanvas_core::{Canvas, NodeKind};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStrategy {
    /// The path as written, relative to the working directory.
    AsGiven,
    /// Relative to the directory containing the canvas document.
    CanvasRelative,
    /// Relative to the caller-supplied root directory.
    RootRelative,
    /// The bare file name, searched in the canvas directory and all of its subdirectories.
    BasenameSearch,
}

impl ResolveStrategy {
    pub const DEFAULT_CHAIN: [ResolveStrategy; 4] = [
        ResolveStrategy::AsGiven,
        ResolveStrategy::CanvasRelative,
        ResolveStrategy::RootRelative,
        ResolveStrategy::BasenameSearch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResolveStrategy::AsGiven => "as_given",
            ResolveStrategy::CanvasRelative => "canvas_relative",
            ResolveStrategy::RootRelative => "root_relative",
            ResolveStrategy::BasenameSearch => "basename_search",
        }
    }

    /// Returns the first existing file this strategy finds for `path`, recording every
    /// candidate it looked at in `tried`.
    fn locate(
        self,
        path: &str,
        options: &ResolveOptions,
        tried: &mut Vec<PathBuf>,
    ) -> Option<PathBuf> {
        let candidate = match self {
            ResolveStrategy::AsGiven => match &options.working_dir {
                Some(dir) => dir.join(path),
                None => PathBuf::from(path),
            },
            ResolveStrategy::CanvasRelative => options.canvas_dir.join(path),
            ResolveStrategy::RootRelative => options.root_dir.as_ref()?.join(path),
            ResolveStrategy::BasenameSearch => {
                let basename = Path::new(path).file_name()?;
                tried.push(options.canvas_dir.join("**").join(basename));
                return find_by_basename(&options.canvas_dir, basename);
            }
        };
        tracing::trace!(
            strategy = self.as_str(),
            candidate = %candidate.display(),
            "trying asset path"
        );
        let hit = candidate.is_file();
        tried.push(candidate.clone());
        hit.then_some(candidate)
    }
}

impl fmt::Display for ResolveStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breadth-first search for a regular file named `basename`, starting at `root`.
///
/// Entries are visited in file-name order and directory symlinks are not followed, so the
/// result only depends on the filesystem contents.
fn find_by_basename(root: &Path, basename: &std::ffi::OsStr) -> Option<PathBuf> {
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.file_name());

        let mut subdirs = Vec::new();
        for entry in entries {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                subdirs.push(entry.path());
            } else if entry.file_name() == basename && entry.path().is_file() {
                return Some(entry.path());
            }
        }
        queue.extend(subdirs);
    }
    None
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Directory containing the canvas document.
    pub canvas_dir: PathBuf,
    pub root_dir: Option<PathBuf>,
    /// Base for [`ResolveStrategy::AsGiven`]; `None` means the process working directory.
    pub working_dir: Option<PathBuf>,
    pub strategies: Vec<ResolveStrategy>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResolveOptions {
    pub fn new(canvas_dir: impl Into<PathBuf>) -> Self {
        Self {
            canvas_dir: canvas_dir.into(),
            root_dir: None,
            working_dir: None,
            strategies: ResolveStrategy::DEFAULT_CHAIN.to_vec(),
        }
    }

    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn with_strategies(
        mut self,
        strategies: impl IntoIterator<Item = ResolveStrategy>,
    ) -> Self {
        self.strategies = strategies.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHit {
    pub strategy: ResolveStrategy,
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// The path as written in the document.
    pub requested: String,
    pub subpath: Option<String>,
    /// Every candidate looked at, in order.
    pub tried: Vec<PathBuf>,
    pub hit: Option<AssetHit>,
}

impl ResolvedAsset {
    pub fn found(&self) -> bool {
        self.hit.is_some()
    }

    pub fn strategy(&self) -> Option<ResolveStrategy> {
        self.hit.as_ref().map(|h| h.strategy)
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        self.hit.as_ref().map(|h| h.mime_type)
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.hit.as_ref().map(|h| h.bytes.as_slice())
    }
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone)]
pub struct AssetResolver {
    options: ResolveOptions,
}

impl AssetResolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn resolve(&self, path: &str, subpath: Option<&str>) -> ResolvedAsset {
        let mut asset = ResolvedAsset {
            requested: path.to_string(),
            subpath: subpath.map(str::to_string),
            tried: Vec::new(),
            hit: None,
        };

        for &strategy in &self.options.strategies {
            let Some(found) = strategy.locate(path, &self.options, &mut asset.tried) else {
                continue;
            };
            // The handle is dropped as soon as the read completes.
            match std::fs::read(&found) {
                Ok(bytes) => {
                    tracing::debug!(
                        path,
                        strategy = strategy.as_str(),
                        resolved = %found.display(),
                        size = bytes.len(),
                        "asset resolved"
                    );
                    asset.hit = Some(AssetHit {
                        strategy,
                        mime_type: mime_type_for(&found),
                        path: found,
                        bytes,
                    });
                    return asset;
                }
                Err(err) => {
                    tracing::warn!(path, resolved = %found.display(), %err, "failed to read asset");
                }
            }
        }

        tracing::debug!(path, tried = asset.tried.len(), "asset not found");
        asset
    }
}

/// What a node's asset is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    File,
    Background,
}

impl AssetRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetRole::File => "file",
            AssetRole::Background => "background",
        }
    }
}

/// One asset lookup per node: the file of a File node or the background of a Group node.
#[derive(Debug, Clone, Copy)]
pub struct AssetRequest<'a> {
    pub node_id: &'a str,
    pub role: AssetRole,
    pub path: &'a str,
    pub subpath: Option<&'a str>,
}

pub fn asset_requests(canvas: &Canvas) -> Vec<AssetRequest<'_>> {
    canvas
        .nodes
        .iter()
        .filter_map(|node| match &node.kind {
            NodeKind::File { file, subpath } => Some(AssetRequest {
                node_id: &node.id,
                role: AssetRole::File,
                path: file,
                subpath: subpath.as_deref(),
            }),
            NodeKind::Group {
                background: Some(background),
                ..
            } => Some(AssetRequest {
                node_id: &node.id,
                role: AssetRole::Background,
                path: background,
                subpath: None,
            }),
            _ => None,
        })
        .collect()
}

/// Resolved assets keyed by node id.
pub type AssetMap = FxHashMap<String, ResolvedAsset>;

/// Resolves every asset referenced by `canvas`.
///
/// Results are keyed by node id, so the order in which lookups complete is irrelevant.
pub fn resolve_canvas_assets(
    canvas: &Canvas,
    resolver: &AssetResolver,
    parallel: bool,
) -> AssetMap {
    let requests = asset_requests(canvas);
    let resolve_one = |req: &AssetRequest<'_>| {
        (
            req.node_id.to_string(),
            resolver.resolve(req.path, req.subpath),
        )
    };

    #[cfg(feature = "parallel")]
    {
        if parallel && requests.len() > 1 {
            use rayon::prelude::*;
            return requests.par_iter().map(&resolve_one).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    requests.iter().map(&resolve_one).collect()
}

/// A referenced file that no strategy could find. Non-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetWarning {
    pub node_id: String,
    pub role: AssetRole,
    pub path: String,
    pub tried: Vec<PathBuf>,
}

impl fmt::Display for AssetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not find {} `{}` for node `{}`",
            self.role.as_str(),
            self.path,
            self.node_id
        )?;
        if !self.tried.is_empty() {
            f.write_str(" (tried: ")?;
            for (idx, p) in self.tried.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", p.display())?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Collects one warning per missing asset, in document order.
pub fn asset_warnings(canvas: &Canvas, assets: &AssetMap) -> Vec<AssetWarning> {
    asset_requests(canvas)
        .into_iter()
        .filter_map(|req| {
            let asset = assets.get(req.node_id)?;
            if asset.found() {
                return None;
            }
            Some(AssetWarning {
                node_id: req.node_id.to_string(),
                role: req.role,
                path: asset.requested.clone(),
                tried: asset.tried.clone(),
            })
        })
        .collect()
}
