//! Standalone HTML output.
//!
//! Produces a single document with no external references: node elements are absolutely
//! positioned in manifest order, edges are drawn in one SVG layer beneath them, and every asset
//! is inlined as a `data:` URL.
//!
//! Interactive output adds an inline pan/zoom viewer: wheel and pinch zoom, mouse and touch
//! drag, zoom buttons with a percentage readout, `+`/`-`/`0` keys and a short instructions panel.

use crate::manifest::{EdgeDescriptor, EmbeddedAsset, Manifest, NodeContent, NodeDescriptor};
use crate::util::fmt_num;
use htmlize::{escape_attribute, escape_text};
use jcanvas_core::BackgroundStyle;
use std::fmt::Write as _;
use url::Url;

pub const BLANK_URL: &str = "about:blank";

const DEFAULT_EDGE_COLOR: &str = "#5c6370";

const STYLESHEET: &str = r#"* { margin: 0; padding: 0; box-sizing: border-box; }
body { background-color: #1e1e1e; color: #abb2bf; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, Cantarell, sans-serif; }
#viewport { overflow: auto; width: 100vw; height: 100vh; }
#canvas-container { position: relative; }
#edges-layer { position: absolute; top: 0; left: 0; pointer-events: none; overflow: visible; }
#nodes-layer { position: absolute; top: 0; left: 0; width: 100%; height: 100%; }
.node { position: absolute; border-radius: 8px; overflow: hidden; border: 1px solid #3e4451; }
.node-text { background-color: #282c34; padding: 12px; font-size: 14px; line-height: 1.5; overflow-wrap: break-word; }
.node-file { background-color: #282c34; display: flex; align-items: center; justify-content: center; }
.node-file img { width: 100%; height: 100%; object-fit: contain; }
.node-missing { background-color: #282c34; padding: 12px; font-size: 13px; color: #e06c75; border-style: dashed; }
.node-link { background-color: #282c34; padding: 12px; color: #61afef; text-decoration: none; font-size: 14px; overflow-wrap: anywhere; }
.node-group { background-color: rgba(62, 68, 81, 0.25); border: 2px solid #3e4451; }
.node-group .group-label { position: absolute; top: -28px; left: 0; font-size: 14px; font-weight: 600; white-space: nowrap; }
.edge { fill: none; stroke-width: 2; }
.edge-label { font-size: 13px; fill: #abb2bf; text-anchor: middle; dominant-baseline: middle; }
"#;

const VIEWER_STYLESHEET: &str = r#"#viewport { overflow: hidden; cursor: grab; touch-action: none; }
#viewport.grabbing { cursor: grabbing; }
#canvas-container { transform-origin: 0 0; }
#controls { position: fixed; top: 20px; right: 20px; z-index: 1000; display: flex; flex-direction: column; gap: 8px; padding: 12px; background-color: rgba(40, 44, 52, 0.9); border: 1px solid #3e4451; border-radius: 8px; }
.control-btn { background-color: #3e4451; color: #abb2bf; border: none; border-radius: 4px; padding: 8px 16px; font-size: 14px; cursor: pointer; }
.control-btn:hover { background-color: #4e5461; }
.control-btn:active { background-color: #2e3441; }
#zoom-level { text-align: center; color: #61afef; font-size: 12px; padding: 4px; }
#instructions { position: fixed; bottom: 20px; left: 20px; z-index: 1000; padding: 12px; font-size: 12px; background-color: rgba(40, 44, 52, 0.9); border: 1px solid #3e4451; border-radius: 8px; }
#instructions div { margin: 4px 0; }
@media (max-width: 768px) {
  #controls { top: 10px; right: 10px; padding: 8px; gap: 6px; }
  .control-btn { min-height: 44px; padding: 10px 14px; font-size: 13px; }
  #instructions { bottom: 10px; left: 10px; padding: 8px; font-size: 11px; max-width: calc(100vw - 20px); }
}
"#;

const VIEWER_CONTROLS: &str = r#"<div id="controls">
<button class="control-btn" id="zoom-in" type="button">Zoom In (+)</button>
<button class="control-btn" id="zoom-out" type="button">Zoom Out (-)</button>
<button class="control-btn" id="zoom-reset" type="button">Reset (0)</button>
<div id="zoom-level">100%</div>
</div>
<div id="instructions">
<div><strong>Controls:</strong></div>
<div>Mouse wheel / pinch: zoom in and out</div>
<div>Click and drag / touch and drag: pan</div>
<div>Buttons or +/-/0 keys: zoom controls</div>
</div>
"#;

const VIEWER_SCRIPT: &str = r#"(function () {
  const MIN_SCALE = 0.1, MAX_SCALE = 5, STEP = 0.1;
  const viewport = document.getElementById('viewport');
  const container = document.getElementById('canvas-container');
  const level = document.getElementById('zoom-level');
  const view = { scale: 1, x: 0, y: 0 };
  let drag = null;
  let pinch = 0;

  function apply() {
    container.style.transform = 'translate(' + view.x + 'px, ' + view.y + 'px) scale(' + view.scale + ')';
    level.textContent = Math.round(view.scale * 100) + '%';
  }
  function zoom(delta, cx, cy) {
    const old = view.scale;
    view.scale = Math.min(MAX_SCALE, Math.max(MIN_SCALE, old + delta));
    if (cx !== undefined) {
      const ratio = view.scale / old;
      view.x = cx - (cx - view.x) * ratio;
      view.y = cy - (cy - view.y) * ratio;
    }
    apply();
  }
  function reset() {
    view.scale = 1; view.x = 0; view.y = 0;
    apply();
  }
  function local(clientX, clientY) {
    const r = viewport.getBoundingClientRect();
    return [clientX - r.left, clientY - r.top];
  }
  function startDrag(p) {
    drag = { x: p.clientX - view.x, y: p.clientY - view.y };
    viewport.classList.add('grabbing');
  }
  function moveDrag(p) {
    view.x = p.clientX - drag.x;
    view.y = p.clientY - drag.y;
    apply();
  }
  function endDrag() {
    drag = null;
    viewport.classList.remove('grabbing');
  }
  function spread(t) {
    return Math.hypot(t[0].clientX - t[1].clientX, t[0].clientY - t[1].clientY);
  }

  viewport.addEventListener('wheel', function (e) {
    e.preventDefault();
    const [cx, cy] = local(e.clientX, e.clientY);
    zoom(e.deltaY > 0 ? -STEP : STEP, cx, cy);
  }, { passive: false });
  viewport.addEventListener('mousedown', startDrag);
  document.addEventListener('mousemove', function (e) { if (drag) moveDrag(e); });
  document.addEventListener('mouseup', endDrag);

  viewport.addEventListener('touchstart', function (e) {
    if (e.touches.length === 1) {
      startDrag(e.touches[0]);
    } else if (e.touches.length === 2) {
      e.preventDefault();
      drag = null;
      pinch = spread(e.touches);
    }
  }, { passive: false });
  viewport.addEventListener('touchmove', function (e) {
    if (e.touches.length === 1 && drag) {
      e.preventDefault();
      moveDrag(e.touches[0]);
    } else if (e.touches.length === 2) {
      e.preventDefault();
      const d = spread(e.touches);
      const [cx, cy] = local(
        (e.touches[0].clientX + e.touches[1].clientX) / 2,
        (e.touches[0].clientY + e.touches[1].clientY) / 2
      );
      zoom(((d - pinch) / 100) * STEP, cx, cy);
      pinch = d;
    }
  }, { passive: false });
  viewport.addEventListener('touchend', function (e) {
    if (e.touches.length === 0) {
      endDrag();
    } else if (e.touches.length === 1) {
      startDrag(e.touches[0]);
      pinch = 0;
    }
  });

  document.getElementById('zoom-in').addEventListener('click', function () { zoom(STEP); });
  document.getElementById('zoom-out').addEventListener('click', function () { zoom(-STEP); });
  document.getElementById('zoom-reset').addEventListener('click', reset);
  document.addEventListener('keydown', function (e) {
    if (e.key === '+' || e.key === '=') {
      e.preventDefault();
      zoom(STEP);
    } else if (e.key === '-' || e.key === '_') {
      e.preventDefault();
      zoom(-STEP);
    } else if (e.key === '0') {
      e.preventDefault();
      reset();
    }
  });

  apply();
})();
"#;

#[derive(Debug, Clone)]
pub struct HtmlOptions {
    pub title: String,
    /// Embed the pan/zoom viewer (controls, instructions and an inline script).
    pub interactive: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            title: "Canvas Visualization".to_string(),
            interactive: true,
        }
    }
}

impl HtmlOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

fn is_invalid_protocol(scheme: &str) -> bool {
    matches!(scheme, "javascript" | "data" | "vbscript")
}

/// Makes a link-node URL safe to place in an `href`.
///
/// Script-capable schemes become `about:blank`; `http(s)` URLs are normalized through a URL
/// parser (and rejected if they do not parse); relative references pass through.
pub fn sanitize_url(url: &str) -> String {
    let trimmed: String = url.trim().chars().filter(|c| !c.is_control()).collect();
    if trimmed.is_empty() {
        return BLANK_URL.to_string();
    }
    if matches!(trimmed.as_bytes()[0], b'.' | b'/' | b'#') {
        return trimmed;
    }

    let Some((scheme, _)) = trimmed.split_once(':') else {
        return trimmed;
    };
    if !scheme
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        return trimmed;
    }
    let scheme = scheme.to_ascii_lowercase();
    if is_invalid_protocol(scheme.trim()) {
        return BLANK_URL.to_string();
    }
    if scheme == "http" || scheme == "https" {
        return match Url::parse(&trimmed) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => BLANK_URL.to_string(),
        };
    }
    trimmed
}

pub fn render_html(manifest: &Manifest, options: &HtmlOptions) -> String {
    let width = manifest.width().max(1);
    let height = manifest.height().max(1);

    let mut out = String::with_capacity(16 * 1024);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"UTF-8\">\n");
    out.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    let _ = writeln!(out, "<title>{}</title>", escape_text(options.title.as_str()));
    out.push_str("<style>\n");
    out.push_str(STYLESHEET);
    if options.interactive {
        out.push_str(VIEWER_STYLESHEET);
    }
    out.push_str("</style>\n</head>\n<body>\n");
    if options.interactive {
        out.push_str(VIEWER_CONTROLS);
    }
    out.push_str("<div id=\"viewport\">\n");
    let _ = writeln!(
        out,
        r#"<div id="canvas-container" style="width: {width}px; height: {height}px;">"#
    );

    render_edges(&mut out, &manifest.edges, width, height);

    out.push_str("<div id=\"nodes-layer\">\n");
    for node in &manifest.nodes {
        render_node(&mut out, node);
    }
    out.push_str("</div>\n</div>\n</div>\n");
    if options.interactive {
        let _ = write!(out, "<script>\n{VIEWER_SCRIPT}</script>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn render_edges(out: &mut String, edges: &[EdgeDescriptor], width: i64, height: i64) {
    let _ = writeln!(
        out,
        r#"<svg id="edges-layer" width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg">"#
    );
    out.push_str("<defs>\n");
    for (idx, edge) in edges.iter().enumerate() {
        let g = &edge.geometry;
        if !(g.arrow_at_start || g.arrow_at_end) {
            continue;
        }
        let color = edge.color.as_deref().unwrap_or(DEFAULT_EDGE_COLOR);
        let _ = writeln!(
            out,
            r#"<marker id="arrow-{idx}" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse"><path d="M0,0 L10,5 L0,10 z" fill="{}"/></marker>"#,
            escape_attribute(color)
        );
    }
    out.push_str("</defs>\n");

    for (idx, edge) in edges.iter().enumerate() {
        let g = &edge.geometry;
        let color = edge.color.as_deref().unwrap_or(DEFAULT_EDGE_COLOR);
        let _ = write!(
            out,
            r#"<path class="edge" data-id="{}" d="{}" stroke="{}""#,
            escape_attribute(edge.id.as_str()),
            g.path,
            escape_attribute(color)
        );
        if g.arrow_at_start {
            let _ = write!(out, r#" marker-start="url(#arrow-{idx})""#);
        }
        if g.arrow_at_end {
            let _ = write!(out, r#" marker-end="url(#arrow-{idx})""#);
        }
        out.push_str("/>\n");

        if let Some(label) = edge.label.as_deref().filter(|l| !l.is_empty()) {
            let _ = writeln!(
                out,
                r#"<text class="edge-label" x="{}" y="{}">{}</text>"#,
                fmt_num(g.label_point.x),
                fmt_num(g.label_point.y),
                escape_text(label)
            );
        }
    }
    out.push_str("</svg>\n");
}

fn node_style(node: &NodeDescriptor) -> String {
    let r = &node.rect;
    let mut style = format!(
        "left: {}px; top: {}px; width: {}px; height: {}px;",
        r.x, r.y, r.width, r.height
    );
    if let Some(color) = &node.color {
        let _ = write!(style, " border-color: {color};");
    }
    style
}

fn text_to_html(text: &str) -> String {
    escape_text(text).replace('\n', "<br>")
}

fn render_node(out: &mut String, node: &NodeDescriptor) {
    let style = node_style(node);
    let id = escape_attribute(node.id.as_str());
    match &node.content {
        NodeContent::Text { text } => {
            let _ = writeln!(
                out,
                r#"<div class="node node-text" data-id="{id}" style="{}">{}</div>"#,
                escape_attribute(style.as_str()),
                text_to_html(text)
            );
        }
        NodeContent::File { file, asset, .. } => render_file_node(out, &id, &style, file, asset),
        NodeContent::Link { url } => {
            let _ = writeln!(
                out,
                r#"<a class="node node-link" data-id="{id}" style="{}" href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
                escape_attribute(style.as_str()),
                escape_attribute(sanitize_url(url).as_str()),
                escape_text(url.as_str())
            );
        }
        NodeContent::Group {
            label,
            background,
            background_style,
        } => {
            let mut style = style;
            if let Some(data_url) = background.as_ref().and_then(EmbeddedAsset::data_url) {
                let _ = write!(style, " background-image: url('{data_url}');");
                let css = match background_style {
                    Some(BackgroundStyle::Ratio) => {
                        " background-size: contain; background-repeat: no-repeat;"
                    }
                    Some(BackgroundStyle::Repeat) => " background-repeat: repeat;",
                    Some(BackgroundStyle::Cover) | None => {
                        " background-size: cover; background-repeat: no-repeat;"
                    }
                };
                style.push_str(css);
            }
            let _ = write!(
                out,
                r#"<div class="node node-group" data-id="{id}" style="{}">"#,
                escape_attribute(style.as_str())
            );
            if let Some(label) = label.as_deref().filter(|l| !l.is_empty()) {
                let _ = write!(out, r#"<div class="group-label">{}</div>"#, escape_text(label));
            }
            out.push_str("</div>\n");
        }
    }
}

fn render_file_node(out: &mut String, id: &str, style: &str, file: &str, asset: &EmbeddedAsset) {
    let style = escape_attribute(style);
    let Some(data_url) = asset.data_url() else {
        let _ = writeln!(
            out,
            r#"<div class="node node-missing" data-id="{id}" style="{style}">File not found: {}</div>"#,
            escape_text(file)
        );
        return;
    };

    if asset.is_image() {
        let _ = writeln!(
            out,
            r#"<div class="node node-file" data-id="{id}" style="{style}"><img src="{}" alt="{}"></div>"#,
            escape_attribute(data_url.as_str()),
            escape_attribute(file)
        );
    } else {
        let name = std::path::Path::new(file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string());
        let _ = writeln!(
            out,
            r#"<div class="node node-file" data-id="{id}" style="{style}"><a href="{}" download="{}">{}</a></div>"#,
            escape_attribute(data_url.as_str()),
            escape_attribute(name.as_str()),
            escape_text(name.as_str())
        );
    }
}
