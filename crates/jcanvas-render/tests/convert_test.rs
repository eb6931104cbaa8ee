use jcanvas_core::{Side, Subject, Violation};
use jcanvas_render::{
    AssetRole, ConvertOptions, EmbeddedAsset, Error, NodeContent, ResolveOptions,
    ResolveStrategy, convert,
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn fixture(name: &str) -> String {
    let path = workspace_root().join("fixtures").join("canvas").join(name);
    fs::read_to_string(&path).expect("fixture")
}

fn options_for(dir: &Path) -> ConvertOptions {
    ConvertOptions::new(ResolveOptions::new(dir).with_working_dir(dir))
}

/// A tiny but valid PNG signature plus payload; only the bytes matter here.
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

fn mixed_vault() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().expect("tempdir");
    let dir = tmp.path();
    fs::create_dir_all(dir.join("attachments")).expect("mkdir");
    fs::create_dir_all(dir.join("docs")).expect("mkdir");
    fs::write(dir.join("attachments").join("diagram.png"), PNG_BYTES).expect("write png");
    fs::write(dir.join("docs").join("paper.pdf"), b"%PDF-1.7").expect("write pdf");
    fs::write(dir.join("backdrop.png"), PNG_BYTES).expect("write backdrop");
    tmp
}

#[test]
fn two_node_canvas_is_normalized_into_positive_space() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = convert(&fixture("two_nodes.canvas"), &options_for(tmp.path())).expect("convert");
    let m = &out.manifest;

    assert!(out.warnings.is_empty());
    assert_eq!(m.layout.offset_x, 371);
    assert_eq!(m.layout.offset_y, 154);
    assert_eq!(m.width(), 990);
    assert_eq!(m.height(), 253);

    let a = m.node("a").expect("node a");
    let b = m.node("b").expect("node b");
    assert_eq!((a.rect.x, a.rect.y), (0, 0));
    assert_eq!((b.rect.x, b.rect.y), (590, 28));
    assert_eq!((b.rect.width, b.rect.height), (400, 225));
    assert_eq!(b.color.as_deref(), Some("#d19a66"));
    assert_eq!(a.color, None);

    let e = m.edge("e1").expect("edge e1");
    let g = &e.geometry;
    assert_eq!((g.from_side, g.to_side), (Side::Right, Side::Left));
    assert_eq!((g.start.x, g.start.y), (400.0, 112.5));
    assert_eq!((g.end.x, g.end.y), (590.0, 140.5));
    assert!(g.path.starts_with("M400,112.5 Q"));
    assert!(g.path.ends_with(" 590,140.5"));
    assert!(!g.arrow_at_start);
    assert!(g.arrow_at_end);
    assert_eq!(e.label.as_deref(), Some("next"));
}

#[test]
fn every_normalized_rectangle_is_inside_the_canvas() {
    let tmp = mixed_vault();
    let out = convert(
        &fixture("mixed.canvas"),
        &options_for(tmp.path()).with_margin(25),
    )
    .expect("convert");
    let m = &out.manifest;

    for n in &m.nodes {
        assert!(n.rect.x >= 0 && n.rect.y >= 0, "{}", n.id);
        assert!(n.rect.x + n.rect.width <= m.width(), "{}", n.id);
        assert!(n.rect.y + n.rect.height <= m.height(), "{}", n.id);
    }
    // The group's top-left corner is the bounding box minimum.
    let group = m.node("group").expect("group");
    assert_eq!((group.rect.x, group.rect.y), (25, 25));
}

#[test]
fn nodes_and_edges_keep_document_order() {
    let tmp = mixed_vault();
    let out = convert(&fixture("mixed.canvas"), &options_for(tmp.path())).expect("convert");
    let node_ids: Vec<_> = out.manifest.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(
        node_ids,
        ["group", "note", "diagram", "paper", "gone", "site"]
    );
    let edge_ids: Vec<_> = out.manifest.edges.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(edge_ids, ["n-d", "d-p", "loop"]);
}

#[test]
fn assets_are_embedded_and_missing_ones_become_placeholders() {
    let tmp = mixed_vault();
    let out = convert(&fixture("mixed.canvas"), &options_for(tmp.path())).expect("convert");
    let m = &out.manifest;

    let NodeContent::File { asset, .. } = &m.node("diagram").expect("diagram").content else {
        panic!("expected file content");
    };
    assert!(asset.is_image());
    assert_eq!(asset.mime_type(), Some("image/png"));
    assert!(
        asset
            .data_url()
            .is_some_and(|u| u.starts_with("data:image/png;base64,"))
    );
    let decoded = asset.decode().expect("embedded").expect("valid base64");
    assert_eq!(decoded, PNG_BYTES);

    let NodeContent::File { asset, subpath, .. } = &m.node("paper").expect("paper").content else {
        panic!("expected file content");
    };
    assert_eq!(subpath.as_deref(), Some("#page=2"));
    let EmbeddedAsset::Embedded { strategy, .. } = asset else {
        panic!("paper.pdf should be found");
    };
    assert_eq!(*strategy, ResolveStrategy::BasenameSearch);
    assert!(!asset.is_image());

    let NodeContent::File { asset, .. } = &m.node("gone").expect("gone").content else {
        panic!("expected file content");
    };
    assert!(asset.is_missing());
    assert_eq!(asset.data_url(), None);

    assert_eq!(out.warnings.len(), 1);
    let w = &out.warnings[0];
    assert_eq!(w.node_id, "gone");
    assert_eq!(w.role, AssetRole::File);
    assert_eq!(w.path, "missing.png");
    assert!(w.to_string().contains("missing.png"));
}

#[test]
fn group_backgrounds_are_resolved_like_files() {
    let tmp = mixed_vault();
    let out = convert(&fixture("mixed.canvas"), &options_for(tmp.path())).expect("convert");
    let NodeContent::Group {
        label,
        background,
        background_style,
    } = &out.manifest.node("group").expect("group").content
    else {
        panic!("expected group content");
    };
    assert_eq!(label.as_deref(), Some("Sources"));
    assert!(background.as_ref().is_some_and(EmbeddedAsset::is_image));
    assert_eq!(background_style.map(|s| s.as_str()), Some("ratio"));

    fs::remove_file(tmp.path().join("backdrop.png")).expect("remove");
    let out = convert(&fixture("mixed.canvas"), &options_for(tmp.path())).expect("convert");
    let roles: Vec<_> = out.warnings.iter().map(|w| (w.node_id.as_str(), w.role)).collect();
    assert_eq!(
        roles,
        [("group", AssetRole::Background), ("gone", AssetRole::File)]
    );
}

#[test]
fn unknown_preset_digits_pass_through() {
    let tmp = mixed_vault();
    let out = convert(&fixture("mixed.canvas"), &options_for(tmp.path())).expect("convert");
    let m = &out.manifest;
    assert_eq!(m.node("note").and_then(|n| n.color.as_deref()), Some("7"));
    assert_eq!(m.edge("n-d").and_then(|e| e.color.as_deref()), Some("#61afef"));
}

#[test]
fn explicit_ends_and_self_loops_are_carried_through() {
    let tmp = mixed_vault();
    let out = convert(&fixture("mixed.canvas"), &options_for(tmp.path())).expect("convert");
    let m = &out.manifest;

    let dp = &m.edge("d-p").expect("d-p").geometry;
    assert!(dp.arrow_at_start);
    assert!(!dp.arrow_at_end);

    let lp = &m.edge("loop").expect("loop").geometry;
    assert!(lp.is_degenerate());
    assert!(lp.control.x.is_finite() && lp.control.y.is_finite());
    assert!(lp.control.y < lp.start.y);

    // No sides given: inferred from the relative positions.
    let nd = &m.edge("n-d").expect("n-d").geometry;
    assert_eq!((nd.from_side, nd.to_side), (Side::Right, Side::Left));
}

#[test]
fn dangling_edges_fail_before_any_output() {
    let doc = json!({
        "nodes": [
            {"id": "a", "type": "file", "x": 0, "y": 0, "width": 10, "height": 10, "file": "a.png"}
        ],
        "edges": [{"id": "e", "fromNode": "a", "toNode": "ghost"}]
    });
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = convert(&doc.to_string(), &options_for(tmp.path())).expect_err("dangling edge");
    let Error::Canvas(err) = err else {
        panic!("expected canvas error, got {err:?}");
    };
    let v = err.as_validation().expect("validation error");
    assert_eq!(v.subject, Subject::Edge("e".to_string()));
    assert!(matches!(v.violation, Violation::DanglingEndpoint { .. }));
}

#[test]
fn far_apart_nodes_are_rejected_as_an_invalid_model() {
    let doc = json!({
        "nodes": [
            {"id": "west", "type": "text", "x": -9_000_000_000_000_000_000_i64, "y": 0, "width": 10, "height": 10, "text": "w"},
            {"id": "east", "type": "text", "x": 9_000_000_000_000_000_000_i64, "y": 0, "width": 10, "height": 10, "text": "e"}
        ],
        "edges": [{"id": "e", "fromNode": "west", "toNode": "east"}]
    });
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = convert(&doc.to_string(), &options_for(tmp.path())).expect_err("extent overflow");
    assert!(matches!(err, Error::InvalidModel { .. }), "{err:?}");
    assert!(err.to_string().contains("`west`"), "{err}");
}

#[test]
fn margin_at_the_coordinate_minimum_is_rejected() {
    let doc = json!({
        "nodes": [
            {"id": "low", "type": "text", "x": i64::MIN, "y": 0, "width": 10, "height": 10, "text": "t"}
        ]
    });
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = convert(&doc.to_string(), &options_for(tmp.path()).with_margin(50))
        .expect_err("offset overflow");
    assert!(matches!(err, Error::InvalidModel { .. }), "{err:?}");
    assert!(err.to_string().contains("`low`"), "{err}");
}

#[test]
fn node_reaching_past_the_coordinate_maximum_is_named() {
    let doc = json!({
        "nodes": [
            {"id": "far", "type": "text", "x": i64::MAX - 5, "y": 0, "width": 10, "height": 10, "text": "t"}
        ]
    });
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = convert(&doc.to_string(), &options_for(tmp.path())).expect_err("node overflow");
    assert!(err.to_string().contains("node `far`"), "{err}");
}

#[test]
fn malformed_json_is_a_parse_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let err = convert("{\"nodes\": [", &options_for(tmp.path())).expect_err("parse error");
    assert!(matches!(err, Error::Canvas(ref e) if e.is_parse()), "{err:?}");
}

#[test]
fn empty_canvas_converts_to_an_empty_manifest() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = convert(
        r#"{"nodes": [], "edges": []}"#,
        &options_for(tmp.path()).with_margin(10),
    )
    .expect("convert");
    assert!(out.manifest.nodes.is_empty());
    assert!(out.manifest.edges.is_empty());
    assert_eq!((out.manifest.width(), out.manifest.height()), (20, 20));
}

#[test]
fn parallel_and_sequential_resolution_agree() {
    let tmp = mixed_vault();
    let text = fixture("mixed.canvas");
    let parallel = convert(&text, &options_for(tmp.path()).with_parallel_assets(true))
        .expect("parallel");
    let sequential = convert(&text, &options_for(tmp.path()).with_parallel_assets(false))
        .expect("sequential");
    assert_eq!(parallel, sequential);
}

#[test]
fn conversion_is_deterministic() {
    let tmp = mixed_vault();
    let text = fixture("mixed.canvas");
    let first = convert(&text, &options_for(tmp.path())).expect("first");
    let second = convert(&text, &options_for(tmp.path())).expect("second");
    assert_eq!(
        first.manifest.to_json(false).expect("json"),
        second.manifest.to_json(false).expect("json")
    );
}

#[test]
fn manifest_json_is_tagged() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = convert(&fixture("two_nodes.canvas"), &options_for(tmp.path())).expect("convert");
    let value: serde_json::Value =
        serde_json::from_str(&out.manifest.to_json(true).expect("json")).expect("valid json");
    assert_eq!(value["nodes"][0]["content"]["type"], "text");
    assert_eq!(value["nodes"][1]["rect"]["x"], 590);
    assert_eq!(value["edges"][0]["geometry"]["from_side"], "right");
    assert_eq!(value["layout"]["offset_x"], 371);
}
