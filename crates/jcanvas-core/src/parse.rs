//! Canvas document parsing and validation.
//!
//! Parsing is two-phased: the text is first decoded as JSON (failures are `Error::Parse`), then
//! every node and edge is checked field by field. Validation stops at the first violation and
//! names the offending node or edge; no partial graph is ever returned.

use crate::color::is_valid_color;
use crate::error::{Error, Result, Subject, ValidationError, Violation};
use crate::model::{BackgroundStyle, Canvas, Edge, EndKind, Node, NodeKind, Side};
use rustc_hash::FxHashSet;
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde_json::{Map, Value};
use std::fmt;

/// Top-level shape: an object with at most one `nodes` and one `edges` key. Other keys are
/// ignored.
struct RawDocument {
    nodes: Option<Value>,
    edges: Option<Value>,
}

impl<'de> Deserialize<'de> for RawDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = RawDocument;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a canvas object")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<RawDocument, A::Error> {
                let mut doc = RawDocument {
                    nodes: None,
                    edges: None,
                };
                while let Some(key) = map.next_key::<String>()? {
                    let slot = match key.as_str() {
                        "nodes" => &mut doc.nodes,
                        "edges" => &mut doc.edges,
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                            continue;
                        }
                    };
                    if slot.is_some() {
                        return Err(de::Error::custom(format!(
                            "duplicate top-level key `{key}`"
                        )));
                    }
                    *slot = Some(map.next_value::<Value>()?);
                }
                Ok(doc)
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

const PAYLOAD_FIELDS: [&str; 7] = [
    "text",
    "file",
    "subpath",
    "url",
    "label",
    "background",
    "backgroundStyle",
];

/// Parses and validates a canvas document.
pub fn parse_document(text: &str) -> Result<Canvas> {
    let raw: RawDocument = serde_json::from_str(text).map_err(|err| {
        if err.is_data() {
            Error::Validation(ValidationError::document(Violation::MalformedDocument {
                message: err.to_string(),
            }))
        } else {
            Error::Parse {
                message: err.to_string(),
                line: err.line(),
                column: err.column(),
            }
        }
    })?;
    Ok(validate_parts(raw.nodes.as_ref(), raw.edges.as_ref())?)
}

/// Validates an already-decoded JSON value.
///
/// Duplicate top-level keys cannot be detected here since `Value` keeps only the last one; use
/// [`parse_document`] when starting from text.
pub fn validate_document(value: &Value) -> std::result::Result<Canvas, ValidationError> {
    let Some(root) = value.as_object() else {
        return Err(ValidationError::document(Violation::MalformedDocument {
            message: "document root must be an object".to_string(),
        }));
    };
    validate_parts(root.get("nodes"), root.get("edges"))
}

fn validate_parts(
    nodes: Option<&Value>,
    edges: Option<&Value>,
) -> std::result::Result<Canvas, ValidationError> {
    let raw_nodes = as_entries(nodes, "nodes")?;
    let raw_edges = as_entries(edges, "edges")?;

    let mut canvas = Canvas {
        nodes: Vec::with_capacity(raw_nodes.len()),
        edges: Vec::with_capacity(raw_edges.len()),
    };

    let mut node_ids: FxHashSet<String> = FxHashSet::default();
    for (idx, raw) in raw_nodes.iter().enumerate() {
        let node = validate_node(idx, raw)?;
        if !node_ids.insert(node.id.clone()) {
            return Err(ValidationError::new(
                Subject::Node(node.id),
                Violation::DuplicateId,
            ));
        }
        canvas.nodes.push(node);
    }

    let mut edge_ids: FxHashSet<String> = FxHashSet::default();
    for (idx, raw) in raw_edges.iter().enumerate() {
        let edge = validate_edge(idx, raw, &node_ids)?;
        if !edge_ids.insert(edge.id.clone()) {
            return Err(ValidationError::new(
                Subject::Edge(edge.id),
                Violation::DuplicateId,
            ));
        }
        canvas.edges.push(edge);
    }

    tracing::debug!(
        nodes = canvas.nodes.len(),
        edges = canvas.edges.len(),
        "canvas validated"
    );
    Ok(canvas)
}

fn as_entries<'a>(
    value: Option<&'a Value>,
    key: &'static str,
) -> std::result::Result<&'a [Value], ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(ValidationError::document(Violation::NotAnArray { key })),
    }
}

/// Field accessors bound to the subject being validated, so every failure carries its id.
struct Fields<'a> {
    subject: Subject,
    obj: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn fail(&self, violation: Violation) -> ValidationError {
        ValidationError::new(self.subject.clone(), violation)
    }

    fn required_str(&self, field: &'static str) -> std::result::Result<&'a str, ValidationError> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Err(self.fail(Violation::MissingField { field })),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(self.fail(Violation::WrongType {
                field,
                expected: "string",
            })),
        }
    }

    fn optional_str(
        &self,
        field: &'static str,
    ) -> std::result::Result<Option<&'a str>, ValidationError> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.fail(Violation::WrongType {
                field,
                expected: "string",
            })),
        }
    }

    fn required_int(&self, field: &'static str) -> std::result::Result<i64, ValidationError> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Err(self.fail(Violation::MissingField { field })),
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| {
                self.fail(Violation::NotAnInteger {
                    field,
                    value: n.to_string(),
                })
            }),
            Some(_) => Err(self.fail(Violation::WrongType {
                field,
                expected: "number",
            })),
        }
    }

    fn positive_int(&self, field: &'static str) -> std::result::Result<i64, ValidationError> {
        let value = self.required_int(field)?;
        if value <= 0 {
            return Err(self.fail(Violation::NonPositiveSize { field, value }));
        }
        Ok(value)
    }

    fn color(&self) -> std::result::Result<Option<String>, ValidationError> {
        let Some(color) = self.optional_str("color")? else {
            return Ok(None);
        };
        if !is_valid_color(color) {
            return Err(self.fail(Violation::InvalidColor {
                value: color.to_string(),
            }));
        }
        Ok(Some(color.to_string()))
    }

    fn side(&self, field: &'static str) -> std::result::Result<Option<Side>, ValidationError> {
        let Some(raw) = self.optional_str(field)? else {
            return Ok(None);
        };
        raw.parse::<Side>().map(Some).map_err(|_| {
            self.fail(Violation::InvalidSide {
                field,
                value: raw.to_string(),
            })
        })
    }

    fn end(
        &self,
        field: &'static str,
        default: EndKind,
    ) -> std::result::Result<EndKind, ValidationError> {
        let Some(raw) = self.optional_str(field)? else {
            return Ok(default);
        };
        raw.parse::<EndKind>().map_err(|_| {
            self.fail(Violation::InvalidEnd {
                field,
                value: raw.to_string(),
            })
        })
    }

    fn forbid_except(
        &self,
        kind: &'static str,
        allowed: &[&str],
    ) -> std::result::Result<(), ValidationError> {
        for field in PAYLOAD_FIELDS {
            if allowed.contains(&field) {
                continue;
            }
            if self.obj.get(field).is_some_and(|v| !v.is_null()) {
                return Err(self.fail(Violation::ForbiddenField { field, kind }));
            }
        }
        Ok(())
    }
}

/// Reads the `id` of an entry, falling back to `#<index>` so failures stay attributable.
fn entry_id(obj: &Map<String, Value>, idx: usize) -> (String, bool) {
    match obj.get("id") {
        Some(Value::String(id)) => (id.clone(), true),
        _ => (format!("#{idx}"), false),
    }
}

fn validate_node(idx: usize, raw: &Value) -> std::result::Result<Node, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError::new(
            Subject::Node(format!("#{idx}")),
            Violation::NotAnObject,
        ));
    };
    let (id, has_id) = entry_id(obj, idx);
    let fields = Fields {
        subject: Subject::Node(id.clone()),
        obj,
    };
    if !has_id {
        fields.required_str("id")?;
    }

    let kind_name = fields.required_str("type")?;
    let x = fields.required_int("x")?;
    let y = fields.required_int("y")?;
    let width = fields.positive_int("width")?;
    let height = fields.positive_int("height")?;
    let color = fields.color()?;

    let kind = match kind_name {
        "text" => {
            fields.forbid_except("text", &["text"])?;
            NodeKind::Text {
                text: fields.required_str("text")?.to_string(),
            }
        }
        "file" => {
            fields.forbid_except("file", &["file", "subpath"])?;
            NodeKind::File {
                file: fields.required_str("file")?.to_string(),
                subpath: fields.optional_str("subpath")?.map(str::to_string),
            }
        }
        "link" => {
            fields.forbid_except("link", &["url"])?;
            NodeKind::Link {
                url: fields.required_str("url")?.to_string(),
            }
        }
        "group" => {
            fields.forbid_except("group", &["label", "background", "backgroundStyle"])?;
            let background_style = match fields.optional_str("backgroundStyle")? {
                None => None,
                Some(raw) => Some(raw.parse::<BackgroundStyle>().map_err(|_| {
                    fields.fail(Violation::InvalidBackgroundStyle {
                        value: raw.to_string(),
                    })
                })?),
            };
            NodeKind::Group {
                label: fields.optional_str("label")?.map(str::to_string),
                background: fields.optional_str("background")?.map(str::to_string),
                background_style,
            }
        }
        other => {
            return Err(fields.fail(Violation::UnknownKind {
                kind: other.to_string(),
            }));
        }
    };

    Ok(Node {
        id,
        x,
        y,
        width,
        height,
        color,
        kind,
    })
}

fn validate_edge(
    idx: usize,
    raw: &Value,
    node_ids: &FxHashSet<String>,
) -> std::result::Result<Edge, ValidationError> {
    let Some(obj) = raw.as_object() else {
        return Err(ValidationError::new(
            Subject::Edge(format!("#{idx}")),
            Violation::NotAnObject,
        ));
    };
    let (id, has_id) = entry_id(obj, idx);
    let fields = Fields {
        subject: Subject::Edge(id.clone()),
        obj,
    };
    if !has_id {
        fields.required_str("id")?;
    }

    let from_node = fields.required_str("fromNode")?;
    let to_node = fields.required_str("toNode")?;
    for (field, target) in [("fromNode", from_node), ("toNode", to_node)] {
        if !node_ids.contains(target) {
            return Err(fields.fail(Violation::DanglingEndpoint {
                field,
                target: target.to_string(),
            }));
        }
    }

    Ok(Edge {
        id,
        from_node: from_node.to_string(),
        to_node: to_node.to_string(),
        from_side: fields.side("fromSide")?,
        to_side: fields.side("toSide")?,
        from_end: fields.end("fromEnd", EndKind::from_default())?,
        to_end: fields.end("toEnd", EndKind::to_default())?,
        color: fields.color()?,
        label: fields.optional_str("label")?.map(str::to_string),
    })
}
