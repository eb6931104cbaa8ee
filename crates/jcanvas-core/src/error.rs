use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not well-formed JSON.
    #[error("Canvas parse error at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(err) => Some(err),
            Error::Parse { .. } => None,
        }
    }
}

/// The document element a validation failure is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Document,
    /// A node, by id. Nodes without a usable id are reported by array index as `#<index>`.
    Node(String),
    /// An edge, by id. Edges without a usable id are reported by array index as `#<index>`.
    Edge(String),
}

impl Subject {
    pub fn id(&self) -> Option<&str> {
        match self {
            Subject::Document => None,
            Subject::Node(id) | Subject::Edge(id) => Some(id),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Document => f.write_str("document"),
            Subject::Node(id) => write!(f, "node `{id}`"),
            Subject::Edge(id) => write!(f, "edge `{id}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("malformed document: {message}")]
    MalformedDocument { message: String },

    #[error("`{key}` must be an array")]
    NotAnArray { key: &'static str },

    #[error("entry must be an object")]
    NotAnObject,

    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` is not allowed on {kind} nodes")]
    ForbiddenField {
        field: &'static str,
        kind: &'static str,
    },

    #[error("field `{field}` must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` must be an integer, got {value}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("field `{field}` must be strictly positive, got {value}")]
    NonPositiveSize { field: &'static str, value: i64 },

    #[error("unknown node type `{kind}`")]
    UnknownKind { kind: String },

    #[error("invalid color `{value}` (expected `#RRGGBB` or a preset key)")]
    InvalidColor { value: String },

    #[error("invalid side `{value}` for `{field}` (expected top, right, bottom or left)")]
    InvalidSide { field: &'static str, value: String },

    #[error("invalid endpoint shape `{value}` for `{field}` (expected none or arrow)")]
    InvalidEnd { field: &'static str, value: String },

    #[error("invalid background style `{value}` (expected cover, ratio or repeat)")]
    InvalidBackgroundStyle { value: String },

    #[error("duplicate id")]
    DuplicateId,

    #[error("`{field}` references unknown node `{target}`")]
    DanglingEndpoint { field: &'static str, target: String },
}

/// A structurally valid document that breaks a graph invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid canvas ({subject}): {violation}")]
pub struct ValidationError {
    pub subject: Subject,
    pub violation: Violation,
}

impl ValidationError {
    pub fn new(subject: Subject, violation: Violation) -> Self {
        Self { subject, violation }
    }

    pub fn document(violation: Violation) -> Self {
        Self::new(Subject::Document, violation)
    }
}
