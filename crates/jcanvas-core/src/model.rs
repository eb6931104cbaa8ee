use crate::geom::{Vector, vector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated canvas document. Node order is the document order and doubles as z-order
/// (the first node is the bottom layer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Canvas {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    /// Raw color value: `#RRGGBB` or a preset key. Resolved through a `ColorPalette`.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn right(&self) -> i64 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Text {
        text: String,
    },
    File {
        file: String,
        #[serde(default)]
        subpath: Option<String>,
    },
    Link {
        url: String,
    },
    Group {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        background: Option<String>,
        #[serde(default, rename = "backgroundStyle")]
        background_style: Option<BackgroundStyle>,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Text { .. } => "text",
            NodeKind::File { .. } => "file",
            NodeKind::Link { .. } => "link",
            NodeKind::Group { .. } => "group",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundStyle {
    Cover,
    Ratio,
    Repeat,
}

impl BackgroundStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            BackgroundStyle::Cover => "cover",
            BackgroundStyle::Ratio => "ratio",
            BackgroundStyle::Repeat => "repeat",
        }
    }
}

impl FromStr for BackgroundStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cover" => Ok(Self::Cover),
            "ratio" => Ok(Self::Ratio),
            "repeat" => Ok(Self::Repeat),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    #[serde(rename = "fromNode")]
    pub from_node: String,
    #[serde(rename = "toNode")]
    pub to_node: String,
    /// `None` means the side is inferred from geometry.
    #[serde(default, rename = "fromSide")]
    pub from_side: Option<Side>,
    #[serde(default, rename = "toSide")]
    pub to_side: Option<Side>,
    #[serde(default = "EndKind::from_default", rename = "fromEnd")]
    pub from_end: EndKind,
    #[serde(default = "EndKind::to_default", rename = "toEnd")]
    pub to_end: EndKind,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.from_node == self.to_node
    }
}

/// A side of a node rectangle. `Side::ALL` is also the tie-break priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Right => "right",
            Side::Bottom => "bottom",
            Side::Left => "left",
        }
    }

    /// Unit vector pointing out of the rectangle through this side (y grows downward).
    pub fn outward(self) -> Vector {
        match self {
            Side::Top => vector(0.0, -1.0),
            Side::Right => vector(1.0, 0.0),
            Side::Bottom => vector(0.0, 1.0),
            Side::Left => vector(-1.0, 0.0),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Self::Top),
            "right" => Ok(Self::Right),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndKind {
    None,
    Arrow,
}

impl EndKind {
    pub fn from_default() -> Self {
        EndKind::None
    }

    pub fn to_default() -> Self {
        EndKind::Arrow
    }

    pub fn is_arrow(self) -> bool {
        self == EndKind::Arrow
    }
}

impl FromStr for EndKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "arrow" => Ok(Self::Arrow),
            _ => Err(()),
        }
    }
}
