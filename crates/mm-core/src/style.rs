//! Per-node style records.
//!
//! A node's style is four free-form key/value maps. The maps are owned by
//! the node: a child starts with a structural copy of its parent's record
//! and the two never share storage afterwards.

use crate::style_value::{Color, parse_color, parse_length};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Free-form `key → value` style properties (CSS-like strings).
pub type StyleMap = BTreeMap<String, String>;

/// Well-known keys read by the layout and connector code.
pub mod keys {
    /// Line map: connector kind (`straight`, `curved`, `bezier`, `dashed`, `dotted`).
    pub const LINE_TYPE: &str = "type";
    /// Line map: connector stroke color.
    pub const LINE_COLOR: &str = "color";
    /// Line map: connector stroke width.
    pub const LINE_WIDTH: &str = "width";
    /// Node map: box background.
    pub const BACKGROUND: &str = "background-color";
    /// Node map: box border color.
    pub const BORDER_COLOR: &str = "border-color";
}

/// The four style sections of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleSection {
    Container,
    Node,
    Topic,
    Line,
}

impl StyleSection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "container" => Some(Self::Container),
            "node" => Some(Self::Node),
            "topic" => Some(Self::Topic),
            "line" => Some(Self::Line),
            _ => None,
        }
    }
}

/// The full style bundle of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStyle {
    #[serde(default)]
    pub container: StyleMap,
    #[serde(default)]
    pub node: StyleMap,
    #[serde(default)]
    pub topic: StyleMap,
    #[serde(default)]
    pub line: StyleMap,
}

impl NodeStyle {
    pub fn section(&self, section: StyleSection) -> &StyleMap {
        match section {
            StyleSection::Container => &self.container,
            StyleSection::Node => &self.node,
            StyleSection::Topic => &self.topic,
            StyleSection::Line => &self.line,
        }
    }

    pub fn section_mut(&mut self, section: StyleSection) -> &mut StyleMap {
        match section {
            StyleSection::Container => &mut self.container,
            StyleSection::Node => &mut self.node,
            StyleSection::Topic => &mut self.topic,
            StyleSection::Line => &mut self.line,
        }
    }

    /// Style for a new child: a structural copy of this record.
    #[must_use]
    pub fn inherit(&self) -> NodeStyle {
        self.clone()
    }

    /// Apply a single edit. Returns `true` if the stored value changed.
    pub fn apply(&mut self, edit: &StyleEdit) -> bool {
        let map = self.section_mut(edit.section);
        match &edit.value {
            Some(value) => map.insert(edit.key.clone(), value.clone()).as_ref() != Some(value),
            None => map.remove(&edit.key).is_some(),
        }
    }

    /// Connector kind, defaulting to `Curved` when unset or unknown.
    pub fn line_kind(&self) -> LineKind {
        self.line
            .get(keys::LINE_TYPE)
            .and_then(|v| LineKind::from_name(v))
            .unwrap_or_default()
    }

    pub fn line_color(&self) -> Option<Color> {
        self.line.get(keys::LINE_COLOR).and_then(|v| parse_color(v))
    }

    pub fn line_width(&self) -> Option<f32> {
        self.line.get(keys::LINE_WIDTH).and_then(|v| parse_length(v))
    }

    pub fn background(&self) -> Option<Color> {
        self.node.get(keys::BACKGROUND).and_then(|v| parse_color(v))
    }

    pub fn border_color(&self) -> Option<Color> {
        self.node.get(keys::BORDER_COLOR).and_then(|v| parse_color(v))
    }
}

/// How the connector between a node and its parent is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Straight,
    #[default]
    Curved,
    Bezier,
    Dashed,
    Dotted,
}

impl LineKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "straight" => Some(Self::Straight),
            "curved" => Some(Self::Curved),
            "bezier" => Some(Self::Bezier),
            "dashed" => Some(Self::Dashed),
            "dotted" => Some(Self::Dotted),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Straight => "straight",
            Self::Curved => "curved",
            Self::Bezier => "bezier",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
        }
    }
}

/// One style write: set (`Some`) or clear (`None`) `key` in `section`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleEdit {
    pub section: StyleSection,
    pub key: String,
    pub value: Option<String>,
}

impl StyleEdit {
    pub fn set(section: StyleSection, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            section,
            key: key.into(),
            value: Some(value.into()),
        }
    }

    pub fn clear(section: StyleSection, key: impl Into<String>) -> Self {
        Self {
            section,
            key: key.into(),
            value: None,
        }
    }
}
