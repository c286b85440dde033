//! YAML node representation for the document arena.
//!
//! Every node of a parsed document lives in a [`Document`](super::tree::Document)
//! arena and is addressed by a [`NodeId`]. Collections refer to their children by
//! id, and an alias is simply a node whose kind stores the id of its target, so
//! the tree never contains owning cycles.
//!
//! # Example
//!
//! ```
//! use yt::document::node::{NodeKind, ScalarStyle, YamlNode, YamlScalar};
//!
//! let node = YamlNode::new(NodeKind::Scalar(YamlScalar::new("42", ScalarStyle::Plain)))
//!     .with_anchor(Some("answer".to_string()));
//! assert_eq!(node.anchor(), Some("answer"));
//! assert!(node.is_scalar());
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Stable identity of a node inside its document arena.
///
/// Ids are handed out in document order (a parent always has a smaller id
/// than its children), and two structurally equal nodes always have
/// different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the arena index of this node.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The presentation style a scalar was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    pub fn is_quoted(self) -> bool {
        matches!(self, ScalarStyle::SingleQuoted | ScalarStyle::DoubleQuoted)
    }

    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }
}

/// Represents YAML numbers (integer or float)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YamlNumber {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for YamlNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YamlNumber::Integer(i) => write!(f, "{}", i),
            // Debug keeps a `.0` or an exponent, so the text reads back as a float.
            YamlNumber::Float(fl) => write!(f, "{:?}", fl),
        }
    }
}

impl YamlNumber {
    pub fn as_f64(&self) -> f64 {
        match self {
            YamlNumber::Integer(i) => *i as f64,
            YamlNumber::Float(f) => *f,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, YamlNumber::Integer(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, YamlNumber::Float(_))
    }
}

/// The typed interpretation of a scalar, used when comparing values.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Number(YamlNumber),
    String(String),
}

impl ScalarValue {
    /// Returns true unless the value is null or `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, ScalarValue::Null | ScalarValue::Boolean(false))
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("null"),
            ScalarValue::Boolean(b) => write!(f, "{}", b),
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::String(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

static INT_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("valid integer pattern"));
static FLOAT_DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$")
        .expect("valid float pattern")
});

/// A scalar's text together with the style it was written in.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlScalar {
    value: String,
    style: ScalarStyle,
}

impl YamlScalar {
    pub fn new(value: impl Into<String>, style: ScalarStyle) -> Self {
        Self {
            value: value.into(),
            style,
        }
    }

    pub fn plain(value: impl Into<String>) -> Self {
        Self::new(value, ScalarStyle::Plain)
    }

    /// Returns the scalar's content, after unescaping and folding.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn style(&self) -> ScalarStyle {
        self.style
    }

    /// Resolves the scalar to a typed value.
    ///
    /// An explicit core-schema tag wins. Otherwise plain scalars are resolved
    /// with the YAML 1.2 core schema and every other style is a string.
    ///
    /// ```
    /// use yt::document::node::{ScalarValue, YamlNumber, YamlScalar, ScalarStyle};
    ///
    /// assert_eq!(YamlScalar::plain("0x1f").typed(None), ScalarValue::Number(YamlNumber::Integer(31)));
    /// assert_eq!(YamlScalar::plain("~").typed(None), ScalarValue::Null);
    /// let quoted = YamlScalar::new("true", ScalarStyle::DoubleQuoted);
    /// assert_eq!(quoted.typed(None), ScalarValue::String("true".to_string()));
    /// ```
    pub fn typed(&self, tag: Option<&str>) -> ScalarValue {
        match tag {
            Some("!!str") => return ScalarValue::String(self.value.clone()),
            Some("!!null") => return ScalarValue::Null,
            Some("!!bool") | Some("!!int") | Some("!!float") => {
                return resolve_core(&self.value)
                    .unwrap_or_else(|| ScalarValue::String(self.value.clone()))
            }
            _ => {}
        }
        if self.style != ScalarStyle::Plain {
            return ScalarValue::String(self.value.clone());
        }
        resolve_core(&self.value).unwrap_or_else(|| ScalarValue::String(self.value.clone()))
    }
}

/// Core schema resolution; `None` means "just a string".
fn resolve_core(text: &str) -> Option<ScalarValue> {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Some(ScalarValue::Null),
        "true" | "True" | "TRUE" => return Some(ScalarValue::Boolean(true)),
        "false" | "False" | "FALSE" => return Some(ScalarValue::Boolean(false)),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            return Some(ScalarValue::Number(YamlNumber::Float(f64::INFINITY)))
        }
        "-.inf" | "-.Inf" | "-.INF" => {
            return Some(ScalarValue::Number(YamlNumber::Float(f64::NEG_INFINITY)))
        }
        ".nan" | ".NaN" | ".NAN" => return Some(ScalarValue::Number(YamlNumber::Float(f64::NAN))),
        _ => {}
    }
    if let Some(hex) = text.strip_prefix("0x") {
        return i64::from_str_radix(hex, 16)
            .ok()
            .map(|i| ScalarValue::Number(YamlNumber::Integer(i)));
    }
    if let Some(oct) = text.strip_prefix("0o") {
        return i64::from_str_radix(oct, 8)
            .ok()
            .map(|i| ScalarValue::Number(YamlNumber::Integer(i)));
    }
    if INT_DECIMAL.is_match(text) {
        return match text.parse::<i64>() {
            Ok(i) => Some(ScalarValue::Number(YamlNumber::Integer(i))),
            // Too large for i64, still a number.
            Err(_) => text
                .parse::<f64>()
                .ok()
                .map(|f| ScalarValue::Number(YamlNumber::Float(f))),
        };
    }
    if FLOAT_DECIMAL.is_match(text) {
        return text
            .parse::<f64>()
            .ok()
            .map(|f| ScalarValue::Number(YamlNumber::Float(f)));
    }
    None
}

/// The four node kinds of a YAML document graph.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A scalar with style information
    Scalar(YamlScalar),
    /// An ordered list of child nodes
    Sequence(Vec<NodeId>),
    /// Ordered key/value pairs; keys are nodes too
    Mapping(Vec<(NodeId, NodeId)>),
    /// A non-owning reference to an anchored node
    Alias(NodeId),
}

/// A node in the document arena: its kind plus anchor and tag properties.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlNode {
    pub(crate) kind: NodeKind,
    pub(crate) anchor: Option<String>,
    pub(crate) tag: Option<String>,
}

impl YamlNode {
    /// Creates a node without anchor or tag.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            anchor: None,
            tag: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Option<String>) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns the anchor name if this node has one.
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Returns the explicit tag, normalized to its shorthand (`!!str`, `!local`).
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, NodeKind::Sequence(_))
    }

    /// Returns the scalar payload, if this is a scalar node.
    pub fn as_scalar(&self) -> Option<&YamlScalar> {
        match &self.kind {
            NodeKind::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable name of the node kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Scalar(_) => "scalar",
            NodeKind::Sequence(_) => "sequence",
            NodeKind::Mapping(_) => "mapping",
            NodeKind::Alias(_) => "alias",
        }
    }
}
