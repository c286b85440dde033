//! Abstract syntax tree types for YAMLPath expressions.

use std::fmt::{self, Write};

use regex::Regex;

use crate::document::node::ScalarValue;
use crate::document::path::escape_key;

/// A segment in a YAMLPath expression.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Root node ($)
    Root,
    /// Named child (.property or ['property'])
    Child(String),
    /// Wildcard (* or [*]) - all children
    Wildcard,
    /// Sequence index ([0], [-1])
    Index(isize),
    /// Sequence slice ([start:end:step]); an omitted step means 1 and is
    /// rendered without one
    Slice(Option<isize>, Option<isize>, Option<isize>),
    /// Recursive descent (..): the node itself and all of its descendants
    RecursiveDescent,
    /// Filter ([?(...)]) over the children of each candidate
    Filter(Predicate),
    /// Union ([a, b] or `$.a, $.b`); each alternative is a segment list
    /// applied to the same incoming candidates
    Union(Vec<Vec<PathSegment>>),
}

impl PathSegment {
    /// Text of this segment inside a bracket, if it is a simple selector.
    fn selector(&self) -> Option<String> {
        match self {
            PathSegment::Child(name) => Some(format!("'{}'", escape_key(name))),
            PathSegment::Wildcard => Some("*".to_string()),
            PathSegment::Index(i) => Some(i.to_string()),
            PathSegment::Slice(start, end, step) => {
                let bound = |i: &Option<isize>| i.map(|i| i.to_string()).unwrap_or_default();
                Some(match step {
                    Some(step) => format!("{}:{}:{}", bound(start), bound(end), step),
                    None => format!("{}:{}", bound(start), bound(end)),
                })
            }
            PathSegment::Filter(predicate) => Some(format!("?({})", predicate)),
            _ => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Root => f.write_char('$'),
            PathSegment::RecursiveDescent => f.write_str(".."),
            PathSegment::Union(alternatives) => {
                let selectors: Option<Vec<String>> = alternatives
                    .iter()
                    .map(|alt| match alt.as_slice() {
                        [single] => single.selector(),
                        _ => None,
                    })
                    .collect();
                match selectors {
                    Some(selectors) => write!(f, "[{}]", selectors.join(", ")),
                    None => {
                        let paths: Vec<String> = alternatives
                            .iter()
                            .map(|alt| format!("${}", display_segments(alt)))
                            .collect();
                        f.write_str(&paths.join(", "))
                    }
                }
            }
            other => match other.selector() {
                Some(text) => write!(f, "[{}]", text),
                None => Ok(()),
            },
        }
    }
}

fn display_segments(segments: &[PathSegment]) -> String {
    segments.iter().map(|s| s.to_string()).collect::<Vec<String>>().join("")
}

/// A complete YAMLPath expression.
#[derive(Debug, Clone, PartialEq)]
pub struct YamlPath {
    /// Segments that make up the path.
    pub segments: Vec<PathSegment>,
}

impl YamlPath {
    /// Creates a new YAMLPath with the given segments.
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

impl fmt::Display for YamlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segments.as_slice() {
            [PathSegment::Root, PathSegment::Union(alts)]
                if alts.iter().any(|alt| alt.len() != 1) =>
            {
                // Top-level union: every alternative is a path of its own.
                write!(f, "{}", self.segments[1])
            }
            [PathSegment::Root, rest @ ..] => write!(f, "${}", display_segments(rest)),
            segments => write!(f, "${}", display_segments(segments)),
        }
    }
}

/// A boolean expression evaluated against one child inside a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Or(Box<Predicate>, Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    /// A bare operand: true when a path reaches at least one node, or when
    /// a literal is truthy
    Exists(Operand),
    Compare(Operand, Comparator, Operand),
    /// Regular-expression match (`@.name =~ /^a/`)
    Matches(Operand, Pattern),
}

impl Predicate {
    fn precedence(&self) -> u8 {
        match self {
            Predicate::Or(..) => 1,
            Predicate::And(..) => 2,
            _ => 3,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Or(left, right) => {
                left.write_operand(f, 1)?;
                f.write_str(" || ")?;
                right.write_operand(f, 2)
            }
            Predicate::And(left, right) => {
                left.write_operand(f, 2)?;
                f.write_str(" && ")?;
                right.write_operand(f, 3)
            }
            Predicate::Not(inner) => match inner.as_ref() {
                Predicate::Exists(_) | Predicate::Not(_) => write!(f, "!{}", inner),
                _ => write!(f, "!({})", inner),
            },
            Predicate::Exists(operand) => write!(f, "{}", operand),
            Predicate::Compare(left, op, right) => write!(f, "{} {} {}", left, op, right),
            Predicate::Matches(operand, pattern) => write!(f, "{} =~ {}", operand, pattern),
        }
    }
}

/// One side of a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Path relative to the child under test (`@`, `@.price`)
    Current(Vec<PathSegment>),
    /// Path from the document root (`$.limit`)
    Root(Vec<PathSegment>),
    Literal(ScalarValue),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Current(segments) => write!(f, "@{}", display_segments(segments)),
            Operand::Root(segments) => write!(f, "${}", display_segments(segments)),
            Operand::Literal(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Eq => f.write_str("=="),
            Comparator::Ne => f.write_str("!="),
            Comparator::Lt => f.write_str("<"),
            Comparator::Le => f.write_str("<="),
            Comparator::Gt => f.write_str(">"),
            Comparator::Ge => f.write_str(">="),
        }
    }
}

/// A compiled regular expression used by `=~`.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.as_str().replace('/', "\\/"))
    }
}
