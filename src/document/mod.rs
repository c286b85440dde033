//! In-memory YAML documents.
//!
//! A [`Document`] is an arena of [`YamlNode`]s addressed by [`NodeId`]. It is
//! built once from YAML text by [`parser`] and never modified afterwards;
//! queries and the projector only read from it.

mod anchors;
pub mod error;
pub mod node;
pub mod parser;
pub mod path;
pub mod tree;

pub use error::ParseError;
pub use node::{NodeId, NodeKind, ScalarStyle, ScalarValue, YamlNode, YamlNumber, YamlScalar};
pub use path::{NodePath, PathStep};
pub use tree::Document;
