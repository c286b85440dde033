//! Turning query matches back into YAML text.
//!
//! Each match is written as an independent YAML document ending in a
//! newline. A failure to write one match never affects the others:
//! [`Projector::project_all`] returns one outcome per match.
//!
//! # Example
//!
//! ```
//! use yt::document::Document;
//! use yt::projector::Projector;
//! use yt::yamlpath;
//!
//! let doc = Document::parse("servers:\n  - name: web\n    ports: [80, 443]\n").unwrap();
//! let matches = yamlpath::find(&doc, "$.servers[0]").unwrap();
//! let projector = Projector::new(&doc);
//! let text = projector.project(matches.get(0).unwrap()).unwrap();
//! assert_eq!(text, "name: web\nports:\n  - 80\n  - 443\n");
//! ```

mod emitter;

use tracing::debug;

use crate::document::tree::Document;
use crate::document::NodeId;
use crate::yamlpath::{Match, MatchSet};
use emitter::Emitter;

/// A match that could not be written out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The node is not part of the document.
    #[error("node {node} is not part of the document")]
    UnknownNode { node: NodeId },
    /// An alias points at a node that is not part of the document.
    #[error("alias {alias} refers to node {target}, which is not part of the document")]
    UnresolvedAlias { alias: NodeId, target: NodeId },
    /// An alias leads back into itself with no anchor to refer to.
    #[error("alias {alias} forms a cycle that cannot be written")]
    RecursiveAlias { alias: NodeId },
    /// The generated text did not parse back as YAML.
    #[error("projected output is not valid YAML: {message}")]
    InvalidOutput { message: String },
}

/// Writes matched nodes of one document as standalone YAML.
pub struct Projector<'a> {
    doc: &'a Document,
    indent: usize,
    validate: bool,
}

impl<'a> Projector<'a> {
    /// Creates a projector with two-space indentation and output validation.
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            indent: 2,
            validate: true,
        }
    }

    /// Sets the number of spaces per indentation level (at least 1).
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent.max(1);
        self
    }

    /// Enables or disables re-parsing every projection with `serde_yaml`.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Serializes one match.
    pub fn project(&self, m: &Match) -> Result<String, EncodingError> {
        self.project_node(m.node)
    }

    /// Serializes the subtree at `id`.
    pub fn project_node(&self, id: NodeId) -> Result<String, EncodingError> {
        let text = Emitter::new(self.doc, self.indent).emit(id)?;
        if self.validate {
            serde_yaml::from_str::<serde_yaml::Value>(&text).map_err(|err| {
                EncodingError::InvalidOutput {
                    message: err.to_string(),
                }
            })?;
        }
        debug!(node = %id, bytes = text.len(), "projected node");
        Ok(text)
    }

    /// Serializes every match, keeping going past failures.
    pub fn project_all(&self, matches: &MatchSet) -> Vec<Result<String, EncodingError>> {
        matches.iter().map(|m| self.project(m)).collect()
    }
}
