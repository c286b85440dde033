//! Errors raised while loading a YAML document.

use yaml_rust2::scanner::ScanError;

/// The input text is not a well-formed YAML document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Rejected by the YAML scanner or parser.
    #[error("{message} at line {line} column {column}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
        /// Character offset into the input
        index: usize,
    },
    /// The same key appears twice in one mapping. The position is that of
    /// the second occurrence.
    #[error("mapping key '{key}' already defined in {path} at line {line} column {column}")]
    DuplicateKey {
        key: String,
        path: String,
        line: usize,
        column: usize,
        /// Character offset into the input
        index: usize,
    },
}

impl From<ScanError> for ParseError {
    fn from(err: ScanError) -> Self {
        let marker = err.marker();
        ParseError::Syntax {
            message: err.info().to_string(),
            line: marker.line(),
            column: marker.col(),
            index: marker.index(),
        }
    }
}
