//! Error types for YAMLPath compilation.

/// Errors that can occur while compiling a YAMLPath expression.
///
/// Every variant carries the character offset of the first character the
/// parser could not accept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum YamlPathError {
    /// Unexpected token at a specific position.
    #[error("unexpected token '{found}' at position {position}, expected {expected}")]
    UnexpectedToken {
        position: usize,
        found: String,
        expected: String,
    },
    /// Unexpected end of input.
    #[error("unexpected end of expression at position {position}, expected {expected}")]
    UnexpectedEnd { position: usize, expected: String },
    /// Invalid syntax with description.
    #[error("invalid path syntax at position {position}: {message}")]
    InvalidSyntax { position: usize, message: String },
}

impl YamlPathError {
    /// Character offset the error points at.
    pub fn position(&self) -> usize {
        match self {
            YamlPathError::UnexpectedToken { position, .. }
            | YamlPathError::UnexpectedEnd { position, .. }
            | YamlPathError::InvalidSyntax { position, .. } => *position,
        }
    }
}
