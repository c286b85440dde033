//! Normalized locations of nodes within a document.

use std::fmt;

/// One step from a collection to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// A mapping value, addressed by its key's text
    Key(String),
    /// A sequence element
    Index(usize),
}

/// The route taken from the document root to a node, e.g. `$['store']['book'][0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    steps: Vec<PathStep>,
}

impl NodePath {
    /// The path of the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path extended by one step.
    pub fn child(&self, step: PathStep) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self { steps }
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn depth(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for step in &self.steps {
            match step {
                PathStep::Key(key) => write!(f, "['{}']", escape_key(key))?,
                PathStep::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

/// Escapes a key for use inside a single-quoted bracket selector.
pub(crate) fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}
