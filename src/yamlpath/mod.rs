//! YAMLPath query parser and evaluator for structural YAML search.
//!
//! # Supported Syntax
//!
//! - `$` - Root node
//! - `.property` - Named property access (`[A-Za-z0-9_-]+`)
//! - `['property']` - Bracket notation for any other key
//! - `[index]` - Sequence index (supports negative indices)
//! - `[*]` or `.*` - All children (wildcard)
//! - `..property`, `..*` or `..[...]` - Recursive descent
//! - `[start:end:step]` - Sequence slicing
//! - `['a', 0, ?(...)]` - Union of bracket selectors
//! - `[?(@.price < 10 && @.tag =~ /^x/)]` - Filters
//! - `$.a, $.b` - Union of whole paths
//!
//! # Examples
//!
//! ```
//! use yt::document::Document;
//! use yt::yamlpath;
//!
//! let doc = Document::parse("store:\n  book:\n    - {title: A, price: 8}\n    - {title: B, price: 12}\n").unwrap();
//! let matches = yamlpath::find(&doc, "$.store.book[?(@.price < 10)].title").unwrap();
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches.get(0).unwrap().path.to_string(), "$['store']['book'][0]['title']");
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod parser;

pub use ast::{Comparator, Operand, PathSegment, Pattern, Predicate, YamlPath};
pub use error::YamlPathError;
pub use evaluator::{Evaluator, Match, MatchSet};
pub use parser::Parser;

use crate::document::Document;

/// Compiles `expr` and evaluates it against `doc`.
pub fn find(doc: &Document, expr: &str) -> Result<MatchSet, YamlPathError> {
    let path = Parser::parse(expr)?;
    Ok(Evaluator::new(doc).evaluate(&path))
}
