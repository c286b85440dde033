//! yt, a YAML Tool: extract data from YAML documents with JSONPath-style
//! expressions.
//!
//! The pipeline is [`file::loader`] (bytes) → [`document`] (node arena) →
//! [`yamlpath`] (compile and evaluate) → [`projector`] (one YAML block per
//! match).

pub mod config;
pub mod document;
pub mod file;
pub mod projector;
pub mod yamlpath;
