//! File I/O operations for YAML input.
//!
//! This module provides functionality to read YAML documents from disk or
//! stdin, with transparent gzip decompression and an optional size limit.

pub mod loader;
