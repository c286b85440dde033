//! Configuration system for yt.
//!
//! This module provides the configuration structure for yt with sensible
//! defaults and support for serialization/deserialization via serde.
//! Configuration is loaded from a TOML file and then overridden by
//! command-line arguments.
//!
//! # Example
//!
//! ```
//! use yt::config::Config;
//!
//! // Use default configuration
//! let config = Config::default();
//! assert_eq!(config.indent_size, 2);
//! assert!(config.validate_output);
//!
//! // Create custom configuration
//! let custom = Config {
//!     indent_size: 4,
//!     max_depth: Some(8),
//!     ..Config::default()
//! };
//! assert_eq!(custom.max_depth, Some(8));
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Configuration for the yt application.
///
/// # Fields
///
/// * `indent_size` - Number of spaces per indentation level in output (default: 2)
/// * `verbose` - Log debug information to stderr (default: false)
/// * `max_depth` - How deep a recursive descent may go (default: unlimited)
/// * `max_input_bytes` - Refuse inputs larger than this (default: unlimited)
/// * `all_documents` - Query every document of a multi-document stream (default: false)
/// * `validate_output` - Re-parse every projected match (default: true)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Number of spaces per indentation level
    #[serde(default = "default_indent_size")]
    pub indent_size: usize,

    /// Log debug information to stderr
    #[serde(default)]
    pub verbose: bool,

    /// Maximum depth below its start that a recursive descent visits
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Maximum input size in bytes, before and after decompression
    #[serde(default)]
    pub max_input_bytes: Option<u64>,

    /// Query every document of the input instead of only the first
    #[serde(default)]
    pub all_documents: bool,

    /// Check that every projected match parses back as YAML
    #[serde(default = "default_validate_output")]
    pub validate_output: bool,
}

/// Returns the default indentation size.
fn default_indent_size() -> usize {
    2
}

/// Returns the default for output validation.
fn default_validate_output() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            indent_size: default_indent_size(),
            verbose: false,
            max_depth: None,
            max_input_bytes: None,
            all_documents: false,
            validate_output: default_validate_output(),
        }
    }
}

impl Config {
    /// Returns the path to the config file.
    ///
    /// Uses `~/.config/yt/config.toml` on all platforms.
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|mut path| {
            path.push(".config");
            path.push("yt");
            path.push("config.toml");
            path
        })
    }

    /// Loads configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist or can't be read.
    pub fn load() -> Self {
        let config_path = match Self::config_path() {
            Some(path) => path,
            None => return Self::default(),
        };

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring malformed config file");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Loads configuration from an explicitly named file.
    ///
    /// Unlike [`Config::load`], a missing or malformed file is an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}
