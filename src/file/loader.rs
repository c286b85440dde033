//! YAML input loading.
//!
//! This module reads YAML text from a file or from stdin, transparently
//! decompressing gzip input, and parses it into [`Document`]s.
//!
//! Gzip input is recognised by a `.gz` file extension, or for stdin by the
//! gzip magic bytes (`0x1f 0x8b`). An optional byte limit guards against
//! unexpectedly large inputs; it applies to both the raw and the
//! decompressed size.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tracing::debug;

use crate::document::Document;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reads the input named on the command line: a path, or stdin for `None`
/// and `-`.
pub fn read_input(file: Option<&str>, max_bytes: Option<u64>) -> Result<String> {
    match file {
        None | Some("-") => read_stdin(max_bytes),
        Some(path) => read_file(path, max_bytes),
    }
}

/// Reads and parses every document of the input named on the command line.
///
/// # Errors
///
/// This function will return an error if:
/// - The input cannot be read or decompressed
/// - The input is larger than `max_bytes`
/// - The input is not valid UTF-8 or not valid YAML
pub fn load_documents(file: Option<&str>, max_bytes: Option<u64>) -> Result<Vec<Document>> {
    let content = read_input(file, max_bytes)?;
    Document::parse_all(&content).context("Failed to parse YAML")
}

/// Loads and parses a YAML file from the filesystem.
///
/// # Examples
///
/// ```no_run
/// use yt::file::loader::load_yaml_file;
///
/// let documents = load_yaml_file("config.yaml", None).unwrap();
/// println!("{} document(s)", documents.len());
/// ```
pub fn load_yaml_file<P: AsRef<Path>>(path: P, max_bytes: Option<u64>) -> Result<Vec<Document>> {
    let content = read_file(path, max_bytes)?;
    Document::parse_all(&content).context("Failed to parse YAML")
}

/// Reads a file, decompressing it if its name ends in `.gz`.
pub fn read_file<P: AsRef<Path>>(path: P, max_bytes: Option<u64>) -> Result<String> {
    let path_ref = path.as_ref();

    // Check if file is gzipped
    let is_gzipped = path_ref
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let file = fs::File::open(path_ref)
        .with_context(|| format!("Failed to open {}", path_ref.display()))?;
    let bytes = read_limited(file, max_bytes)
        .with_context(|| format!("Failed to read {}", path_ref.display()))?;
    debug!(path = %path_ref.display(), bytes = bytes.len(), gzip = is_gzipped, "read input file");

    let bytes = if is_gzipped {
        decompress_gzip_bytes(&bytes, max_bytes)
            .context("Failed to decompress gzipped file - file may be corrupted")?
    } else {
        bytes
    };
    String::from_utf8(bytes).context("Invalid UTF-8 in input file")
}

/// Reads standard input until EOF, decompressing it if it is gzip data.
pub fn read_stdin(max_bytes: Option<u64>) -> Result<String> {
    read_from(io::stdin().lock(), max_bytes).context("Failed to read from stdin")
}

/// Reads all of `reader`, sniffing for gzip data.
pub fn read_from<R: Read>(reader: R, max_bytes: Option<u64>) -> Result<String> {
    let mut bytes = read_limited(reader, max_bytes)?;
    debug!(bytes = bytes.len(), "read input stream");

    // Check for gzip magic bytes (0x1f 0x8b)
    if bytes.starts_with(&GZIP_MAGIC) {
        bytes = decompress_gzip_bytes(&bytes, max_bytes).context("Failed to decompress gzipped input")?;
    }
    String::from_utf8(bytes).context("Invalid UTF-8 in input")
}

/// Reads to EOF, failing once more than `max_bytes` bytes have been seen.
fn read_limited<R: Read>(reader: R, max_bytes: Option<u64>) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match max_bytes {
        Some(limit) => {
            reader
                .take(limit.saturating_add(1))
                .read_to_end(&mut buffer)?;
            if buffer.len() as u64 > limit {
                bail!("input exceeds the limit of {} bytes", limit);
            }
        }
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut buffer)?;
        }
    }
    Ok(buffer)
}

/// Decompresses gzip-encoded bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid gzip data or the decompressed
/// size exceeds `max_bytes`.
fn decompress_gzip_bytes(bytes: &[u8], max_bytes: Option<u64>) -> Result<Vec<u8>> {
    let decompressed = read_limited(GzDecoder::new(bytes), max_bytes)?;
    debug!(compressed = bytes.len(), decompressed = decompressed.len(), "decompressed gzip input");
    Ok(decompressed)
}
