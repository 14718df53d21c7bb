//! A source file read from disk, identified by its content digest.

use kiln_common::{ContentDigest, Language};
use std::path::{Path, PathBuf};

use crate::error::ResolveError;

/// A source file loaded for bundling.
///
/// Immutable once read. The `digest` of the raw bytes, not the path, is the
/// file's identity for bundling and caching.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// The filesystem path the file was read from.
    pub path: PathBuf,
    /// The raw file content.
    pub bytes: Vec<u8>,
    /// SHA-256 digest of `bytes`.
    pub digest: ContentDigest,
}

impl SourceFile {
    /// Creates a `SourceFile` from in-memory content (useful for tests).
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let digest = ContentDigest::from_bytes(&bytes);
        Self {
            path: path.into(),
            bytes,
            digest,
        }
    }

    /// Reads a source file from the filesystem.
    pub fn read(path: &Path) -> Result<Self, ResolveError> {
        let bytes = std::fs::read(path).map_err(|e| ResolveError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::new(path, bytes))
    }

    /// Returns the content as text, failing if it is not valid UTF-8.
    pub fn text(&self) -> Result<&str, ResolveError> {
        std::str::from_utf8(&self.bytes).map_err(|_| ResolveError::Encoding {
            path: self.path.clone(),
        })
    }

    /// The include key for this file: its digest as a file name.
    pub fn include_key(&self, language: Language) -> String {
        self.digest.file_name(language)
    }
}
