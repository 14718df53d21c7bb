//! Binary artifact storage under per-digest directories.
//!
//! Each artifact is written as a length-prefixed bincode header followed by
//! the raw payload. The header carries magic bytes, a format version, the
//! compiler version that produced the payload, and an XXH3 checksum used to
//! detect corruption on read.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use kiln_common::ContentDigest;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a Kiln cache artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"KILN";

/// Current artifact format version. Increment on breaking changes to
/// the header or payload format.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Distinguishes temporary files written concurrently by one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Header prepended to every cached artifact for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"KILN"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// Version of the compiler that produced the payload.
    pub compiler_version: String,

    /// XXH3-128 of the payload.
    pub checksum: u128,
}

/// A validated artifact read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Version of the compiler that produced the payload.
    pub compiler_version: String,
    /// The stored payload.
    pub payload: Vec<u8>,
}

/// Store for binary artifacts keyed by content digest.
///
/// Artifacts live at `<root>/<digest>/<name>`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a new artifact store rooted at the given directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory owned by the given digest.
    pub fn entry_dir(&self, digest: &ContentDigest) -> PathBuf {
        self.root.join(digest.to_hex())
    }

    /// Returns the file path for an artifact.
    pub fn artifact_path(&self, digest: &ContentDigest, name: &str) -> PathBuf {
        self.entry_dir(digest).join(name)
    }

    /// Writes an artifact and returns its path.
    ///
    /// The file is first written under a temporary name in the same directory
    /// and then renamed into place, so concurrent writers of the same digest
    /// never leave a torn file: the last rename wins.
    pub fn write_artifact(
        &self,
        digest: &ContentDigest,
        name: &str,
        data: &[u8],
        compiler_version: &str,
    ) -> Result<PathBuf, CacheError> {
        let dir = self.entry_dir(digest);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            compiler_version: compiler_version.to_string(),
            checksum: checksum(data),
        };
        let output = encode(&header, data)?;

        let path = dir.join(name);
        let tmp = dir.join(format!(
            ".{name}.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&tmp, &output).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }

    /// Reads an artifact, validating its header.
    ///
    /// Returns `None` if the file doesn't exist, the header is invalid,
    /// the format version doesn't match, or the checksum doesn't verify.
    pub fn read_artifact(&self, digest: &ContentDigest, name: &str) -> Option<Artifact> {
        let raw = std::fs::read(self.artifact_path(digest, name)).ok()?;

        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }

        let header: ArtifactHeader =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .ok()?
                .0;

        if header.magic != ARTIFACT_MAGIC || header.format_version != ARTIFACT_FORMAT_VERSION {
            return None;
        }

        let payload = &raw[4 + header_len..];
        if checksum(payload) != header.checksum {
            return None;
        }

        Some(Artifact {
            compiler_version: header.compiler_version,
            payload: payload.to_vec(),
        })
    }

    /// Removes everything under the root. Returns the number of entry
    /// directories that existed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries.filter_map(Result::ok).count(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(CacheError::Io {
                    path: self.root.clone(),
                    source: e,
                })
            }
        };
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(entries),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(CacheError::Io {
                path: self.root.clone(),
                source: e,
            }),
        }
    }
}

fn checksum(data: &[u8]) -> u128 {
    xxhash_rust::xxh3::xxh3_128(data)
}

/// Layout: 4-byte header length (little-endian) + header + payload.
fn encode(header: &ArtifactHeader, data: &[u8]) -> Result<Vec<u8>, CacheError> {
    let header_bytes = bincode::serde::encode_to_vec(header, bincode::config::standard())
        .map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(data);
    Ok(output)
}
