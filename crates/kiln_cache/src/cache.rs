//! High-level cache keyed by compile-request digest.
//!
//! `ArtifactCache` ties the artifact store to the compile pipeline: it
//! serializes results with bincode, hands out per-request scratch
//! directories, and implements the full invalidation.

use std::path::{Path, PathBuf};

use kiln_common::ContentDigest;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::artifact::ArtifactStore;
use crate::error::CacheError;

/// File name of the serialized result inside an entry directory.
const RESULT_FILE: &str = "result.bin";

/// Subdirectory of an entry directory holding materialized sources.
const SOURCES_SUBDIR: &str = "src";

/// A cached value together with the compiler version that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    /// The cached value.
    pub value: T,
    /// Version of the compiler that produced the value.
    pub compiler_version: String,
}

/// Cache of compile results under a scratch root.
///
/// Layout:
///
/// ```text
/// <root>/<request digest>/result.bin   cached result
/// <root>/<request digest>/src/         sources for the local compiler
/// ```
///
/// Distinct requests never share a directory, so concurrent compiles of
/// different bundles cannot collide. Concurrent compiles of the same bundle
/// both write byte-identical results and the last rename wins.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    store: ArtifactStore,
}

impl ArtifactCache {
    /// Creates a cache rooted at `scratch_root`. Nothing is created on disk
    /// until the first write.
    pub fn new(scratch_root: &Path) -> Self {
        Self {
            store: ArtifactStore::new(scratch_root),
        }
    }

    /// The scratch root.
    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Looks up the value cached for `digest`.
    ///
    /// Fail-safe: a missing, damaged, or undecodable entry is a miss.
    pub fn get<T: DeserializeOwned>(&self, digest: &ContentDigest) -> Option<T> {
        self.get_entry(digest).map(|entry| entry.value)
    }

    /// Looks up the value cached for `digest` along with its compiler version.
    pub fn get_entry<T: DeserializeOwned>(&self, digest: &ContentDigest) -> Option<CacheEntry<T>> {
        let artifact = self.store.read_artifact(digest, RESULT_FILE)?;
        match bincode::serde::decode_from_slice(&artifact.payload, bincode::config::standard()) {
            Ok((value, _)) => Some(CacheEntry {
                value,
                compiler_version: artifact.compiler_version,
            }),
            Err(e) => {
                tracing::debug!(%digest, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Stores `value` for `digest`, tagged with the compiler version.
    pub fn put<T: Serialize>(
        &self,
        digest: &ContentDigest,
        value: &T,
        compiler_version: &str,
    ) -> Result<(), CacheError> {
        let payload = bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
        let path = self
            .store
            .write_artifact(digest, RESULT_FILE, &payload, compiler_version)?;
        tracing::debug!(path = %path.display(), "cached result");
        Ok(())
    }

    /// Returns `true` if a valid entry exists for `digest`.
    pub fn contains(&self, digest: &ContentDigest) -> bool {
        self.store.read_artifact(digest, RESULT_FILE).is_some()
    }

    /// The directory where sources for `digest` are materialized.
    pub fn scratch_dir(&self, digest: &ContentDigest) -> PathBuf {
        self.store.entry_dir(digest).join(SOURCES_SUBDIR)
    }

    /// Removes every entry and every scratch directory under the root.
    ///
    /// Must not run concurrently with compiles that use the same root.
    /// Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let removed = self.store.clear()?;
        tracing::info!(root = %self.root().display(), removed, "cleared scratch cache");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        names: Vec<String>,
        warning: String,
    }

    fn sample() -> Sample {
        Sample {
            names: vec!["c".to_string(), "d".to_string()],
            warning: "careful".to_string(),
        }
    }

    fn make_cache() -> (tempfile::TempDir, ArtifactCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = ArtifactCache::new(&dir.path().join("scratch"));
        (dir, cache)
    }

    #[test]
    fn miss_on_empty_cache() {
        let (_dir, cache) = make_cache();
        let d = ContentDigest::from_bytes(b"request");
        assert!(cache.get::<Sample>(&d).is_none());
        assert!(!cache.contains(&d));
    }

    #[test]
    fn put_then_get() {
        let (_dir, cache) = make_cache();
        let d = ContentDigest::from_bytes(b"request");
        cache.put(&d, &sample(), "0.4.21").unwrap();

        assert_eq!(cache.get::<Sample>(&d), Some(sample()));
        let entry = cache.get_entry::<Sample>(&d).unwrap();
        assert_eq!(entry.compiler_version, "0.4.21");
    }

    #[test]
    fn distinct_digests_are_independent() {
        let (_dir, cache) = make_cache();
        let a = ContentDigest::from_bytes(b"a");
        let b = ContentDigest::from_bytes(b"b");
        cache.put(&a, &sample(), "v").unwrap();
        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert_ne!(cache.scratch_dir(&a), cache.scratch_dir(&b));
    }

    #[test]
    fn type_mismatch_is_a_miss() {
        let (_dir, cache) = make_cache();
        let d = ContentDigest::from_bytes(b"typed");
        cache.put(&d, &"just a string", "v").unwrap();
        assert!(cache.get::<Sample>(&d).is_none());
    }

    #[test]
    fn clear_invalidates_entries_and_scratch() {
        let (_dir, cache) = make_cache();
        let d = ContentDigest::from_bytes(b"request");
        cache.put(&d, &sample(), "v").unwrap();
        std::fs::create_dir_all(cache.scratch_dir(&d)).unwrap();
        std::fs::write(cache.scratch_dir(&d).join("x.sol"), "contract x {}").unwrap();

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.get::<Sample>(&d).is_none());
        assert!(!cache.scratch_dir(&d).exists());
    }

    #[test]
    fn scratch_dir_is_under_entry() {
        let (_dir, cache) = make_cache();
        let d = ContentDigest::from_bytes(b"request");
        let scratch = cache.scratch_dir(&d);
        assert!(scratch.starts_with(cache.root()));
        assert!(scratch.ends_with(format!("{}/src", d.to_hex())));
    }
}
