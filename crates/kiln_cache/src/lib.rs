//! Content-addressed scratch cache for compile results.
//!
//! Every compile request owns one directory under the scratch root, named by
//! the request's content digest. The directory holds the materialized sources
//! handed to a local compiler and the serialized result of the compile.
//! Entries never go stale: a changed input is a different digest. The only
//! invalidation is [`ArtifactCache::clear`], which removes everything.

#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod error;

pub use artifact::{Artifact, ArtifactStore};
pub use cache::{ArtifactCache, CacheEntry};
pub use error::CacheError;
