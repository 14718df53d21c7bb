//! Source file loading and transitive include resolution.
//!
//! This crate turns an entry source file into a content-addressed bundle: the
//! [`IncludeResolver`] follows import directives, keys every file by the
//! digest of its bytes, rewrites directives to point at those keys, and
//! records the object names each file declares. Scanning is lexical (see
//! [`scan`]), not a real parse of the language grammar.

#![warn(missing_docs)]

pub mod error;
pub mod include_map;
pub mod resolver;
pub mod scan;
pub mod source_file;

pub use error::ResolveError;
pub use include_map::{IncludeMap, IncludedFile, ResolvedBundle, SourceNames};
pub use resolver::IncludeResolver;
pub use source_file::SourceFile;
