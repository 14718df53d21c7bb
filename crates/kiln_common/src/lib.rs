//! Shared foundational types used across the Kiln compilation pipeline.
//!
//! This crate provides the content digest used to address source files and
//! compile requests, and the source language tag derived from file extensions.

#![warn(missing_docs)]

pub mod digest;
pub mod language;

pub use digest::{ContentDigest, ParseDigestError};
pub use language::Language;
