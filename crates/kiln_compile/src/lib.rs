//! The Kiln compile pipeline.
//!
//! A compile runs in five steps:
//!
//! 1. [`RequestBuilder`] resolves the entry file's includes into a
//!    [`CompileRequest`].
//! 2. The request's digest is looked up in the [`ArtifactCache`](kiln_cache::ArtifactCache).
//! 3. On a miss, a [`Dispatcher`] runs the compiler, locally or remotely.
//! 4. [`ResponseParser`] turns the raw output into a [`CompileResponse`].
//! 5. Successful responses are written back to the cache.
//!
//! [`Pipeline`] strings these together.

#![warn(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod pipeline;
pub mod request;
pub mod response;

pub use dispatch::{Dispatcher, LocalDispatcher, RawOutput, RemoteDispatcher};
pub use error::{DispatchError, InvocationFailure, ParseError, PipelineError, RequestError};
pub use metadata::{parse_compiler_version, MetadataPolicy, StripRule};
pub use parser::{canonical_object_name, split_warning, ResponseParser, CONTRACTS_MARKER};
pub use pipeline::Pipeline;
pub use request::{create_request, CompileRequest, PreparedRequest, RequestBuilder};
pub use response::{CompileResponse, ResponseItem};
