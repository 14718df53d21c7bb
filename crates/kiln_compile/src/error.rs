//! Error types for each pipeline stage.
//!
//! A compile error reported by the compiler is not an error here: it is a
//! valid [`CompileResponse`](crate::CompileResponse) whose `error` field is
//! populated. These types cover the cases where the pipeline itself could not
//! produce a response.

use std::path::PathBuf;
use std::time::Duration;

use kiln_cache::CacheError;
use kiln_source::ResolveError;

/// Errors building a compile request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The entry file's extension does not name a supported language.
    #[error("unsupported source language for {path}")]
    UnsupportedLanguage {
        /// The entry file.
        path: PathBuf,
    },

    /// An include could not be resolved or read.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Why a local compiler run failed.
#[derive(Debug, thiserror::Error)]
pub enum InvocationFailure {
    /// The compiler executable does not exist.
    #[error("executable not found")]
    NotFound,

    /// The process could not be started or waited on.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The process ended with a status that is neither success nor a
    /// reported compile error.
    #[error("exited with {status}: {output}")]
    Exit {
        /// The exit status as reported by the OS.
        status: String,
        /// Combined output, for diagnosis.
        output: String,
    },

    /// The process did not finish in time and was killed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors sending a request to a compiler.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The local compiler could not be run to completion.
    #[error("compiler '{binary}' failed: {failure}")]
    CompilerInvocation {
        /// The compiler executable.
        binary: String,
        /// What went wrong.
        failure: InvocationFailure,
    },

    /// Sources could not be written to the scratch directory.
    #[error("failed to materialize sources at {path}: {source}")]
    Materialize {
        /// The file or directory being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The remote compilation service could not be reached or did not answer.
    #[error("remote compiler at {url} unavailable: {reason}")]
    RemoteUnavailable {
        /// The service endpoint.
        url: String,
        /// Description of the failure.
        reason: String,
    },

    /// The request could not be serialized for the remote service.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    pub(crate) fn invocation(binary: &str, failure: impl Into<InvocationFailure>) -> Self {
        DispatchError::CompilerInvocation {
            binary: binary.to_string(),
            failure: failure.into(),
        }
    }
}

/// Errors decoding compiler output.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The JSON part of the output is malformed. The warning text that
    /// preceded it is kept for diagnosis.
    #[error("failed to decode compiler output: {reason}{}", preceding_output(.warning))]
    Decode {
        /// Free-form text that preceded the JSON payload.
        warning: String,
        /// Description of the decode failure.
        reason: String,
    },
}

fn preceding_output(warning: &str) -> String {
    if warning.is_empty() {
        String::new()
    } else {
        format!("\ncompiler said:\n{warning}")
    }
}

/// Any failure of the end-to-end pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Building the request failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Running the compiler failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Compiler output could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The result could not be written to the cache.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
