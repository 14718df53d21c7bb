//! Delivery of compile requests to a compiler.
//!
//! A [`Dispatcher`] takes a request and returns the compiler's raw output.
//! It does not interpret the output beyond telling a compile error apart
//! from a successful run; that is the [`ResponseParser`](crate::ResponseParser)'s job.

mod local;
mod remote;

pub use local::LocalDispatcher;
pub use remote::RemoteDispatcher;

use crate::error::DispatchError;
use crate::request::CompileRequest;

/// Unparsed compiler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    /// Everything the compiler printed, diagnostics first.
    pub text: String,
    /// The compiler ran and rejected the source; `text` holds its diagnostics.
    pub compile_failed: bool,
}

impl RawOutput {
    /// Output of a successful run.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            compile_failed: false,
        }
    }

    /// Diagnostics of a run that rejected the source.
    pub fn compile_error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            compile_failed: true,
        }
    }
}

/// Sends compile requests to a compiler.
pub trait Dispatcher: Send + Sync {
    /// Compiles `request` and returns the raw output.
    ///
    /// A source the compiler rejects is `Ok` with `compile_failed` set. `Err`
    /// means no compiler verdict was obtained.
    fn send(&self, request: &CompileRequest) -> Result<RawOutput, DispatchError>;

    /// Short description for logs, such as the binary name or endpoint.
    fn describe(&self) -> String;
}

impl<D: Dispatcher + ?Sized> Dispatcher for Box<D> {
    fn send(&self, request: &CompileRequest) -> Result<RawOutput, DispatchError> {
        (**self).send(request)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
