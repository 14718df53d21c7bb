//! Normalized compiler results.

use serde::{Deserialize, Serialize};

/// One compiled object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseItem {
    /// Canonical object name, with any qualifying path prefix removed.
    pub object_name: String,
    /// Hex bytecode with the trailing metadata removed.
    pub bytecode: String,
    /// The ABI as raw JSON text.
    pub abi: String,
}

/// The outcome of compiling one request.
///
/// A non-empty `error` means the compiler rejected the source; `objects` is
/// then empty. This is a successful pipeline run, not a pipeline failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResponse {
    /// Compiled objects in the compiler's document order.
    pub objects: Vec<ResponseItem>,
    /// Human-readable warnings that preceded the JSON payload.
    pub warning: String,
    /// Compiler version string, empty if unknown.
    pub version: String,
    /// Compiler diagnostics when compilation failed.
    pub error: String,
}

impl CompileResponse {
    /// A response for a source the compiler rejected.
    pub fn compile_error(diagnostics: impl Into<String>) -> Self {
        Self {
            error: diagnostics.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if the compiler rejected the source.
    pub fn is_compile_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Looks up an object by canonical name.
    pub fn object(&self, name: &str) -> Option<&ResponseItem> {
        self.objects.iter().find(|item| item.object_name == name)
    }
}
