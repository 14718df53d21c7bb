//! Decoding of raw compiler output into a [`CompileResponse`].

use indexmap::IndexMap;
use serde::Deserialize;

use crate::dispatch::RawOutput;
use crate::error::ParseError;
use crate::metadata::{parse_compiler_version, MetadataPolicy};
use crate::response::{CompileResponse, ResponseItem};

/// Marks the start of the JSON payload in combined compiler output.
pub const CONTRACTS_MARKER: &str = "{\"contracts\":";

#[derive(Debug, Deserialize)]
struct CombinedOutput {
    contracts: IndexMap<String, CombinedContract>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CombinedContract {
    #[serde(default)]
    bin: String,
    #[serde(default)]
    abi: serde_json::Value,
}

/// Splits combined output into the leading warning text and the JSON payload.
///
/// Without a marker the whole (trimmed) text is the payload.
pub fn split_warning(output: &str) -> (&str, &str) {
    let output = output.trim();
    match output.find(CONTRACTS_MARKER) {
        Some(at) => (output[..at].trim(), &output[at..]),
        None => ("", output),
    }
}

/// Reduces a qualified object identifier such as `"dir/File.sol:Token"` to
/// the bare object name. Applying it twice gives the same result.
pub fn canonical_object_name(qualifier: &str) -> &str {
    qualifier.rsplit(':').next().unwrap_or(qualifier).trim()
}

/// Turns raw compiler output into normalized responses.
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    policy: MetadataPolicy,
    fallback_version: Option<String>,
}

impl ResponseParser {
    /// Creates a parser using the given strip policy.
    pub fn new(policy: MetadataPolicy) -> Self {
        Self {
            policy,
            fallback_version: None,
        }
    }

    /// Version assumed when the output does not report one.
    pub fn with_fallback_version(mut self, version: impl Into<String>) -> Self {
        self.fallback_version = Some(version.into());
        self
    }

    /// The version assumed when the output does not report one.
    pub fn fallback_version(&self) -> Option<&str> {
        self.fallback_version.as_deref()
    }

    /// Parses one dispatcher result.
    pub fn parse(&self, raw: &RawOutput) -> Result<CompileResponse, ParseError> {
        if raw.compile_failed {
            return Ok(CompileResponse::compile_error(raw.text.trim()));
        }
        self.parse_output(&raw.text)
    }

    /// Parses successful combined output.
    pub fn parse_output(&self, output: &str) -> Result<CompileResponse, ParseError> {
        let (warning, payload) = split_warning(output);
        let combined: CombinedOutput =
            serde_json::from_str(payload).map_err(|e| ParseError::Decode {
                warning: warning.to_string(),
                reason: e.to_string(),
            })?;

        let version = combined
            .version
            .or_else(|| self.fallback_version.clone())
            .unwrap_or_default();
        let parsed_version = parse_compiler_version(&version);
        if parsed_version.is_none() {
            tracing::debug!(version = %version, "compiler version unknown, using trailer length");
        }

        let objects = combined
            .contracts
            .into_iter()
            .map(|(qualifier, contract)| ResponseItem {
                object_name: canonical_object_name(&qualifier).to_string(),
                bytecode: self
                    .policy
                    .strip(parsed_version.as_ref(), contract.bin.trim())
                    .to_string(),
                abi: abi_text(contract.abi),
            })
            .collect();

        Ok(CompileResponse {
            objects,
            warning: warning.to_string(),
            version,
            error: String::new(),
        })
    }
}

/// Older compilers embed the ABI as a JSON string, newer ones inline it.
fn abi_text(abi: serde_json::Value) -> String {
    match abi {
        serde_json::Value::String(text) => text.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
