//! Compilation through a remote service.

use std::time::Duration;

use reqwest::StatusCode;

use super::{Dispatcher, RawOutput};
use crate::error::DispatchError;
use crate::request::CompileRequest;

/// POSTs requests as JSON to a compilation service.
///
/// A 2xx reply carries the compiler's combined output. 422 means the service
/// ran the compiler and it rejected the source; the body holds the
/// diagnostics. Anything else, including a transport failure, is
/// [`DispatchError::RemoteUnavailable`].
#[derive(Debug, Clone)]
pub struct RemoteDispatcher {
    url: String,
    client: reqwest::blocking::Client,
}

impl RemoteDispatcher {
    /// Creates a dispatcher for `url` with a per-call timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DispatchError> {
        let url = url.into();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::RemoteUnavailable {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { url, client })
    }

    /// The service endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn unavailable(&self, reason: impl ToString) -> DispatchError {
        DispatchError::RemoteUnavailable {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Dispatcher for RemoteDispatcher {
    fn send(&self, request: &CompileRequest) -> Result<RawOutput, DispatchError> {
        let body = request.to_json()?;
        tracing::debug!(url = %self.url, bytes = body.len(), "posting compile request");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .map_err(|e| self.unavailable(e))?;

        let status = response.status();
        let text = response.text().map_err(|e| self.unavailable(e))?;
        tracing::debug!(%status, bytes = text.len(), "remote compiler replied");

        if status.is_success() {
            Ok(RawOutput::success(text))
        } else if status == StatusCode::UNPROCESSABLE_ENTITY {
            Ok(RawOutput::compile_error(text))
        } else {
            Err(self.unavailable(format!("unexpected status {status}")))
        }
    }

    fn describe(&self) -> String {
        format!("remote compiler at {}", self.url)
    }
}
