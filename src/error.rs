//! Error types for the edgequake-docserve library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocServeError`] is **fatal**: the batch cannot be trusted any more
//!   (server unreachable, non-2xx on submission or result fetch, a response
//!   body that does not match the job protocol). Returned as
//!   `Err(DocServeError)` from the top-level `convert_*` functions, after
//!   every pipeline that was already dispatched has finished.
//!
//! * [`SkipReason`] is **non-fatal**: a single document could not be
//!   converted (poll retries exhausted, no payload, payload rejected by the
//!   validator) but the rest of the batch is fine. Its slot in the result
//!   list is left empty.
//!
//! A systemic failure such as broken auth surfaces as one error, not as
//! a long list of per-document skips.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-docserve library.
#[derive(Debug, Error)]
pub enum DocServeError {
    // ── Transport errors ──────────────────────────────────────────────────
    /// The request never produced an HTTP response (DNS, TCP, TLS...).
    #[error("Request to '{url}' failed: {reason}\nCheck that the Docling Serve instance is reachable.")]
    Transport { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s\nIncrease --timeout.")]
    Timeout { url: String, secs: u64 },

    /// Submission or result fetch answered with a non-2xx status code.
    #[error("HTTP {status} from '{url}'")]
    HttpStatus { url: String, status: u16 },

    // ── Protocol errors ───────────────────────────────────────────────────
    /// The response body is not the JSON shape the job protocol expects.
    #[error("Unexpected response from '{url}': {detail}")]
    Protocol { url: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a converted document to disk.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocServeError {
    /// True for errors raised before any HTTP status was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

/// Why a single document produced no converted output.
///
/// Stored in [`crate::output::SkippedInput`]; the batch carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SkipReason {
    /// The input had no path or no readable bytes; nothing was submitted.
    #[error("no readable input source")]
    NoInputPath,

    /// Status polls failed with a server error more often than allowed.
    #[error("status polling got HTTP {last_status} too many times ({failures} failures)")]
    PollRetriesExhausted { failures: u32, last_status: u16 },

    /// The server finished the job with `task_status = "failure"`.
    #[error("the server reported the conversion job as failed")]
    ServerReportedFailure,

    /// The result body had no `document.json_content`.
    #[error("no JSON document found in the result")]
    MissingResultPayload,

    /// The payload was rejected by the document validator.
    #[error("document validation failed: {0}")]
    ValidationFailed(String),
}

/// Diagnostic returned by a [`crate::pipeline::validate::DocumentValidator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// JSON-pointer-like location of the offending field (`$` for the root).
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display() {
        let e = DocServeError::HttpStatus {
            url: "http://docling:5001/v1alpha/convert/source/async".into(),
            status: 503,
        };
        let msg = e.to_string();
        assert!(msg.contains("503"), "got: {msg}");
        assert!(msg.contains("convert/source/async"), "got: {msg}");
    }

    #[test]
    fn timeout_display() {
        let e = DocServeError::Timeout {
            url: "http://docling:5001".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
        assert!(e.is_transport());
    }

    #[test]
    fn protocol_error_is_not_transport() {
        let e = DocServeError::Protocol {
            url: "http://x".into(),
            detail: "missing field `task_id`".into(),
        };
        assert!(!e.is_transport());
        assert!(e.to_string().contains("task_id"));
    }

    #[test]
    fn retries_exhausted_display() {
        let r = SkipReason::PollRetriesExhausted {
            failures: 6,
            last_status: 502,
        };
        let msg = r.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains('6'));
    }

    #[test]
    fn validation_error_display() {
        let e = ValidationError::new("$.version", "expected a string");
        assert_eq!(e.to_string(), "$.version: expected a string");
    }
}
