use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::loader::TransportCause;

/// Failures raised by the browser engine while a session is in use.
///
/// These never cross the job boundary on their own: the orchestrator folds
/// each one into exactly one [`JobError`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("DevTools protocol error: {0}")]
    Protocol(String),

    #[error("Browser returned an empty PDF")]
    EmptyOutput,

    #[error("Browser session is already closed")]
    Closed,
}

impl EngineError {
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        EngineError::Timeout { operation, after }
    }
}

/// Terminal failure class of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "camelCase")]
pub enum JobErrorKind {
    BadRequest,
    LaunchFailure,
    Transport,
    RemoteStatus(Option<u16>),
    ExportFailure,
}

impl JobErrorKind {
    /// HTTP status an HTTP front end should answer with for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            JobErrorKind::BadRequest => 400,
            JobErrorKind::Transport => 500,
            JobErrorKind::RemoteStatus(Some(code)) if (400..=599).contains(code) => *code,
            JobErrorKind::RemoteStatus(_) => 400,
            JobErrorKind::LaunchFailure | JobErrorKind::ExportFailure => 500,
        }
    }
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobErrorKind::BadRequest => f.write_str("bad request"),
            JobErrorKind::LaunchFailure => f.write_str("launch failure"),
            JobErrorKind::Transport => f.write_str("transport error"),
            JobErrorKind::RemoteStatus(Some(code)) => write!(f, "remote status {code}"),
            JobErrorKind::RemoteStatus(None) => f.write_str("remote status unknown"),
            JobErrorKind::ExportFailure => f.write_str("export failure"),
        }
    }
}

/// The single error type returned by a render job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: JobErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(JobErrorKind::BadRequest, message)
    }

    pub fn launch(err: EngineError) -> Self {
        Self::new(JobErrorKind::LaunchFailure, err.to_string())
    }

    pub fn transport(cause: &TransportCause) -> Self {
        Self::new(JobErrorKind::Transport, cause.to_string())
    }

    pub fn remote_status(status: u16) -> Self {
        Self::new(
            JobErrorKind::RemoteStatus(Some(status)),
            format!("Remote page answered with HTTP {status}"),
        )
    }

    pub fn export(err: EngineError) -> Self {
        Self::new(JobErrorKind::ExportFailure, err.to_string())
    }

    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }
}

/// Crate-level error for configuration, IO and job failures surfaced by the CLI.
#[derive(Debug, Error)]
pub enum PressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render failed ({0})")]
    Job(#[from] JobError),
}

impl PressError {
    pub fn config(message: impl Into<String>) -> Self {
        PressError::Config(message.into())
    }

    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            PressError::Io(e) => ErrorPayload::new(
                ErrorCategory::Config,
                e.to_string(),
                "Check input/output paths and permissions.",
            ),
            PressError::Serialization(e) => ErrorPayload::new(
                ErrorCategory::Request,
                e.to_string(),
                "Check that the options file is a JSON object (e.g., {\"format\":\"Letter\"}).",
            ),
            PressError::Config(msg) => {
                let lower = msg.to_ascii_lowercase();
                if lower.contains("timeout") {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Use positive humantime durations in the config file (e.g., navigation = \"60s\").",
                    )
                } else {
                    ErrorPayload::new(
                        ErrorCategory::Config,
                        msg.to_string(),
                        "Check flags/paths and the TOML config file.",
                    )
                }
            }
            PressError::Job(err) => err.to_payload(),
        }
    }
}

impl JobError {
    pub fn to_payload(&self) -> ErrorPayload {
        let (category, remediation) = match self.kind {
            JobErrorKind::BadRequest => (
                ErrorCategory::Request,
                "Provide exactly one source: either HTML content or an absolute URL.",
            ),
            JobErrorKind::Transport => (
                ErrorCategory::Network,
                "Check that the URL is reachable from this host (DNS, proxy, TLS) and loads within the navigation timeout.",
            ),
            JobErrorKind::RemoteStatus(_) => (
                ErrorCategory::Remote,
                "The target page answered with an error status; verify the URL and any required authentication.",
            ),
            JobErrorKind::LaunchFailure => (
                ErrorCategory::Engine,
                "Ensure Chromium is installed (or pass --chrome PATH) and the host has enough memory to start it.",
            ),
            JobErrorKind::ExportFailure => (
                ErrorCategory::Engine,
                "Try increasing the export timeout or simplifying the document; rerun with --verbose for details.",
            ),
        };
        let mut payload = ErrorPayload::new(category, self.message.clone(), remediation);
        payload.http_status = Some(self.http_status());
        payload
    }
}

pub type Result<T> = std::result::Result<T, PressError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Request,
    Config,
    Network,
    Remote,
    Engine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl ErrorPayload {
    pub fn new(category: ErrorCategory, message: String, remediation: impl Into<String>) -> Self {
        Self {
            category,
            message,
            remediation: Some(remediation.into()),
            http_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_follows_job_kind() {
        assert_eq!(JobErrorKind::BadRequest.http_status(), 400);
        assert_eq!(JobErrorKind::Transport.http_status(), 500);
        assert_eq!(JobErrorKind::LaunchFailure.http_status(), 500);
        assert_eq!(JobErrorKind::ExportFailure.http_status(), 500);
        assert_eq!(JobErrorKind::RemoteStatus(Some(404)).http_status(), 404);
        assert_eq!(JobErrorKind::RemoteStatus(Some(503)).http_status(), 503);
    }

    #[test]
    fn unknown_remote_status_falls_back_to_client_error() {
        assert_eq!(JobErrorKind::RemoteStatus(None).http_status(), 400);
        assert_eq!(JobErrorKind::RemoteStatus(Some(302)).http_status(), 400);
        assert_eq!(JobErrorKind::RemoteStatus(Some(999)).http_status(), 400);
    }

    #[test]
    fn job_payload_carries_category_and_status() {
        let payload = JobError::remote_status(404).to_payload();
        assert_eq!(payload.category, ErrorCategory::Remote);
        assert_eq!(payload.http_status, Some(404));
        assert!(payload.message.contains("404"));
    }

    #[test]
    fn launch_payload_mentions_chromium() {
        let err = JobError::launch(EngineError::Launch("no such file".to_string()));
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.contains("Chromium"),
            "expected chromium install hint, got: {remediation}"
        );
    }

    #[test]
    fn config_payload_includes_timeout_hint() {
        let err = PressError::config("navigation timeout must be positive");
        let remediation = err.to_payload().remediation.unwrap_or_default();
        assert!(
            remediation.contains("humantime"),
            "expected duration hint, got: {remediation}"
        );
    }

    #[test]
    fn job_kind_serializes_with_status() {
        let json = serde_json::to_string(&JobErrorKind::RemoteStatus(Some(410))).unwrap();
        assert_eq!(json, r#"{"kind":"remoteStatus","status":410}"#);
        let json = serde_json::to_string(&JobErrorKind::Transport).unwrap();
        assert_eq!(json, r#"{"kind":"transport"}"#);
    }
}
