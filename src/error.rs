//! Errors reported by the Layla client.
//!
//! Every failure the library can produce is a [`LaylaError`]. Callers that
//! only care about the category of a failure can branch on
//! [`LaylaError::kind`], which returns a payload-free [`ErrorKind`].

use std::{fmt, path::PathBuf, time::Duration};

use reqwest::StatusCode;
use thiserror::Error;

/// A `Result` specialized to [`LaylaError`].
pub type Result<T, E = LaylaError> = std::result::Result<T, E>;

/// An error raised by the transport, the document sources or the job
/// lifecycle coordinator.
#[derive(Debug, Error)]
pub enum LaylaError {
    /// The API key was missing (401) or invalid (403).
    #[error("authentication failed (status {status}): {message}")]
    Authentication { status: StatusCode, message: String },

    /// The service does not know the job.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The request never completed, or the service reported a backend as
    /// unavailable.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The service refused a submission as malformed.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// The job did not reach a terminal state in time.
    #[error("job {job_id} did not finish within {}s", timeout.as_secs_f64())]
    Timeout { job_id: String, timeout: Duration },

    /// The service reported that the job failed.
    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// The service sent something that breaks the protocol.
    #[error("protocol violation: {message}")]
    ProtocolViolation { message: String },

    /// A local document could not be found.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A local document exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The service answered with a status code we have no mapping for.
    #[error("unexpected response (status {status}): {body}")]
    UnexpectedResponse { status: StatusCode, body: String },

    /// Caller-supplied options were rejected before any request was made.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Polling was stopped through a cancellation token.
    #[error("polling for job {job_id} was cancelled")]
    Cancelled { job_id: String },
}

impl LaylaError {
    /// Build a [`LaylaError::Network`] from a `reqwest` failure.
    pub(crate) fn network(message: impl Into<String>, source: reqwest::Error) -> Self {
        LaylaError::Network {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Build a [`LaylaError::ProtocolViolation`].
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        LaylaError::ProtocolViolation {
            message: message.into(),
        }
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LaylaError::Authentication { .. } => ErrorKind::Authentication,
            LaylaError::NotFound { .. } => ErrorKind::NotFound,
            LaylaError::Network { .. } => ErrorKind::Network,
            LaylaError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            LaylaError::Timeout { .. } => ErrorKind::Timeout,
            LaylaError::JobFailed { .. } => ErrorKind::JobFailed,
            LaylaError::ProtocolViolation { .. } => ErrorKind::ProtocolViolation,
            LaylaError::FileNotFound { .. } => ErrorKind::FileNotFound,
            LaylaError::DocumentRead { .. } => ErrorKind::DocumentRead,
            LaylaError::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
            LaylaError::InvalidOptions(_) => ErrorKind::InvalidOptions,
            LaylaError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}

/// The category of a [`LaylaError`], without any payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    NotFound,
    Network,
    InvalidRequest,
    Timeout,
    JobFailed,
    ProtocolViolation,
    FileNotFound,
    DocumentRead,
    UnexpectedResponse,
    InvalidOptions,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::NotFound => "not found",
            ErrorKind::Network => "network",
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::Timeout => "timeout",
            ErrorKind::JobFailed => "job failed",
            ErrorKind::ProtocolViolation => "protocol violation",
            ErrorKind::FileNotFound => "file not found",
            ErrorKind::DocumentRead => "document read",
            ErrorKind::UnexpectedResponse => "unexpected response",
            ErrorKind::InvalidOptions => "invalid options",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
