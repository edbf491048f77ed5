//! Data exchanged with the OCR service.
//!
//! Status payloads arrive with a free-form `status` string. We map them into
//! [`JobState`] as soon as they are decoded, so nothing past this module ever
//! branches on raw status strings.

use std::fmt;

use crate::prelude::*;

/// The service's answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Server-issued handle for the job.
    pub job_id: String,

    /// Status at submission time, normally `"processing"`.
    pub status: String,

    /// Model that will process the job.
    pub model: String,

    /// Human-readable message.
    pub message: String,

    /// Only present if the service finished the job synchronously.
    #[serde(default, alias = "markdown")]
    pub result: Option<String>,
}

/// A status snapshot exactly as the service sends it.
///
/// [`Transport`](crate::Transport) implementations decode into this and
/// convert with [`JobStatus::try_from`], which rejects payloads that break the
/// protocol.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawJobStatus {
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default, alias = "markdown")]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Where a job is, with the data that belongs to that state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    /// Still running. `progress` is whatever the service reports, for example
    /// `"3/10"`.
    Processing { progress: Option<String> },

    /// Finished with OCR output.
    Completed { result: String },

    /// Finished without output.
    Failed { error: String },
}

impl JobState {
    /// Message used when a failed job carries no error text.
    pub const UNKNOWN_ERROR: &'static str = "Unknown error";

    /// The wire tag for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Processing { .. } => "processing",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }

    /// Is this a state the job can never leave?
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Processing { .. })
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub job_id: String,
    pub model: Option<String>,
    #[serde(flatten)]
    pub state: JobState,
}

impl JobStatus {
    /// The wire tag of [`JobStatus::state`].
    pub fn status_str(&self) -> &'static str {
        self.state.as_str()
    }
}

impl TryFrom<RawJobStatus> for JobStatus {
    type Error = LaylaError;

    fn try_from(raw: RawJobStatus) -> Result<Self> {
        let state = match raw.status.as_str() {
            "processing" => JobState::Processing {
                progress: raw.progress,
            },
            "completed" => match raw.result {
                Some(result) => JobState::Completed { result },
                None => {
                    return Err(LaylaError::protocol(format!(
                        "job {} completed but no result was returned",
                        raw.job_id
                    )));
                }
            },
            "failed" => JobState::Failed {
                error: raw
                    .error
                    .unwrap_or_else(|| JobState::UNKNOWN_ERROR.to_owned()),
            },
            other => {
                return Err(LaylaError::protocol(format!(
                    "unknown job status: {other}"
                )));
            }
        };
        Ok(JobStatus {
            job_id: raw.job_id,
            model: raw.model,
            state,
        })
    }
}

/// Health snapshot of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status, `"ok"` when healthy.
    pub status: String,

    /// Status of the job queue backend (Redis), `"connected"` when healthy.
    #[serde(rename = "redis")]
    pub queue_backend_status: String,

    /// Number of jobs waiting, if the service reports it.
    #[serde(default)]
    pub queue_size: Option<u64>,
}

impl HealthStatus {
    /// Is the service up with its queue backend connected?
    pub fn is_healthy(&self) -> bool {
        self.status == "ok" && self.queue_backend_status == "connected"
    }
}

/// Confirmation that the service removed a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReceipt {
    pub job_id: String,
    pub message: String,
}

/// The outcome of a job that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    pub job_id: String,
    pub model: String,
    /// Always the terminal tag, `"completed"`.
    pub status: String,
    pub message: String,
    /// OCR output, usually markdown.
    pub result: String,
}

impl JobResult {
    /// Combine a submission with the content its job produced.
    pub(crate) fn from_submission(submission: &JobSubmission, result: String) -> Self {
        Self {
            job_id: submission.job_id.clone(),
            model: submission.model.clone(),
            status: "completed".to_owned(),
            message: submission.message.clone(),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    fn decode(value: serde_json::Value) -> Result<JobStatus> {
        let raw: RawJobStatus = serde_json::from_value(value).unwrap();
        JobStatus::try_from(raw)
    }

    #[test]
    fn processing_keeps_progress() {
        let status = decode(json!({
            "job_id": "j1",
            "status": "processing",
            "progress": "2/10",
        }))
        .unwrap();
        assert_eq!(
            status.state,
            JobState::Processing {
                progress: Some("2/10".to_owned())
            }
        );
        assert!(!status.state.is_terminal());
    }

    #[test]
    fn completed_accepts_legacy_markdown_field() {
        let status = decode(json!({
            "job_id": "j1",
            "status": "completed",
            "markdown": "# Title",
        }))
        .unwrap();
        assert_eq!(
            status.state,
            JobState::Completed {
                result: "# Title".to_owned()
            }
        );
        assert_eq!(status.status_str(), "completed");
    }

    #[test]
    fn completed_without_result_is_a_protocol_violation() {
        let err = decode(json!({"job_id": "j1", "status": "completed"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn failed_defaults_to_unknown_error() {
        let status = decode(json!({"job_id": "j1", "status": "failed"})).unwrap();
        assert_eq!(
            status.state,
            JobState::Failed {
                error: "Unknown error".to_owned()
            }
        );
    }

    #[test]
    fn unknown_status_is_a_protocol_violation() {
        let err = decode(json!({"job_id": "j1", "status": "queued"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert!(err.to_string().contains("unknown job status: queued"));
    }

    #[test]
    fn health_status_parses_queue_size() {
        let health: HealthStatus = serde_json::from_value(json!({
            "status": "ok",
            "redis": "connected",
            "queue_size": 3,
        }))
        .unwrap();
        assert_eq!(health.queue_size, Some(3));
        assert_eq!(health.queue_backend_status, "connected");
        assert!(health.is_healthy());
    }

    #[test]
    fn status_serializes_with_flat_state() {
        let status = JobStatus {
            job_id: "j1".to_owned(),
            model: None,
            state: JobState::Failed {
                error: "bad scan".to_owned(),
            },
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({
                "job_id": "j1",
                "model": null,
                "status": "failed",
                "error": "bad scan",
            })
        );
    }
}
