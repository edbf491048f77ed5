//! Talking to the OCR service over HTTP.
//!
//! [`Transport`] is the seam between the job coordinator and the network. The
//! production implementation is [`HttpTransport`]. Tests substitute their own.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url, multipart};
use serde::de::DeserializeOwned;

use crate::{
    config::Configuration,
    document::Document,
    models::LaylaModel,
    prelude::*,
    responses::{DeletionReceipt, HealthStatus, JobStatus, JobSubmission, RawJobStatus},
};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// How long a single HTTP request may take before we give up on it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The four remote calls the service offers.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Upload a document and start a job.
    async fn submit(&self, document: Document, model: LaylaModel) -> Result<JobSubmission>;

    /// Fetch the current state of a job.
    async fn status(&self, job_id: &str) -> Result<JobStatus>;

    /// Remove a job and its result from the service.
    async fn delete(&self, job_id: &str) -> Result<DeletionReceipt>;

    /// Check that the service and its queue backend are up.
    async fn health(&self) -> Result<HealthStatus>;
}

/// Which remote call we were making. Used in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Submit,
    Status,
    Delete,
    Health,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Submit => write!(f, "submit"),
            Operation::Status => write!(f, "status"),
            Operation::Delete => write!(f, "delete"),
            Operation::Health => write!(f, "health"),
        }
    }
}

/// [`Transport`] backed by `reqwest`. The underlying client pools
/// connections, so one instance should be reused for many calls.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport using [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new(config: &Configuration) -> Result<Self> {
        Self::with_request_timeout(config, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom per-request timeout.
    pub fn with_request_timeout(
        config: &Configuration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LaylaError::network("could not build HTTP client", e))?;
        Ok(Self {
            client,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
        })
    }

    /// The address every endpoint path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL. Each segment is percent-encoded, so a job ID
    /// can never escape its own path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        // `Url` silently drops these instead of encoding them.
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(LaylaError::InvalidRequest {
                message: format!("invalid job ID {bad:?}"),
            });
        }
        let invalid = || LaylaError::InvalidRequest {
            message: format!("invalid service URL {:?}", self.base_url),
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode a successful JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| LaylaError::network(format!("{operation} request failed"), e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            LaylaError::network(format!("could not read {operation} response"), e)
        })?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            debug!(%operation, %status, %body, "Service returned an error");
            return Err(error_for_status(operation, status, body));
        }
        trace!(%operation, body = %String::from_utf8_lossy(&body), "Service response");
        serde_json::from_slice(&body).map_err(|e| {
            LaylaError::protocol(format!("could not decode {operation} response: {e}"))
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip_all, fields(filename = %document.filename, model = %model))]
    async fn submit(&self, document: Document, model: LaylaModel) -> Result<JobSubmission> {
        let content_type = document.content_type();
        let part = multipart::Part::bytes(document.content)
            .file_name(document.filename)
            .mime_str(&content_type)
            .map_err(|e| LaylaError::InvalidRequest {
                message: format!("bad content type {content_type:?}: {e}"),
            })?;
        let form = multipart::Form::new().part("file", part);
        let request = self
            .client
            .post(self.endpoint(&["ocr"])?)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("model", model.as_str())])
            .multipart(form);
        self.send(Operation::Submit, request).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn status(&self, job_id: &str) -> Result<JobStatus> {
        let request = self
            .client
            .get(self.endpoint(&["status", job_id])?)
            .header(API_KEY_HEADER, &self.api_key);
        let raw: RawJobStatus = self.send(Operation::Status, request).await?;
        JobStatus::try_from(raw)
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete(&self, job_id: &str) -> Result<DeletionReceipt> {
        let request = self
            .client
            .delete(self.endpoint(&["job", job_id])?)
            .header(API_KEY_HEADER, &self.api_key);
        self.send(Operation::Delete, request).await
    }

    #[instrument(level = "debug", skip(self))]
    async fn health(&self) -> Result<HealthStatus> {
        // The health endpoint is public, so no API key.
        let health = async {
            let request = self.client.get(self.endpoint(&["health"])?);
            self.send::<HealthStatus>(Operation::Health, request).await
        };
        health.await.map_err(|e| match e {
            err @ LaylaError::Network { .. } => err,
            other => LaylaError::Network {
                message: format!("health check failed: {other}"),
                source: None,
            },
        })
    }
}

/// Guess the upload MIME type from a filename extension.
pub fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

/// Map a non-success HTTP status to our error taxonomy.
fn error_for_status(operation: Operation, status: StatusCode, body: String) -> LaylaError {
    let message = error_message(&body);
    match status {
        StatusCode::BAD_REQUEST => LaylaError::InvalidRequest { message },
        StatusCode::UNAUTHORIZED => LaylaError::Authentication {
            status,
            message: or_default(message, "missing API key"),
        },
        StatusCode::FORBIDDEN => LaylaError::Authentication {
            status,
            message: or_default(message, "invalid API key"),
        },
        StatusCode::NOT_FOUND => LaylaError::NotFound {
            message: or_default(message, "job not found"),
        },
        StatusCode::SERVICE_UNAVAILABLE => LaylaError::Network {
            message: format!(
                "{operation}: service unavailable: {}",
                or_default(message, "backend unavailable")
            ),
            source: None,
        },
        _ => LaylaError::UnexpectedResponse { status, body },
    }
}

/// The service reports errors as `{"detail": "..."}`. Fall back to the raw
/// body for anything else.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: String,
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.detail,
        Err(_) => body.trim().to_owned(),
    }
}

fn or_default(message: String, default: &str) -> String {
    if message.is_empty() {
        default.to_owned()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kind_for(status: u16) -> ErrorKind {
        let status = StatusCode::from_u16(status).unwrap();
        error_for_status(Operation::Status, status, String::new()).kind()
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert_eq!(kind_for(400), ErrorKind::InvalidRequest);
        assert_eq!(kind_for(401), ErrorKind::Authentication);
        assert_eq!(kind_for(403), ErrorKind::Authentication);
        assert_eq!(kind_for(404), ErrorKind::NotFound);
        assert_eq!(kind_for(503), ErrorKind::Network);
        assert_eq!(kind_for(500), ErrorKind::UnexpectedResponse);
        assert_eq!(kind_for(418), ErrorKind::UnexpectedResponse);
    }

    #[test]
    fn invalid_request_carries_server_text() {
        let err = error_for_status(
            Operation::Submit,
            StatusCode::BAD_REQUEST,
            "Unsupported file type".to_owned(),
        );
        match err {
            LaylaError::InvalidRequest { message } => {
                assert_eq!(message, "Unsupported file type")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn detail_field_is_unwrapped() {
        let err = error_for_status(
            Operation::Status,
            StatusCode::NOT_FOUND,
            r#"{"detail": "Job abc not found"}"#.to_owned(),
        );
        assert_eq!(err.to_string(), "not found: Job abc not found");
    }

    #[test]
    fn unexpected_status_keeps_raw_body() {
        let err = error_for_status(
            Operation::Delete,
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"detail": "boom"}"#.to_owned(),
        );
        match err {
            LaylaError::UnexpectedResponse { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, r#"{"detail": "boom"}"#);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn content_type_is_guessed_from_extension() {
        assert_eq!(guess_content_type("scan.pdf"), "application/pdf");
        assert_eq!(guess_content_type("scan.png"), "image/png");
        assert_eq!(
            guess_content_type("blob.unknownext"),
            "application/octet-stream"
        );
        assert_eq!(guess_content_type("README"), "application/octet-stream");
    }

    #[test]
    fn base_url_includes_port() {
        let config = Configuration::new("http://localhost/", Some(8000), "key");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000");
        assert_eq!(
            transport.endpoint(&["health"]).unwrap().as_str(),
            "http://localhost:8000/health"
        );
    }

    #[test]
    fn job_ids_stay_inside_their_path_segment() {
        let config = Configuration::new("http://localhost:8000/api/", None, "key");
        let transport = HttpTransport::new(&config).unwrap();
        let url = transport.endpoint(&["status", "../health?x=1#y"]).unwrap();
        assert_eq!(url.path(), "/api/status/..%2Fhealth%3Fx=1%23y");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn dot_and_empty_job_ids_are_rejected() {
        let config = Configuration::new("http://localhost:8000", None, "key");
        let transport = HttpTransport::new(&config).unwrap();
        for job_id in ["", ".", ".."] {
            let err = transport.endpoint(&["job", job_id]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest, "{job_id:?}");
        }
    }

    #[test]
    fn unusable_service_url_is_rejected() {
        let config = Configuration::new("not a url", None, "key");
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport.endpoint(&["health"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
