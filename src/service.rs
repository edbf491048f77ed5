//! The job lifecycle coordinator.
//!
//! [`LaylaService`] submits a document, polls the job until it reaches a
//! terminal state and optionally deletes it afterwards. It offers two ways to
//! wait for the result:
//!
//! - [`LaylaService::submit_job`] returns the finished [`JobResult`]. The
//!   calling task stays suspended until the job completes, fails or times
//!   out.
//! - [`LaylaService::submit_job_in_background`] returns as soon as the
//!   service has accepted the upload. Polling continues on a freshly spawned
//!   Tokio task, and a completion callback receives the outcome exactly once.
//!
//! Both share the loop in [`crate::poll`], and each call owns its own loop
//! state.

use std::{fmt, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::Instrument as _;

use crate::{
    async_utils::JoinWorker,
    config::Configuration,
    document::DocumentSource,
    models::LaylaModel,
    poll::{PollSettings, ProgressCallback, poll_until_complete},
    prelude::*,
    responses::{DeletionReceipt, HealthStatus, JobResult, JobStatus, JobSubmission},
    transport::{HttpTransport, Transport},
};

/// Default upper bound on how long we poll a job.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default pause between two status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Options for running one job.
#[derive(Clone)]
pub struct JobOptions {
    /// The OCR model to run.
    pub model: LaylaModel,

    /// Give up polling once this much time has passed. Must be non-zero.
    pub timeout: Duration,

    /// Wait this long between status requests. Must be non-zero.
    pub poll_interval: Duration,

    /// Delete the job from the service once it reaches a terminal state.
    /// Failures to delete are logged and otherwise ignored.
    pub auto_delete: bool,

    /// Called with each new progress value.
    pub progress: Option<ProgressCallback>,

    /// Stops polling when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            model: LaylaModel::default(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            auto_delete: false,
            progress: None,
            cancel: None,
        }
    }
}

impl JobOptions {
    pub fn with_model(mut self, model: LaylaModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    pub fn with_progress(
        mut self,
        progress: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Reject options that would make the polling loop meaningless.
    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(LaylaError::InvalidOptions(
                "timeout must be greater than zero".to_owned(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(LaylaError::InvalidOptions(
                "poll interval must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    fn poll_settings(&self) -> PollSettings<'_> {
        PollSettings {
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            progress: self.progress.as_ref(),
            cancel: self.cancel.as_ref(),
        }
    }
}

impl fmt::Debug for JobOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobOptions")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("poll_interval", &self.poll_interval)
            .field("auto_delete", &self.auto_delete)
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Client for the OCR service.
///
/// Cloning is cheap: clones share the same transport, and with it the HTTP
/// connection pool.
pub struct LaylaService<T: Transport = HttpTransport> {
    transport: Arc<T>,
}

impl<T: Transport> Clone for LaylaService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl LaylaService<HttpTransport> {
    /// Create a client talking HTTP to the service described by `config`.
    pub fn new(config: &Configuration) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }

    /// The address requests are sent to.
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }
}

impl<T: Transport> LaylaService<T> {
    /// Create a client on top of any [`Transport`].
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload a document and start a job, without waiting for it.
    #[instrument(level = "debug", skip_all, fields(model = %model))]
    pub async fn submit_job_request<S>(
        &self,
        source: &S,
        model: LaylaModel,
    ) -> Result<JobSubmission>
    where
        S: DocumentSource + ?Sized,
    {
        let document = source.load().await?;
        let filename = document.filename.clone();
        let submission = self.transport.submit(document, model).await?;
        info!(
            job_id = %submission.job_id,
            %filename,
            model = %submission.model,
            "Submitted OCR job"
        );
        Ok(submission)
    }

    /// Run a job and wait for its result.
    ///
    /// The returned future finishes when the job completes, fails, times out
    /// or is cancelled. If `options.auto_delete` is set, the job is deleted
    /// once it has completed or failed. Deletion failures never change the
    /// outcome.
    #[instrument(level = "debug", skip_all, fields(model = %options.model))]
    pub async fn submit_job<S>(&self, source: &S, options: JobOptions) -> Result<JobResult>
    where
        S: DocumentSource + ?Sized,
    {
        options.validate()?;
        let submission = self.submit_job_request(source, options.model).await?;
        run_to_completion(&*self.transport, &submission, &options).await
    }

    /// Submit a job and keep polling it on a background task.
    ///
    /// Only the upload happens before this returns. `on_complete` is then
    /// called exactly once, from the background task, with either the
    /// [`JobResult`] or the error that ended the job. If the upload itself
    /// fails, the error is returned here and `on_complete` is never called.
    ///
    /// The returned [`JoinWorker`] may be awaited or simply dropped. Either
    /// way the task keeps running, but it is abandoned if the Tokio runtime
    /// shuts down first, in which case `on_complete` is never called.
    #[instrument(level = "debug", skip_all, fields(model = %options.model))]
    pub async fn submit_job_in_background<S, F>(
        &self,
        source: &S,
        options: JobOptions,
        on_complete: F,
    ) -> Result<(JobSubmission, JoinWorker)>
    where
        S: DocumentSource + ?Sized,
        F: FnOnce(Result<JobResult>) + Send + 'static,
    {
        options.validate()?;
        let submission = self.submit_job_request(source, options.model).await?;

        let transport = Arc::clone(&self.transport);
        let background_submission = submission.clone();
        let handle = tokio::spawn(
            async move {
                let outcome =
                    run_to_completion(&*transport, &background_submission, &options)
                        .await;
                if let Err(err) = &outcome {
                    debug!(
                        job_id = %background_submission.job_id,
                        %err,
                        "Background job ended with an error"
                    );
                }
                on_complete(outcome);
            }
            .in_current_span(),
        );

        Ok((submission, JoinWorker::from_handle(handle)))
    }

    /// Fetch the current state of a job.
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.transport.status(job_id).await
    }

    /// Delete a job and its result from the service.
    pub async fn delete_job(&self, job_id: &str) -> Result<DeletionReceipt> {
        let receipt = self.transport.delete(job_id).await?;
        info!(job_id, message = %receipt.message, "Deleted job");
        Ok(receipt)
    }

    /// Check that the service is up. Needs no API key.
    pub async fn health_check(&self) -> Result<HealthStatus> {
        self.transport.health().await
    }
}

/// Poll a submitted job to the end, then clean up if asked to.
async fn run_to_completion<T>(
    transport: &T,
    submission: &JobSubmission,
    options: &JobOptions,
) -> Result<JobResult>
where
    T: Transport + ?Sized,
{
    let job_id = submission.job_id.as_str();
    let outcome = poll_until_complete(transport, job_id, options.poll_settings()).await;

    let reached_terminal_state =
        matches!(outcome, Ok(_) | Err(LaylaError::JobFailed { .. }));
    if options.auto_delete && reached_terminal_state {
        match transport.delete(job_id).await {
            Ok(receipt) => debug!(job_id, message = %receipt.message, "Auto-deleted job"),
            Err(err) => warn!(job_id, %err, "Could not auto-delete job; ignoring"),
        }
    }

    outcome.map(|result| JobResult::from_submission(submission, result))
}
