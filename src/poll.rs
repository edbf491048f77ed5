//! The polling loop shared by the foreground and background entry points.

use std::{sync::Arc, time::Duration};

use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::{prelude::*, responses::JobState, transport::Transport};

/// Called with each new progress value reported while a job is processing.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync + 'static>;

/// How to poll one job.
pub(crate) struct PollSettings<'a> {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub progress: Option<&'a ProgressCallback>,
    pub cancel: Option<&'a CancellationToken>,
}

/// Remembers the last progress value so each distinct value is reported only
/// once in a row.
#[derive(Debug, Default)]
pub(crate) struct ProgressTracker {
    last: Option<String>,
}

impl ProgressTracker {
    /// Record `progress`. Returns `true` if it differs from the previous value.
    pub fn update(&mut self, progress: &str) -> bool {
        if self.last.as_deref() == Some(progress) {
            false
        } else {
            self.last = Some(progress.to_owned());
            true
        }
    }
}

/// Poll `job_id` until it completes, fails, times out or is cancelled.
/// Returns the OCR result of a completed job.
///
/// Any transport error ends the loop immediately. There are no retries.
#[instrument(level = "debug", skip(transport, settings))]
pub(crate) async fn poll_until_complete<T>(
    transport: &T,
    job_id: &str,
    settings: PollSettings<'_>,
) -> Result<String>
where
    T: Transport + ?Sized,
{
    let start = Instant::now();
    let mut tracker = ProgressTracker::default();
    let mut polls = 0u64;

    loop {
        if settings.cancel.is_some_and(|cancel| cancel.is_cancelled()) {
            return Err(cancelled(job_id));
        }
        let elapsed = start.elapsed();
        if elapsed > settings.timeout {
            return Err(timed_out(job_id, polls, settings.timeout));
        }

        // A stalled status request must not outlive the job's deadline.
        polls += 1;
        let status = timeout(settings.timeout - elapsed, transport.status(job_id))
            .await
            .map_err(|_| timed_out(job_id, polls, settings.timeout))??;
        debug!(job_id, polls, status = %status.state, "Polled job");

        match status.state {
            JobState::Completed { result } => {
                info!(job_id, polls, bytes = result.len(), "Job completed");
                return Ok(result);
            }
            JobState::Failed { error } => {
                info!(job_id, polls, %error, "Job failed");
                return Err(LaylaError::JobFailed {
                    job_id: job_id.to_owned(),
                    message: error,
                });
            }
            JobState::Processing { progress } => {
                if let (Some(callback), Some(progress)) = (settings.progress, progress) {
                    if tracker.update(&progress) {
                        callback(&progress);
                    }
                }
            }
        }

        match settings.cancel {
            Some(cancel) => {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(cancelled(job_id)),
                    _ = sleep(settings.poll_interval) => {}
                }
            }
            None => sleep(settings.poll_interval).await,
        }
    }
}

fn timed_out(job_id: &str, polls: u64, limit: Duration) -> LaylaError {
    warn!(job_id, polls, "Job timed out");
    LaylaError::Timeout {
        job_id: job_id.to_owned(),
        timeout: limit,
    }
}

fn cancelled(job_id: &str) -> LaylaError {
    info!(job_id, "Polling cancelled");
    LaylaError::Cancelled {
        job_id: job_id.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_each_distinct_value_once() {
        let mut tracker = ProgressTracker::default();
        let reported = ["1/10", "1/10", "2/10", "2/10", "3/10"]
            .into_iter()
            .filter(|progress| tracker.update(progress))
            .collect::<Vec<_>>();
        assert_eq!(reported, ["1/10", "2/10", "3/10"]);
    }

    #[test]
    fn tracker_reports_a_value_that_comes_back() {
        let mut tracker = ProgressTracker::default();
        assert!(tracker.update("a"));
        assert!(tracker.update("b"));
        assert!(tracker.update("a"));
        assert!(!tracker.update("a"));
    }
}
