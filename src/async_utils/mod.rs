//! Asynchronous utilities for use with Tokio.

use std::fmt;

use tokio::task::{JoinError, JoinHandle};

/// A handle for a background worker. It can be awaited to wait for the
/// worker to finish, or dropped to let the worker run detached.
///
/// Dropping the handle does not stop the worker, but nothing keeps the Tokio
/// runtime alive on its behalf either. A worker still running when the
/// runtime shuts down is abandoned.
pub struct JoinWorker {
    handle: JoinHandle<()>,
}

impl JoinWorker {
    /// Create a new worker handle from a [`JoinHandle`].
    pub(crate) fn from_handle(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    /// Has the worker finished?
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to complete.
    ///
    /// Fails only if the worker panicked or was aborted.
    pub async fn join(self) -> Result<(), JoinError> {
        self.handle.await
    }
}

impl fmt::Debug for JoinWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinWorker")
            .field("finished", &self.handle.is_finished())
            .finish_non_exhaustive()
    }
}
