//! Client for the Layla asynchronous OCR service.
//!
//! The service accepts a document upload, processes it in the background and
//! lets clients poll for the result. [`LaylaService`] hides that cycle:
//!
//! ```no_run
//! use layla_client::{Configuration, JobOptions, LaylaService, LocalFileSource};
//!
//! # async fn run() -> layla_client::Result<()> {
//! let config = Configuration::new("https://ocr.example.com", None, "my-api-key");
//! let service = LaylaService::new(&config)?;
//! let result = service
//!     .submit_job(
//!         &LocalFileSource::new("document.pdf"),
//!         JobOptions::default().with_progress(|progress| eprintln!("{progress}")),
//!     )
//!     .await?;
//! println!("{}", result.result);
//! # Ok(())
//! # }
//! ```

mod async_utils;
pub mod config;
pub mod document;
pub mod error;
pub mod models;
mod poll;
mod prelude;
pub mod responses;
pub mod service;
pub mod transport;

pub use self::{
    async_utils::JoinWorker,
    config::{ConfigError, Configuration},
    document::{Document, DocumentSource, InMemorySource, LocalFileSource},
    error::{ErrorKind, LaylaError, Result},
    models::LaylaModel,
    poll::ProgressCallback,
    responses::{
        DeletionReceipt, HealthStatus, JobResult, JobState, JobStatus, JobSubmission,
        RawJobStatus,
    },
    service::{JobOptions, LaylaService},
    transport::{HttpTransport, Transport},
};
pub use tokio_util::sync::CancellationToken;
