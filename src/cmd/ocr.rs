//! The `ocr` subcommand.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context as _, Result};
use clap::Args;
use layla_client::{JobOptions, JobResult, LaylaModel, LaylaService, LocalFileSource};
use tokio::{io::AsyncWriteExt as _, sync::oneshot};
use tracing::{info, instrument};

use crate::ui::Ui;

/// Options for the `ocr` subcommand.
#[derive(Args, Debug)]
pub struct OcrOpts {
    /// The document to OCR.
    pub input_path: PathBuf,

    /// The OCR model to use.
    #[clap(long, value_enum, default_value_t = LaylaModel::default())]
    pub model: LaylaModel,

    /// Give up after this many seconds.
    #[clap(long, default_value_t = 600)]
    pub timeout: u64,

    /// Seconds to wait between status checks.
    #[clap(long, default_value_t = 2)]
    pub poll_interval: u64,

    /// Delete the job from the service once it finishes.
    #[clap(long)]
    pub auto_delete: bool,

    /// Poll on a background task and report through a completion callback.
    #[clap(long)]
    pub background: bool,

    /// Output path for the OCR result. Defaults to standard output.
    #[clap(short = 'o', long = "output")]
    pub output_path: Option<PathBuf>,
}

/// The `ocr` subcommand.
#[instrument(level = "debug", skip_all, fields(input = %opts.input_path.display()))]
pub async fn cmd_ocr(ui: Ui, service: &LaylaService, opts: &OcrOpts) -> Result<()> {
    let source = LocalFileSource::new(&opts.input_path);

    let spinner = ui.new_spinner(
        "📄",
        &format!("Submitting to {} ({})", opts.model, opts.model.description()),
    );
    let progress_spinner = spinner.clone();
    let options = JobOptions::default()
        .with_model(opts.model)
        .with_timeout(Duration::from_secs(opts.timeout))
        .with_poll_interval(Duration::from_secs(opts.poll_interval))
        .with_auto_delete(opts.auto_delete)
        .with_progress(move |progress| {
            progress_spinner.set_message(format!("Processing {progress}"))
        });

    let result = if opts.background {
        let (tx, rx) = oneshot::channel();
        let (submission, worker) = service
            .submit_job_in_background(&source, options, move |outcome| {
                // The receiver only goes away if we're already exiting.
                let _ = tx.send(outcome);
            })
            .await?;
        info!(
            job_id = %submission.job_id,
            model = %submission.model,
            status = %submission.status,
            "Job submitted, processing in background"
        );
        spinner.set_message("Processing");
        worker.join().await.context("background worker failed")?;
        rx.await
            .context("background job ended without reporting a result")??
    } else {
        // The spinner keeps its submit message until the first progress report.
        service.submit_job(&source, options).await?
    };
    spinner.finish_and_clear();

    info!(job_id = %result.job_id, bytes = result.result.len(), "Job completed");
    write_result(&result, opts.output_path.as_deref()).await
}

/// Write the OCR text to `output_path`, or to stdout.
async fn write_result(result: &JobResult, output_path: Option<&std::path::Path>) -> Result<()> {
    match output_path {
        Some(path) => tokio::fs::write(path, &result.result)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(result.result.as_bytes()).await?;
            if !result.result.ends_with('\n') {
                stdout.write_all(b"\n").await?;
            }
            stdout.flush().await?;
            Ok(())
        }
    }
}
