//! The `status` and `delete` subcommands.

use anyhow::Result;
use clap::Args;
use layla_client::LaylaService;
use tracing::instrument;

/// Options for subcommands that act on an existing job.
#[derive(Args, Debug)]
pub struct JobOpts {
    /// The job ID returned when the job was submitted.
    pub job_id: String,
}

/// The `status` subcommand.
#[instrument(level = "debug", skip(service))]
pub async fn cmd_status(service: &LaylaService, opts: &JobOpts) -> Result<()> {
    let status = service.get_job_status(&opts.job_id).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// The `delete` subcommand.
#[instrument(level = "debug", skip(service))]
pub async fn cmd_delete(service: &LaylaService, opts: &JobOpts) -> Result<()> {
    let receipt = service.delete_job(&opts.job_id).await?;
    println!("{}", receipt.message);
    Ok(())
}
