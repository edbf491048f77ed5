use std::str::FromStr;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use layla_client::{Configuration, LaylaService};
use tracing::{debug, instrument};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::ui::Ui;

mod cmd;
mod ui;

/// Run documents through the Layla OCR service.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - LAYLA_OCR_SERVICE_URL: The OCR service URL.
  - LAYLA_OCR_SERVICE_PORT (optional): The OCR service port.
  - LAYLA_API_KEY: API key from your service provider.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Check that the service and its job queue are up.
    Health,
    /// OCR a single document and print the result.
    Ocr(cmd::ocr::OcrOpts),
    /// Print the current status of a job as JSON.
    Status(cmd::job::JobOpts),
    /// Delete a job and its result from the service.
    Delete(cmd::job::JobOpts),
}

impl Cmd {
    /// Are we using stdout for output?
    fn using_stdout_for_output(&self) -> bool {
        match self {
            Cmd::Ocr(opts) => opts.output_path.is_none(),
            Cmd::Health | Cmd::Status(_) | Cmd::Delete(_) => true,
        }
    }
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);

    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    // Hide the spinner if we're using stdout for output.
    if opts.subcmd.using_stdout_for_output() {
        ui.hide_progress_bars();
    }

    let config = Configuration::from_env().context("Could not load configuration")?;
    debug!(?config, "Loaded configuration");
    let service = LaylaService::new(&config)?;

    match &opts.subcmd {
        Cmd::Health => cmd::health::cmd_health(&service).await?,
        Cmd::Ocr(ocr_opts) => cmd::ocr::cmd_ocr(ui, &service, ocr_opts).await?,
        Cmd::Status(job_opts) => cmd::job::cmd_status(&service, job_opts).await?,
        Cmd::Delete(job_opts) => cmd::job::cmd_delete(&service, job_opts).await?,
    }
    Ok(())
}
