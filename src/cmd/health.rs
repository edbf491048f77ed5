//! The `health` subcommand.

use anyhow::{Result, anyhow};
use layla_client::LaylaService;
use tracing::instrument;

/// The `health` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_health(service: &LaylaService) -> Result<()> {
    let health = service.health_check().await?;
    println!("Service status: {}", health.status);
    println!("Redis status:   {}", health.queue_backend_status);
    if let Some(queue_size) = health.queue_size {
        println!("Queue size:     {queue_size}");
    }
    if health.is_healthy() {
        Ok(())
    } else {
        Err(anyhow!("service at {} is not healthy", service.base_url()))
    }
}
