//! Print spooler daemon.
//!
//! Configured through `SPOOLER_*` environment variables. Logs a monitor
//! snapshot as JSON after every worker event.

use std::error::Error;
use std::sync::Arc;

use actors::{SimulatedPrinter, Spooler, SpoolerConfig, SpoolerError};
use db::CompletionRegistry;
use futures_util::StreamExt;
use spool_core::{Job, JobId};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = SpoolerConfig::from_env()?;
    tracing::info!("Starting print spooler: {:?}", config);

    let db_conn = db::init(config.db_config()).await?;
    let registry = CompletionRegistry::new(db_conn);
    let printer = Arc::new(SimulatedPrinter::new(config.page_duration()));
    let spooler = Spooler::start(&config, registry, printer).await?;

    let monitor = spooler.subscribe_monitor().await?;
    tokio::spawn(async move {
        let mut updates = Box::pin(monitor.into_stream());
        while let Some(snapshot) = updates.next().await {
            match serde_json::to_string(&snapshot) {
                Ok(json) => tracing::info!("monitor {}", json),
                Err(e) => tracing::warn!("Failed to encode monitor snapshot: {}", e),
            }
        }
    });

    seed_demo_jobs(&spooler, config.demo_jobs)?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    let registry = spooler.registry().clone();
    spooler.shutdown().await?;

    let stats = registry.statistics().await?;
    tracing::info!(
        "Printed {} job(s), {} page(s) in total",
        stats.total_jobs,
        stats.total_units
    );
    Ok(())
}

/// Submit `count` jobs of 1 to 4 pages with mixed priorities.
fn seed_demo_jobs(spooler: &Spooler, count: usize) -> Result<(), SpoolerError> {
    for n in 1..=count {
        let id = JobId::new();
        let filename = format!("demo-{}.pdf", n);
        let pages = (n % 4) as u32 + 1;
        let job = Job::new(id, &filename, format!("uploads/{}_{}", id, filename), pages);
        spooler.submit_job(job, (n % 3) as i32 + 1)?;
    }
    if count > 0 {
        tracing::info!("Seeded {} demo job(s)", count);
    }
    Ok(())
}
