use apple_ring::console::StdioConsole;
use apple_ring::error::RingError;
use apple_ring::lifecycle::setup_tracing;
use apple_ring::topology::{RingBuilder, RingConfig};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), RingError> {
    setup_tracing();

    let console = Arc::new(StdioConsole::new());
    console.print_banner();

    let config = match console
        .read_ring_size()
        .await
        .and_then(|input| RingConfig::parse(&input))
    {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid k");
            return Err(e);
        }
    };

    let ring = RingBuilder::new(config, console.clone()).build()?;

    let interrupt = ring.interrupt();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Caught Ctrl-C, initiating graceful shutdown...");
            interrupt.trigger();
        }
    });

    console.print_instructions(config.size);
    let (exit, report) = ring.run().await;

    if report.is_clean() {
        info!(?exit, reaped = report.reaped(), "Ring exited");
    } else {
        warn!(?exit, exits = ?report.exits, "Ring exited with faults");
    }
    Ok(())
}
