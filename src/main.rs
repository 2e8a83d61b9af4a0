//! eventwatch - lifecycle event dispatcher
//!
//! Reads newline-delimited JSON events from stdin and dispatches them to the
//! configured notification backends until stdin closes or Ctrl-C is pressed.

use anyhow::Result;
use clap::Parser;
use eventwatch::{
    cli::Cli,
    config::Config,
    core::Event,
    events::{self, EventSender},
    hooks::PostHookTable,
    Watcher,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("eventwatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Queue Capacity: {}", config.queue_capacity);
    info!("Error Policy: {}", config.error_policy);
    info!("-------------------------------------------------------");

    let watcher = Watcher::new(&config.events, PostHookTable::new()).with_policy(config.error_policy);
    info!(
        "Enabled backends: {:?}",
        watcher.registry().enabled_backends()
    );

    let (events_tx, events_rx) = events::channel(config.queue_capacity);
    watcher.start_watching(events_rx)?;

    let reader = tokio::spawn(read_events(events_tx));

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, stopping watcher.");
            watcher.stop();
            true
        }
        result = reader => {
            if let Err(e) = result {
                error!("Event reader task failed: {}", e);
            }
            info!("Input closed, waiting for queued events to be dispatched.");
            false
        }
    };

    watcher.wait().await;
    info!("eventwatch shut down.");
    if interrupted {
        // A pending stdin read would otherwise hold up runtime shutdown.
        std::process::exit(0);
    }
    Ok(())
}

/// Forwards one JSON event per stdin line until EOF. Dropping the sender on
/// return lets the watcher drain the queue and exit.
async fn read_events(events_tx: EventSender) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Event>(line) {
                    Ok(event) => {
                        if events_tx.send(event).await.is_err() {
                            warn!("Watcher is gone, dropping remaining input.");
                            break;
                        }
                    }
                    Err(e) => warn!("Skipping malformed event: {}", e),
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
}
