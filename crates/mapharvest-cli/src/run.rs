//! The `run` subcommand: drive one scraping session against a recorded page
//! script, mirroring accepted records to the store file as the session goes.

use std::path::PathBuf;

use clap::Args;
use mapharvest_core::{encode_csv, export_filename, EngineConfig};
use mapharvest_scraper::{
    ChannelSink, ControlMessage, EngineController, EngineEvent, JsonFileStore, ScriptedPage,
    SessionOutcome, TraversalEngine,
};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Page script (JSON) to replay the session against
    #[arg(long)]
    pub page: PathBuf,

    /// Record store file, fully overwritten on every acceptance
    #[arg(long, default_value = "businesses.json")]
    pub store: PathBuf,

    /// Replay without the render settle delays
    #[arg(long)]
    pub fast: bool,

    /// Also write a timestamped CSV when the session completes
    #[arg(long)]
    pub csv: bool,
}

/// Loads the script, runs the session to completion, and prints a summary.
///
/// # Errors
///
/// Returns an error when the page script cannot be loaded or the session
/// ends in a fatal engine error. Cancellation is not an error: partial
/// results are retained and summarized.
pub async fn run_session(args: RunArgs, mut config: EngineConfig) -> anyhow::Result<()> {
    if args.fast {
        // Replay has nothing to wait for; keep budgets and gating as
        // configured, zero only the timed waits.
        config = EngineConfig {
            max_empty_retries: config.max_empty_retries,
            max_scroll_retries: config.max_scroll_retries,
            gate_on_pause: config.gate_on_pause,
            log_level: config.log_level,
            ..EngineConfig::immediate()
        };
    }

    let page = ScriptedPage::from_file(&args.page)?;
    let (sink, mut events) = ChannelSink::new();
    let engine = TraversalEngine::new(page, config, sink)
        .with_store(Box::new(JsonFileStore::new(args.store.clone())));

    let mut controller = EngineController::new(engine);
    controller.handle(ControlMessage::StartScraping);

    // Live progress; ends when the engine (and with it the sink) is dropped.
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::UpdateMetrics(metrics) => tracing::info!(
                    total = metrics.total_visible,
                    processed = metrics.processed,
                    found = metrics.found,
                    "progress"
                ),
                EngineEvent::UpdateData { records } => {
                    tracing::debug!(count = records.len(), "collection updated");
                }
                EngineEvent::Error { message } => tracing::error!(%message, "session error"),
            }
        }
    });

    let outcome = controller.join().await;
    let metrics = controller.metrics().unwrap_or_default();

    match outcome {
        Some(SessionOutcome::Done) => {}
        Some(SessionOutcome::Cancelled) => println!("session cancelled; partial results retained"),
        Some(SessionOutcome::Failed(err)) => anyhow::bail!("scraping failed: {err}"),
        None => anyhow::bail!("engine task did not complete"),
    }

    println!(
        "collected {} unique businesses across {} processed listings (store: {})",
        metrics.found,
        metrics.processed,
        args.store.display()
    );

    if args.csv {
        let out = export_filename(chrono::Utc::now());
        std::fs::write(&out, encode_csv(controller.records()))?;
        println!("exported {} records to {out}", metrics.found);
    }

    Ok(())
}
