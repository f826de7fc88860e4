//! The `export` subcommand: serialize a stored record collection to the
//! fixed 8-column CSV and offer it as a timestamped file.

use std::path::PathBuf;

use clap::Args;
use mapharvest_core::{encode_csv, export_filename};
use mapharvest_scraper::JsonFileStore;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Record store file to export
    #[arg(long, default_value = "businesses.json")]
    pub store: PathBuf,

    /// Output file; defaults to a timestamped name in the current directory
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// # Errors
///
/// Returns an error when the store cannot be read or the output cannot be
/// written.
pub fn run_export(args: &ExportArgs) -> anyhow::Result<()> {
    let records = JsonFileStore::new(args.store.clone()).load()?;
    if records.is_empty() {
        println!("no data available to export");
        return Ok(());
    }

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(export_filename(chrono::Utc::now())));
    std::fs::write(&out, encode_csv(&records))?;
    println!("exported {} records to {}", records.len(), out.display());
    Ok(())
}
