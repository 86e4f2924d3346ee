use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "transfer-ingest")]
pub struct Params {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(long, env = "TRANSFER_INGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides `store.base_dir`.
    #[arg(long, env = "TRANSFER_INGEST_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// JSON-lines file of events to publish to the `transactions` topic at startup.
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// JSON object of history entries to preload into the cache.
    #[arg(long)]
    pub seed_history: Option<PathBuf>,

    /// Used when RUST_LOG is not set.
    #[arg(long, env = "TRANSFER_INGEST_LOG", default_value = "info")]
    pub log_level: String,
}
