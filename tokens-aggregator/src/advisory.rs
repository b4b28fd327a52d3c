use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::PathBuf,
};

use chrono::Local;
use coingecko_client::types::MarketEntry;
use serde::Serialize;

const CHECKPOINT_FILE: &str = "market_cap_checkpoint.json";

/// Append-only diagnostic files. Nothing in the pipeline reads them back.
#[derive(Debug, Clone, Copy, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AdvisoryCategory {
    MetadataErrors,
    FailedDownloads,
    Error,
}

/// Side-effecting observer of the pipeline. Implementations must never fail the run.
pub trait AdvisoryLog: Send + Sync {
    fn record(&self, category: AdvisoryCategory, item: &str, error: &str);

    /// Snapshot of the market ranking collected so far, kept for post-mortems.
    fn checkpoint(&self, coins: &[MarketEntry]);
}

#[derive(Serialize)]
struct CheckpointEntry<'a> {
    id: &'a str,
    symbol: &'a str,
    name: &'a str,
    market_cap: Option<f64>,
}

/// Writes every category to `<dir>/<category>.log`.
#[derive(Debug, Clone)]
pub struct FileAdvisoryLog {
    dir: PathBuf,
}

impl FileAdvisoryLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, category: AdvisoryCategory) -> PathBuf {
        self.dir.join(format!("{category}.log"))
    }

    fn append(&self, category: AdvisoryCategory, line: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new().create(true).append(true).open(self.path(category))?;
        writeln!(file, "{line}")
    }

    fn write_checkpoint(&self, coins: &[MarketEntry]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let entries: Vec<_> = coins
            .iter()
            .map(|coin| CheckpointEntry {
                id: &coin.id,
                symbol: &coin.symbol,
                name: &coin.name,
                market_cap: coin.market_cap,
            })
            .collect();

        let file = File::create(self.dir.join(CHECKPOINT_FILE))?;
        serde_json::to_writer(file, &entries)?;
        Ok(())
    }
}

impl AdvisoryLog for FileAdvisoryLog {
    fn record(&self, category: AdvisoryCategory, item: &str, error: &str) {
        let line = format!("{} | {item} | {error}", Local::now().format("%Y-%m-%d %H:%M:%S"));

        if let Err(err) = self.append(category, &line) {
            tracing::warn!(%category, %err, "unable to write advisory log");
        }
    }

    fn checkpoint(&self, coins: &[MarketEntry]) {
        match self.write_checkpoint(coins) {
            Ok(()) => tracing::info!(coins = coins.len(), "saved market cap checkpoint"),
            Err(err) => tracing::warn!(%err, "unable to write market cap checkpoint"),
        }
    }
}
