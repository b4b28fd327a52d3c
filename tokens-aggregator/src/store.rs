use std::{
    collections::HashSet,
    fs, io,
    path::PathBuf,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use token_address::ContractAddress;

use crate::{bucket::TokenRecord, error::AggregatorResult, metadata::TokenMetadata};

const DATA_FILE: &str = "data.json";
const IMAGES_DIR: &str = "pngs";

/// A bucket entry as persisted in `data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRecord {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub extract_time: DateTime<Utc>,
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub contract_address: ContractAddress,
    pub local_image: String,
    #[serde(default, alias = "alchemy_metadata")]
    pub metadata: TokenMetadata,
}

impl FinalRecord {
    pub fn finalise(record: &TokenRecord, extract_time: DateTime<Utc>) -> Self {
        Self {
            extract_time,
            id: record.id.clone(),
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            contract_address: record.contract_address.clone(),
            local_image: record.local_image.clone(),
            metadata: record
                .metadata
                .as_ref()
                .map(TokenMetadata::without_logo)
                .unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct StoredId {
    id: String,
}

/// Output tree: `<root>/<chain>/data.json` and `<root>/<chain>/pngs/`.
#[derive(Debug, Clone)]
pub struct BucketStore {
    root: PathBuf,
}

impl BucketStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn chain_dir(&self, chain: &str) -> PathBuf {
        self.root.join(chain)
    }

    pub fn images_dir(&self, chain: &str) -> PathBuf {
        self.chain_dir(chain).join(IMAGES_DIR)
    }

    pub fn data_path(&self, chain: &str) -> PathBuf {
        self.chain_dir(chain).join(DATA_FILE)
    }

    pub fn prepare(&self, chain: &str) -> io::Result<()> {
        fs::create_dir_all(self.images_dir(chain))
    }

    /// Ids of the last persisted bucket. A missing or unreadable file counts as no previous state.
    pub fn previous_ids(&self, chain: &str) -> HashSet<String> {
        let path = self.data_path(chain);

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return HashSet::new(),
            Err(err) => {
                tracing::warn!(%chain, %err, "unable to read previous data");
                return HashSet::new();
            },
        };

        match serde_json::from_slice::<Vec<StoredId>>(&content) {
            Ok(stored) => stored.into_iter().map(|stored| stored.id).collect(),
            Err(err) => {
                tracing::warn!(%chain, %err, "error loading previous data, starting afresh");
                HashSet::new()
            },
        }
    }

    /// Replaces the bucket file of `chain` as a whole.
    pub fn save(&self, chain: &str, records: &[FinalRecord]) -> AggregatorResult<PathBuf> {
        let path = self.data_path(chain);
        let temporary_file = path.with_extension("json.tmp");

        let contents = serde_json::to_string_pretty(records)?;

        fs::write(&temporary_file, contents)?;
        fs::rename(&temporary_file, &path)?;

        tracing::info!(%chain, tokens = records.len(), ?path, "saved bucket");
        Ok(path)
    }
}
