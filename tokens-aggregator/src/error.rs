use std::io;

use http_client::FetchError;
use rust_utils::config::ConfigError;
use thiserror::Error;

pub type AggregatorResult<T> = Result<T, AggregatorError>;

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("No {0} found in environment variables")]
    MissingCredential(&'static str),

    #[error("Chain '{chain}' not found. Available chains: {available}")]
    UnknownChain { chain: String, available: String },

    #[error("Could not fetch coins list")]
    EmptyCatalog,

    #[error("Could not fetch coins by market cap")]
    EmptyRanking,

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialize error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] ConfigError),
}
