use async_trait::async_trait;
use http_client::{FetchError, RetryingFetcher};
use serde_json::Value;

use super::{rpc, FetchMetadata, TokenMetadata};

const METHOD: &str = "getTokenSupply";

/// SPL mint decimals, read from the token supply of the mint.
pub struct SolanaProvider {
    fetcher: RetryingFetcher,
    url: String,
}

impl SolanaProvider {
    pub fn new(fetcher: RetryingFetcher, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

#[async_trait]
impl FetchMetadata for SolanaProvider {
    #[tracing::instrument(skip(self), err)]
    async fn fetch_metadata(&self, address: &str) -> Result<Option<TokenMetadata>, FetchError> {
        let result = rpc::call(&self.fetcher, &self.url, METHOD, address).await?;
        Ok(result.as_ref().and_then(parse))
    }
}

fn parse(result: &Value) -> Option<TokenMetadata> {
    let decimals = result.get("value")?.get("decimals")?;
    Some(TokenMetadata::from_iter([("decimals".to_owned(), decimals.clone())]))
}
