use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use derive_more::From;
use http_client::{FetchError, RetryingFetcher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use token_address::ChainFamily;

use crate::{
    advisory::{AdvisoryCategory, AdvisoryLog},
    bucket::TokenRecord,
    chains::ChainDefinition,
};

pub mod alchemy;
pub mod rpc;
pub mod solana;
pub mod sui;

pub use alchemy::{alchemy_url, AlchemyProvider};
pub use solana::SolanaProvider;
pub use sui::{SuiProvider, DEFAULT_SUI_RPC_URL};

/// On-chain token metadata. The key set depends on the provider that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenMetadata(Map<String, Value>);

impl TokenMetadata {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Logos are not persisted, cached images replace them.
    pub fn without_logo(&self) -> Self {
        let mut metadata = self.clone();
        metadata.0.remove("logo");
        metadata
    }
}

impl FromIterator<(String, Value)> for TokenMetadata {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[async_trait]
pub trait FetchMetadata {
    /// Metadata of the token at `address`, or `None` when the provider knows nothing about it.
    async fn fetch_metadata(&self, address: &str) -> Result<Option<TokenMetadata>, FetchError>;
}

#[derive(From)]
pub enum Provider {
    #[from]
    Alchemy(AlchemyProvider),
    #[from]
    Solana(SolanaProvider),
    #[from]
    Sui(SuiProvider),
}

impl Provider {
    /// Provider serving `chain`, if any. Sui nodes are public; the other families go through Alchemy.
    pub fn for_chain(
        chain: &ChainDefinition,
        fetcher: &RetryingFetcher,
        alchemy_api_key: &str,
        sui_rpc_url: &str,
    ) -> Option<Self> {
        let alchemy = || {
            chain
                .network
                .as_deref()
                .map(|network| alchemy_url(network, alchemy_api_key))
        };

        let provider = match chain.family {
            ChainFamily::Sui => SuiProvider::new(fetcher.clone(), sui_rpc_url).into(),
            ChainFamily::Solana => SolanaProvider::new(fetcher.clone(), alchemy()?).into(),
            ChainFamily::Evm => AlchemyProvider::new(fetcher.clone(), alchemy()?).into(),
        };

        Some(provider)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Provider::Alchemy(_) => "Alchemy",
            Provider::Solana(_) => "Solana",
            Provider::Sui(_) => "Sui",
        };

        f.write_str(msg)
    }
}

#[async_trait]
impl FetchMetadata for Provider {
    async fn fetch_metadata(&self, address: &str) -> Result<Option<TokenMetadata>, FetchError> {
        match self {
            Provider::Alchemy(x) => x.fetch_metadata(address),
            Provider::Solana(x) => x.fetch_metadata(address),
            Provider::Sui(x) => x.fetch_metadata(address),
        }
        .await
    }
}

/// Outcome of enriching a single token.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Enrichment {
    Enriched,
    AlreadyEnriched,
    /// Native assets and chains without a provider are never queried.
    Skipped,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct EnrichmentSummary {
    pub enriched: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl EnrichmentSummary {
    fn count(&mut self, enrichment: Enrichment) {
        match enrichment {
            Enrichment::Enriched | Enrichment::AlreadyEnriched => self.enriched += 1,
            Enrichment::Skipped => self.skipped += 1,
            Enrichment::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for EnrichmentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "enriched {} tokens, skipped {} tokens, failed {} tokens",
            self.enriched, self.skipped, self.failed
        )
    }
}

/// Attaches provider metadata to token records, one chain provider each.
pub struct Enricher {
    providers: HashMap<String, Provider>,
    advisory: Arc<dyn AdvisoryLog>,
}

impl Enricher {
    pub fn new(advisory: Arc<dyn AdvisoryLog>) -> Self {
        Self {
            providers: HashMap::new(),
            advisory,
        }
    }

    pub fn from_chains(
        chains: &[ChainDefinition],
        fetcher: &RetryingFetcher,
        alchemy_api_key: &str,
        sui_rpc_url: &str,
        advisory: Arc<dyn AdvisoryLog>,
    ) -> Self {
        chains
            .iter()
            .filter_map(|chain| {
                Provider::for_chain(chain, fetcher, alchemy_api_key, sui_rpc_url).map(|provider| (chain, provider))
            })
            .fold(Self::new(advisory), |enricher, (chain, provider)| {
                enricher.with_provider(&chain.name, provider)
            })
    }

    pub fn with_provider(mut self, chain: &str, provider: impl Into<Provider>) -> Self {
        self.providers.insert(chain.to_owned(), provider.into());
        self
    }

    pub fn supports(&self, chain: &str) -> bool {
        self.providers.contains_key(chain)
    }

    /// Never removes metadata; a failed lookup leaves the record as it was.
    pub async fn enrich(&self, chain: &str, record: &mut TokenRecord) -> Enrichment {
        let Some(address) = record.contract_address.contract() else {
            return Enrichment::Skipped;
        };

        if record.metadata.is_some() {
            tracing::debug!(token = %record.id, "token already has metadata");
            return Enrichment::AlreadyEnriched;
        }

        let Some(provider) = self.providers.get(chain) else {
            return Enrichment::Skipped;
        };

        match provider.fetch_metadata(address).await {
            Ok(Some(metadata)) => {
                tracing::debug!(token = %record.id, %provider, "enriched token");
                record.metadata = Some(metadata);
                Enrichment::Enriched
            },
            Ok(None) => {
                tracing::info!(token = %record.id, %chain, "no metadata found");
                Enrichment::Failed
            },
            Err(err) if err.is_throttled() => {
                tracing::warn!(token = %record.id, %chain, "still rate limited, skipping token");
                Enrichment::Failed
            },
            Err(err) => {
                tracing::warn!(token = %record.id, %chain, %err, "unable to fetch metadata");
                self.advisory.record(
                    AdvisoryCategory::MetadataErrors,
                    &format!("{chain}:{address}"),
                    &err.to_string(),
                );
                Enrichment::Failed
            },
        }
    }

    /// Enriches `records` in bucket order.
    pub async fn enrich_all(&self, chain: &str, records: &mut [TokenRecord]) -> EnrichmentSummary {
        let mut summary = EnrichmentSummary::default();

        if !self.supports(chain) {
            tracing::info!(%chain, "no metadata provider configured, skipping enrichment");
            summary.skipped = records.len();
            return summary;
        }

        tracing::info!(%chain, tokens = records.len(), "enriching tokens with metadata");
        for record in records.iter_mut() {
            summary.count(self.enrich(chain, record).await);
        }

        tracing::info!(%chain, %summary, "enrichment finished");
        summary
    }
}
