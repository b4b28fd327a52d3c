use std::collections::{HashMap, HashSet};

use coingecko_client::types::MarketEntry;
use token_address::ContractAddress;

use crate::{catalog::CatalogIndex, chains::ChainDefinition, metadata::TokenMetadata};

/// Tokens kept per chain, counted from the top of the market-cap ranking.
pub const BUCKET_CAP: usize = 100;

/// A ranked coin resolved to one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
    pub contract_address: ContractAddress,
    pub chain: String,
    pub image_url: Option<String>,
    pub local_image: String,
    pub metadata: Option<TokenMetadata>,
}

impl TokenRecord {
    pub fn new(coin: &MarketEntry, contract_address: ContractAddress, chain: &str) -> Self {
        Self {
            id: coin.id.clone(),
            symbol: coin.symbol.clone(),
            name: coin.name.clone(),
            market_cap: coin.market_cap,
            current_price: coin.current_price,
            contract_address,
            chain: chain.to_owned(),
            image_url: coin.image.clone(),
            local_image: local_image(&coin.id),
            metadata: None,
        }
    }
}

pub fn local_image(id: &str) -> String {
    format!("{id}.png")
}

/// Splits the ranking into one candidate list per chain, keeping ranking order.
///
/// A coin joins every chain it resolves on, but a chain's list never holds an id twice.
/// Every chain in `chains` gets an entry, possibly empty.
pub fn partition(
    ranking: &[MarketEntry],
    index: &CatalogIndex,
    chains: &[ChainDefinition],
) -> HashMap<String, Vec<TokenRecord>> {
    let mut buckets: HashMap<String, Vec<TokenRecord>> =
        chains.iter().map(|chain| (chain.name.clone(), Vec::new())).collect();
    let mut seen: HashMap<&str, HashSet<&str>> = HashMap::new();

    for coin in ranking {
        for chain in chains {
            let Some(contract_address) = index.resolve_contract(&coin.id, &chain.platform) else {
                continue;
            };

            if !seen.entry(chain.name.as_str()).or_default().insert(coin.id.as_str()) {
                continue;
            }

            buckets
                .entry(chain.name.clone())
                .or_default()
                .push(TokenRecord::new(coin, contract_address, &chain.name));
        }
    }

    buckets
}

/// The first [`BUCKET_CAP`] candidates, in ranking order.
pub fn top_tokens(mut candidates: Vec<TokenRecord>) -> Vec<TokenRecord> {
    candidates.truncate(BUCKET_CAP);
    candidates
}
