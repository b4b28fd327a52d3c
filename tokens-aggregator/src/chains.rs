use serde::Deserialize;
use token_address::ChainFamily;

use crate::error::{AggregatorError, AggregatorResult};

/// A chain whose top tokens are aggregated.
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct ChainDefinition {
    /// Name used for output directories and on the command line.
    pub name: String,
    /// Coingecko platform key under which contract addresses are listed.
    pub platform: String,
    pub family: ChainFamily,
    /// Alchemy network slug; chains without one are not enriched unless the family has a fixed endpoint.
    #[serde(default)]
    pub network: Option<String>,
}

impl ChainDefinition {
    pub fn new(name: &str, platform: &str, family: ChainFamily, network: Option<&str>) -> Self {
        Self {
            name: name.to_owned(),
            platform: platform.to_owned(),
            family,
            network: network.map(ToOwned::to_owned),
        }
    }
}

pub fn default_chains() -> Vec<ChainDefinition> {
    use ChainFamily::*;

    vec![
        ChainDefinition::new("ethereum", "ethereum", Evm, Some("eth-mainnet")),
        ChainDefinition::new("solana", "solana", Solana, Some("solana-mainnet")),
        ChainDefinition::new("base", "base", Evm, Some("base-mainnet")),
        ChainDefinition::new("arbitrum", "arbitrum-one", Evm, Some("arb-mainnet")),
        ChainDefinition::new("optimism", "optimistic-ethereum", Evm, Some("opt-mainnet")),
        ChainDefinition::new("polygon", "polygon-pos", Evm, Some("polygon-mainnet")),
        ChainDefinition::new("binance-smart-chain", "binance-smart-chain", Evm, Some("bnb-mainnet")),
        ChainDefinition::new("sui", "sui", Sui, None),
        ChainDefinition::new("avalanche", "avalanche", Evm, Some("avax-mainnet")),
        ChainDefinition::new("unichain", "unichain", Evm, Some("unichain-mainnet")),
    ]
}

pub fn find<'a>(chains: &'a [ChainDefinition], name: &str) -> Option<&'a ChainDefinition> {
    chains.iter().find(|chain| chain.name == name)
}

/// Every chain, or only the one named `only`.
pub fn select(chains: &[ChainDefinition], only: Option<&str>) -> AggregatorResult<Vec<ChainDefinition>> {
    let Some(name) = only else {
        return Ok(chains.to_vec());
    };

    find(chains, name)
        .map(|chain| vec![chain.clone()])
        .ok_or_else(|| AggregatorError::UnknownChain {
            chain: name.to_owned(),
            available: names(chains),
        })
}

pub fn names(chains: &[ChainDefinition]) -> String {
    chains
        .iter()
        .map(|chain| chain.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
