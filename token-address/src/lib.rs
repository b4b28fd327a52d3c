use serde::{Deserialize, Serialize};

pub mod contract;

pub use contract::ContractAddress;

/// Wire protocol family used to fetch a chain's token metadata.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Solana,
    Sui,
}
