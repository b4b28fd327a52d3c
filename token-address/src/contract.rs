use serde::{Deserialize, Serialize};
use std::{fmt, fmt::Formatter};

pub const NATIVE: &str = "native";

// https://github.com/serde-rs/serde/issues/1560#issuecomment-506915291
macro_rules! named_unit_variant {
    ($variant:ident) => {
        pub mod $variant {
            pub fn serialize<S>(serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(stringify!($variant))
            }

            pub fn deserialize<'de, D>(deserializer: D) -> Result<(), D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct V;
                impl<'de> serde::de::Visitor<'de> for V {
                    type Value = ();
                    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                        f.write_str(concat!("\"", stringify!($variant), "\""))
                    }
                    fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<Self::Value, E> {
                        if value == stringify!($variant) {
                            Ok(())
                        } else {
                            Err(E::invalid_value(serde::de::Unexpected::Str(value), &self))
                        }
                    }
                }
                deserializer.deserialize_str(V)
            }
        }
    };
}

mod strings {
    named_unit_variant!(native);
}

// `Native` goes first: an untagged `String` would swallow the sentinel.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawContractAddress {
    #[serde(with = "strings::native")]
    Native,
    Contract(String),
}

/// Where a token lives on a chain: a contract (or mint, or coin type) address, or the chain's base asset.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Hash)]
#[serde(from = "RawContractAddress", into = "RawContractAddress")]
pub enum ContractAddress {
    Contract(String),
    Native,
}

impl From<RawContractAddress> for ContractAddress {
    fn from(value: RawContractAddress) -> Self {
        match value {
            RawContractAddress::Native => ContractAddress::Native,
            RawContractAddress::Contract(address) => ContractAddress::Contract(address),
        }
    }
}

impl From<ContractAddress> for RawContractAddress {
    fn from(value: ContractAddress) -> Self {
        match value {
            ContractAddress::Native => RawContractAddress::Native,
            ContractAddress::Contract(address) => RawContractAddress::Contract(address),
        }
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ContractAddress::Contract(address) => f.write_str(address),
            ContractAddress::Native => f.write_str(NATIVE),
        }
    }
}

impl ContractAddress {
    /// Address to query providers with; `None` for the native asset.
    pub fn contract(&self) -> Option<&str> {
        match self {
            ContractAddress::Contract(address) => Some(address),
            ContractAddress::Native => None,
        }
    }
}
