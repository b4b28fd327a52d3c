use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Entry of `/coins/list?include_platform=true`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub platforms: HashMap<String, Option<String>>, // Platform, address
}

impl CatalogEntry {
    /// Address on `platform`, ignoring the empty strings coingecko uses as placeholders.
    pub fn platform_address(&self, platform: &str) -> Option<&str> {
        self.platforms
            .get(platform)
            .and_then(Option::as_deref)
            .filter(|address| !address.is_empty())
    }
}

/// Entry of `/coins/markets`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarketEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
}
