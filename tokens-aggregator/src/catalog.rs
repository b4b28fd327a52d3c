use std::collections::HashMap;

use coingecko_client::types::CatalogEntry;
use token_address::ContractAddress;

/// Coin id to catalog entry. The first entry listed for an id wins.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    coins: HashMap<String, CatalogEntry>,
}

impl CatalogIndex {
    pub fn build(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        entries.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    /// Contract of `coin_id` on `platform`.
    ///
    /// Some base-layer assets are not listed under their own platform at all, so a coin
    /// whose id is the platform key (or the key with `-` replaced by `_`) is the native asset.
    pub fn resolve_contract(&self, coin_id: &str, platform: &str) -> Option<ContractAddress> {
        let coin = self.coins.get(coin_id)?;

        if let Some(address) = coin.platform_address(platform) {
            return Some(ContractAddress::Contract(address.to_owned()));
        }

        is_native(coin_id, platform).then_some(ContractAddress::Native)
    }
}

impl FromIterator<CatalogEntry> for CatalogIndex {
    fn from_iter<T: IntoIterator<Item = CatalogEntry>>(iter: T) -> Self {
        let mut coins = HashMap::new();
        for entry in iter {
            coins.entry(entry.id.clone()).or_insert(entry);
        }
        Self { coins }
    }
}

fn is_native(coin_id: &str, platform: &str) -> bool {
    coin_id == platform || coin_id == platform.replace('-', "_")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn entry(id: &str, platforms: &[(&str, &str)]) -> CatalogEntry {
        CatalogEntry {
            id: id.into(),
            symbol: id.into(),
            name: id.into(),
            platforms: platforms
                .iter()
                .map(|(platform, address)| (platform.to_string(), Some(address.to_string())))
                .collect(),
        }
    }

    #[test]
    fn resolves_listed_contract() {
        let index = CatalogIndex::build([entry("tok1", &[("ethereum", "0xABC")])]);

        assert_eq!(
            index.resolve_contract("tok1", "ethereum"),
            Some(ContractAddress::Contract("0xABC".into()))
        );
        assert_eq!(index.resolve_contract("tok1", "solana"), None);
    }

    #[test]
    fn resolves_native_asset_without_platform_entry() {
        let index = CatalogIndex::build([
            entry("ethereum", &[]),
            entry("binance_smart_chain", &[]),
            entry("solana", &[("solana", "")]),
        ]);

        assert_eq!(index.resolve_contract("ethereum", "ethereum"), Some(ContractAddress::Native));
        assert_eq!(
            index.resolve_contract("binance_smart_chain", "binance-smart-chain"),
            Some(ContractAddress::Native)
        );
        assert_eq!(index.resolve_contract("solana", "solana"), Some(ContractAddress::Native));
        assert_eq!(index.resolve_contract("ethereum", "base"), None);
    }

    #[test]
    fn unknown_coin_does_not_resolve() {
        let index = CatalogIndex::build([entry("tok1", &[("ethereum", "0xABC")])]);

        assert_eq!(index.resolve_contract("ethereum", "ethereum"), None);
    }

    #[test]
    fn first_listing_of_an_id_wins() {
        let index = CatalogIndex::build([
            entry("tok1", &[("ethereum", "0xFIRST")]),
            entry("tok1", &[("ethereum", "0xSECOND")]),
        ]);

        assert_eq!(index.len(), 1);
        assert_eq!(
            index.resolve_contract("tok1", "ethereum"),
            Some(ContractAddress::Contract("0xFIRST".into()))
        );
    }
}
