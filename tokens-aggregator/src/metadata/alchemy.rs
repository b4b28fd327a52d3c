use async_trait::async_trait;
use http_client::{FetchError, RetryingFetcher};
use serde_json::Value;

use super::{rpc, FetchMetadata, TokenMetadata};

const METHOD: &str = "alchemy_getTokenMetadata";

pub fn alchemy_url(network: &str, api_key: &str) -> String {
    format!("https://{network}.g.alchemy.com/v2/{api_key}")
}

/// ERC-20 metadata through Alchemy's token api.
pub struct AlchemyProvider {
    fetcher: RetryingFetcher,
    url: String,
}

impl AlchemyProvider {
    pub fn new(fetcher: RetryingFetcher, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

#[async_trait]
impl FetchMetadata for AlchemyProvider {
    #[tracing::instrument(skip(self), err)]
    async fn fetch_metadata(&self, address: &str) -> Result<Option<TokenMetadata>, FetchError> {
        let result = rpc::call(&self.fetcher, &self.url, METHOD, address).await?;
        Ok(result.as_ref().map(parse))
    }
}

/// `name`, `symbol`, `decimals` and `logo` are always present (possibly null), `totalSupply` only when known.
fn parse(result: &Value) -> TokenMetadata {
    let field = |key: &str| result.get(key).cloned().unwrap_or(Value::Null);

    let mut metadata: TokenMetadata = ["name", "symbol", "decimals", "logo"]
        .into_iter()
        .map(|key| (key.to_owned(), field(key)))
        .collect();

    if let Some(total_supply) = result.get("totalSupply").filter(|value| !value.is_null()) {
        metadata.insert("totalSupply", total_supply.clone());
    }

    metadata
}

#[cfg(test)]
mod tests {
    use claims::assert_ok;
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, method},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::metadata::tests::instant_fetcher;

    #[test]
    fn url_embeds_network_and_key() {
        assert_eq!(alchemy_url("eth-mainnet", "key"), "https://eth-mainnet.g.alchemy.com/v2/key");
    }

    #[test]
    fn keeps_token_fields_without_total_supply() {
        let metadata = parse(&json!({"name": "USD Coin", "symbol": "USDC", "decimals": 6, "logo": "https://logo"}));

        assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({"name": "USD Coin", "symbol": "USDC", "decimals": 6, "logo": "https://logo"})
        );
        assert!(metadata.get("totalSupply").is_none());
    }

    #[test]
    fn keeps_total_supply_when_known() {
        let metadata = parse(&json!({"name": "Tok", "symbol": "TOK", "decimals": 18, "logo": null, "totalSupply": "1000"}));

        assert_eq!(metadata.get("totalSupply"), Some(&json!("1000")));
        assert_eq!(metadata.get("logo"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn posts_token_metadata_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": METHOD, "params": ["0xABC"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {"name": "Tok", "symbol": "TOK", "decimals": 18, "logo": null, "extra": true}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AlchemyProvider::new(instant_fetcher(), server.uri());
        let metadata = assert_ok!(provider.fetch_metadata("0xABC").await).unwrap();

        assert_eq!(metadata.get("decimals"), Some(&json!(18)));
        assert!(metadata.get("extra").is_none());
    }
}
