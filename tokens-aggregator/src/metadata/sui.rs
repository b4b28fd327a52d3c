use async_trait::async_trait;
use http_client::{FetchError, RetryingFetcher};
use serde_json::Value;

use super::{rpc, FetchMetadata, TokenMetadata};

pub const DEFAULT_SUI_RPC_URL: &str = "https://fullnode.mainnet.sui.io:443";

const METHOD: &str = "suix_getCoinMetadata";
const FIELDS: [&str; 6] = ["name", "symbol", "decimals", "description", "iconUrl", "id"];

pub struct SuiProvider {
    fetcher: RetryingFetcher,
    url: String,
}

impl SuiProvider {
    pub fn new(fetcher: RetryingFetcher, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }
}

#[async_trait]
impl FetchMetadata for SuiProvider {
    #[tracing::instrument(skip(self), err)]
    async fn fetch_metadata(&self, address: &str) -> Result<Option<TokenMetadata>, FetchError> {
        let result = rpc::call(&self.fetcher, &self.url, METHOD, address).await?;
        Ok(result.as_ref().map(parse))
    }
}

fn parse(result: &Value) -> TokenMetadata {
    FIELDS
        .into_iter()
        .map(|key| (key.to_owned(), result.get(key).cloned().unwrap_or(Value::Null)))
        .collect()
}

#[cfg(test)]
mod tests {
    use claims::{assert_none, assert_ok};
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, method},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;
    use crate::metadata::tests::instant_fetcher;

    const COIN_TYPE: &str = "0x2::sui::SUI";

    #[tokio::test]
    async fn keeps_coin_metadata_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": METHOD, "params": [COIN_TYPE]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "decimals": 9,
                    "name": "Sui",
                    "symbol": "SUI",
                    "description": "",
                    "iconUrl": null,
                    "id": "0x9258"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = SuiProvider::new(instant_fetcher(), server.uri());
        let metadata = assert_ok!(provider.fetch_metadata(COIN_TYPE).await).unwrap();

        assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({"name": "Sui", "symbol": "SUI", "decimals": 9, "description": "", "iconUrl": null, "id": "0x9258"})
        );
    }

    #[tokio::test]
    async fn null_result_has_no_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": null})))
            .mount(&server)
            .await;

        let provider = SuiProvider::new(instant_fetcher(), server.uri());

        assert_none!(assert_ok!(provider.fetch_metadata(COIN_TYPE).await));
    }
}
