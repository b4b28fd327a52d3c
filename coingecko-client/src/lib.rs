use anyhow::Context;
use http::{header::ACCEPT, HeaderMap, HeaderName, HeaderValue};
use http_client::{settings::HttpClientSettings, FetchError, RetryPolicy, RetryingFetcher};
use types::{CatalogEntry, MarketEntry};

pub mod types;

const PUBLIC_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";

const DEMO_API_KEY_HEADER: &str = "x-cg-demo-api-key";
const PRO_API_KEY_HEADER: &str = "x-cg-pro-api-key";

pub const DEFAULT_PER_PAGE: usize = 250;

/// A checkpoint of the ranking collected so far is offered every this many pages.
pub const CHECKPOINT_EVERY: usize = 5;

pub struct CoingeckoClient {
    fetcher: RetryingFetcher,
    base_url: String,
    per_page: usize,
}

impl CoingeckoClient {
    /// Public api, authenticated with a demo key when one is configured.
    pub fn new(settings: &HttpClientSettings, policy: RetryPolicy) -> anyhow::Result<Self> {
        Self::build(settings, policy, PUBLIC_BASE_URL, DEMO_API_KEY_HEADER)
    }

    pub fn new_pro(settings: &HttpClientSettings, policy: RetryPolicy) -> anyhow::Result<Self> {
        Self::build(settings, policy, PRO_BASE_URL, PRO_API_KEY_HEADER)
    }

    fn build(
        settings: &HttpClientSettings,
        policy: RetryPolicy,
        base_url: &str,
        key_header: &'static str,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::from_iter([(ACCEPT, HeaderValue::from_static("application/json"))]);

        if let Some(api_key) = &settings.api_key {
            headers.insert(
                HeaderName::from_static(key_header),
                api_key.as_str().try_into().context("Invalid coingecko api key")?,
            );
        };

        let client = reqwest::ClientBuilder::new()
            .tcp_keepalive(Some(settings.tcp_keepalive))
            .pool_idle_timeout(Some(settings.pool_idle_timeout))
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .context("Unable to build coingecko client")?;

        Ok(Self {
            fetcher: RetryingFetcher::new(client, policy, "coingecko"),
            base_url: base_url.to_string(),
            per_page: DEFAULT_PER_PAGE,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }

    /// The complete coin catalog, including contract addresses per platform.
    pub async fn coins_list_with_platforms(&self) -> Result<Vec<CatalogEntry>, FetchError> {
        tracing::info!("fetching complete coin list with platform details");
        let url = format!("{base_url}/coins/list", base_url = self.base_url);

        self.fetcher
            .fetch(|client| client.get(&url).query(&[("include_platform", "true")]))
            .await
    }

    pub async fn coins_markets_page(&self, page: usize) -> Result<Vec<MarketEntry>, FetchError> {
        let url = format!("{base_url}/coins/markets", base_url = self.base_url);

        self.fetcher
            .fetch(|client| {
                client
                    .get(&url)
                    .query(&[
                        ("vs_currency", "usd"),
                        ("order", "market_cap_desc"),
                        ("sparkline", "false"),
                    ])
                    .query(&[("per_page", self.per_page), ("page", page)])
            })
            .await
    }

    /// Every page of `/coins/markets`, concatenated in fetch order. An empty page ends the ranking.
    ///
    /// `checkpoint` receives the ranking collected so far after every [`CHECKPOINT_EVERY`] pages.
    pub async fn all_coins_by_market_cap(
        &self,
        mut checkpoint: impl FnMut(&[MarketEntry]),
    ) -> Result<Vec<MarketEntry>, FetchError> {
        tracing::info!("fetching all coins sorted by market cap");
        let mut coins = Vec::new();

        for page in 1.. {
            tracing::debug!(page, "fetching market data");
            let entries = self.coins_markets_page(page).await?;
            if entries.is_empty() {
                tracing::info!(page, "no more coins returned, reached the end of available data");
                break;
            }

            coins.extend(entries);
            tracing::debug!(collected = coins.len(), "collected coins so far");

            if page % CHECKPOINT_EVERY == 0 {
                checkpoint(&coins);
            }
        }

        tracing::info!(total = coins.len(), "total coins collected by market cap");
        Ok(coins)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use claims::{assert_err, assert_ok};
    use http_client::OnThrottle;
    use serde_json::json;
    use wiremock::{
        matchers::{header, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            pacing: Duration::ZERO,
            throttle_cooldown: Duration::ZERO,
            on_throttle: OnThrottle::Wait,
            max_retries: 2,
            backoff_base: Duration::ZERO,
            backoff_step: Duration::ZERO,
        }
    }

    fn client(server: &MockServer) -> CoingeckoClient {
        CoingeckoClient::new(&HttpClientSettings::with_api_key("demo-key"), instant_policy())
            .unwrap()
            .with_base_url(server.uri())
    }

    fn market_page(ids: &[String]) -> serde_json::Value {
        ids.iter()
            .map(|id| json!({"id": id, "symbol": id, "name": id, "market_cap": 1.0, "current_price": null, "image": null}))
            .collect()
    }

    #[tokio::test]
    async fn catalog_is_requested_with_platforms_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .and(query_param("include_platform", "true"))
            .and(header("x-cg-demo-api-key", "demo-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "tok1", "symbol": "t1", "name": "Token 1", "platforms": {"ethereum": "0xABC", "solana": ""}},
                {"id": "ethereum", "symbol": "eth", "name": "Ethereum", "platforms": {}},
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = assert_ok!(client(&server).coins_list_with_platforms().await);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[0].platform_address("ethereum"), Some("0xABC"));
        assert_eq!(catalog[0].platform_address("solana"), None);
        assert_eq!(catalog[1].platform_address("ethereum"), None);
    }

    #[tokio::test]
    async fn ranking_concatenates_pages_until_empty() {
        let server = MockServer::start().await;
        for page in 1..=6 {
            let body = if page == 6 {
                json!([])
            } else {
                market_page(&[format!("coin{page}a"), format!("coin{page}b")])
            };
            Mock::given(method("GET"))
                .and(path("/coins/markets"))
                .and(query_param("vs_currency", "usd"))
                .and(query_param("order", "market_cap_desc"))
                .and(query_param("per_page", "250"))
                .and(query_param("page", page.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut checkpoints = Vec::new();
        let coins = assert_ok!(
            client(&server)
                .all_coins_by_market_cap(|coins| checkpoints.push(coins.len()))
                .await
        );

        let ids: Vec<_> = coins.iter().map(|coin| coin.id.as_str()).collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(ids[0], "coin1a");
        assert_eq!(ids[9], "coin5b");
        assert_eq!(checkpoints, vec![10]);
    }

    #[tokio::test]
    async fn ranking_failure_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/markets"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        assert_err!(client(&server).all_coins_by_market_cap(|_| {}).await);
    }
}
