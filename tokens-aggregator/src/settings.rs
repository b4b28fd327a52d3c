use std::{path::PathBuf, time::Duration};

use http_client::{settings::HttpClientSettings, RetryPolicy};
use rust_utils::telemetry::TracingSettings;
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};

use crate::{
    chains::{default_chains, ChainDefinition},
    error::{AggregatorError, AggregatorResult},
    metadata::DEFAULT_SUI_RPC_URL,
};

pub const ENV_PREFIX: &str = "AGGREGATOR";

pub const COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CoingeckoSettings {
    pub http: HttpClientSettings,
    /// Use the pro api and its key header.
    pub pro: bool,
    pub per_page: Option<usize>,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AggregatorSettings {
    pub output_dir: PathBuf,
    #[serde(rename = "chain_pause_ms")]
    #[serde_as(as = "DurationMilliSeconds")]
    pub chain_pause: Duration,
    pub tracing: TracingSettings,
    pub coingecko: CoingeckoSettings,
    pub alchemy: HttpClientSettings,
    #[serde(deserialize_with = "RetryPolicy::deserialize_catalog")]
    pub catalog_retry: RetryPolicy,
    #[serde(deserialize_with = "RetryPolicy::deserialize_metadata")]
    pub metadata_retry: RetryPolicy,
    pub sui_rpc_url: String,
    pub chains: Vec<ChainDefinition>,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            chain_pause: Duration::from_secs(1),
            tracing: TracingSettings::default(),
            coingecko: CoingeckoSettings::default(),
            alchemy: HttpClientSettings::default(),
            catalog_retry: RetryPolicy::catalog(),
            metadata_retry: RetryPolicy::metadata(),
            sui_rpc_url: DEFAULT_SUI_RPC_URL.to_owned(),
            chains: default_chains(),
        }
    }
}

impl AggregatorSettings {
    pub fn logs_dir(&self) -> PathBuf {
        self.output_dir.join("logs")
    }
}

/// Api keys required before any work starts.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Credentials {
    pub coingecko_api_key: String,
    pub alchemy_api_key: String,
}

impl Credentials {
    /// Environment first, then settings.
    pub fn resolve(settings: &AggregatorSettings) -> AggregatorResult<Self> {
        Self::resolve_with(settings, |name| std::env::var(name).ok())
    }

    pub fn resolve_with(
        settings: &AggregatorSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AggregatorResult<Self> {
        let resolve = |name: &'static str, configured: &Option<String>| {
            lookup(name)
                .or_else(|| configured.clone())
                .filter(|key| !key.trim().is_empty())
                .ok_or(AggregatorError::MissingCredential(name))
        };

        Ok(Self {
            coingecko_api_key: resolve(COINGECKO_API_KEY, &settings.coingecko.http.api_key)?,
            alchemy_api_key: resolve(ALCHEMY_API_KEY, &settings.alchemy.api_key)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use claims::{assert_matches, assert_ok};
    use http_client::OnThrottle;
    use token_address::ChainFamily;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_cover_all_chains() {
        let settings = AggregatorSettings::default();

        assert_eq!(settings.chains.len(), 10);
        assert_eq!(settings.chain_pause, Duration::from_secs(1));
        assert_eq!(settings.logs_dir(), PathBuf::from("./logs"));
        assert_eq!(settings.metadata_retry.on_throttle, OnThrottle::RetryOnce);
    }

    #[test]
    fn reads_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.toml");
        std::fs::write(
            &file,
            r#"
output_dir = "/data/tokens"
chain_pause_ms = 250

[coingecko]
pro = true

[coingecko.http]
timeout_sec = 10

[catalog_retry]
max_retries = 3

[metadata_retry]
pacing_ms = 100

[[chains]]
name = "ethereum"
platform = "ethereum"
family = "evm"
network = "eth-mainnet"

[[chains]]
name = "sui"
platform = "sui"
family = "sui"
"#,
        )
        .unwrap();

        let settings: AggregatorSettings = assert_ok!(rust_utils::settings::try_read_file_config::<
            _,
            AggregatorError,
        >(file.to_str().unwrap(), "AGGREGATOR_SETTINGS_TEST"));

        assert_eq!(settings.output_dir, PathBuf::from("/data/tokens"));
        assert_eq!(settings.chain_pause, Duration::from_millis(250));
        assert!(settings.coingecko.pro);
        assert_eq!(settings.coingecko.http.timeout, Duration::from_secs(10));
        assert_eq!(settings.chains.len(), 2);
        assert_eq!(settings.chains[1].family, ChainFamily::Sui);
        assert_eq!(settings.chains[1].network, None);
        assert_eq!(settings.catalog_retry, RetryPolicy {
            max_retries: 3,
            ..RetryPolicy::catalog()
        });
        assert_eq!(settings.metadata_retry.pacing, Duration::from_millis(100));
        assert_eq!(settings.metadata_retry.on_throttle, OnThrottle::RetryOnce);
    }

    #[test]
    fn environment_overrides_nested_sections() {
        std::env::set_var("AGGREGATOR_ENV_TEST__COINGECKO__HTTP__TIMEOUT_SEC", "5");
        std::env::set_var("AGGREGATOR_ENV_TEST__ALCHEMY__TIMEOUT_SEC", "7");
        std::env::set_var("AGGREGATOR_ENV_TEST__CATALOG_RETRY__MAX_RETRIES", "4");

        let settings: AggregatorSettings = assert_ok!(rust_utils::settings::try_read_file_config::<
            _,
            AggregatorError,
        >("missing-settings-file", "AGGREGATOR_ENV_TEST"));

        assert_eq!(settings.coingecko.http.timeout, Duration::from_secs(5));
        assert_eq!(settings.alchemy.timeout, Duration::from_secs(7));
        assert_eq!(settings.catalog_retry, RetryPolicy {
            max_retries: 4,
            ..RetryPolicy::catalog()
        });
        assert_eq!(settings.chains.len(), 10);
    }

    #[test]
    fn environment_takes_precedence_over_settings() {
        let mut settings = AggregatorSettings::default();
        settings.coingecko.http.api_key = Some("from-settings".into());
        settings.alchemy.api_key = Some("alchemy-from-settings".into());

        let credentials = assert_ok!(Credentials::resolve_with(
            &settings,
            env(&[(COINGECKO_API_KEY, "from-env")])
        ));

        assert_eq!(credentials, Credentials {
            coingecko_api_key: "from-env".into(),
            alchemy_api_key: "alchemy-from-settings".into(),
        });
    }

    #[test]
    fn missing_or_blank_credentials_are_fatal() {
        let settings = AggregatorSettings::default();

        assert_matches!(
            Credentials::resolve_with(&settings, env(&[(COINGECKO_API_KEY, "key")])),
            Err(AggregatorError::MissingCredential(ALCHEMY_API_KEY))
        );
        assert_matches!(
            Credentials::resolve_with(&settings, env(&[(COINGECKO_API_KEY, " "), (ALCHEMY_API_KEY, "key")])),
            Err(AggregatorError::MissingCredential(COINGECKO_API_KEY))
        );
    }
}
