use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::time::Duration;

#[serde_as]
#[derive(Deserialize, Eq, PartialEq, Debug, Clone)]
pub struct HttpClientSettings {
    #[serde(rename = "tcp_keepalive_sec", default = "HttpClientSettings::default_tcp_keepalive")]
    #[serde_as(as = "DurationSeconds")]
    pub tcp_keepalive: Duration,
    #[serde(
        rename = "pool_idle_timeout_sec",
        default = "HttpClientSettings::default_pool_idle_timeout"
    )]
    #[serde_as(as = "DurationSeconds")]
    pub pool_idle_timeout: Duration,
    #[serde(rename = "timeout_sec", default = "HttpClientSettings::default_timeout")]
    #[serde_as(as = "DurationSeconds")]
    pub timeout: Duration,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl TryFrom<&HttpClientSettings> for reqwest::Client {
    type Error = reqwest::Error;

    fn try_from(settings: &HttpClientSettings) -> Result<Self, Self::Error> {
        reqwest::ClientBuilder::new()
            .tcp_keepalive(Some(settings.tcp_keepalive))
            .pool_idle_timeout(Some(settings.pool_idle_timeout))
            .timeout(settings.timeout)
            .build()
    }
}

impl HttpClientSettings {
    fn default_tcp_keepalive() -> Duration {
        Duration::from_secs(20)
    }

    fn default_pool_idle_timeout() -> Duration {
        Duration::from_secs(20)
    }

    fn default_timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }
}

impl Default for HttpClientSettings {
    fn default() -> Self {
        Self {
            tcp_keepalive: Self::default_tcp_keepalive(),
            pool_idle_timeout: Self::default_pool_idle_timeout(),
            timeout: Self::default_timeout(),
            api_key: None,
        }
    }
}
