use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use backoff::backoff::Backoff;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::error::FetchError;

/// What to do when a provider answers `429 Too Many Requests`.
#[derive(Debug, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OnThrottle {
    /// Cool down and repeat the call. Does not spend the retry budget.
    Wait,
    /// Cool down and repeat the call once, then give up with [`FetchError::Throttled`].
    RetryOnce,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Sleep after every successful call, sized to the provider's published rate limit.
    #[serde(rename = "pacing_ms")]
    #[serde_as(as = "DurationMilliSeconds")]
    pub pacing: Duration,
    #[serde(rename = "throttle_cooldown_ms")]
    #[serde_as(as = "DurationMilliSeconds")]
    pub throttle_cooldown: Duration,
    pub on_throttle: OnThrottle,
    /// Total number of attempts for transient failures.
    pub max_retries: usize,
    #[serde(rename = "backoff_base_ms")]
    #[serde_as(as = "DurationMilliSeconds")]
    pub backoff_base: Duration,
    #[serde(rename = "backoff_step_ms")]
    #[serde_as(as = "DurationMilliSeconds")]
    pub backoff_step: Duration,
}

impl RetryPolicy {
    /// CoinGecko public tier allows 30 calls per minute.
    pub fn catalog() -> Self {
        Self {
            pacing: Duration::from_secs(2),
            throttle_cooldown: Duration::from_secs(60),
            on_throttle: OnThrottle::Wait,
            max_retries: 5,
            backoff_base: Duration::from_secs(2),
            backoff_step: Duration::from_secs(10),
        }
    }

    /// Alchemy allows 20 calls per second.
    pub fn metadata() -> Self {
        Self {
            pacing: Duration::from_millis(50),
            throttle_cooldown: Duration::from_secs(2),
            on_throttle: OnThrottle::RetryOnce,
            max_retries: 2,
            backoff_base: Duration::from_millis(50),
            backoff_step: Duration::from_millis(500),
        }
    }

    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.backoff_base, self.backoff_step, self.max_retries)
    }

    /// Reads a settings section on top of [`RetryPolicy::catalog`].
    pub fn deserialize_catalog<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RetryOverrides::deserialize(deserializer).map(|overrides| overrides.apply(Self::catalog()))
    }

    /// Reads a settings section on top of [`RetryPolicy::metadata`].
    pub fn deserialize_metadata<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RetryOverrides::deserialize(deserializer).map(|overrides| overrides.apply(Self::metadata()))
    }
}

/// A partial [`RetryPolicy`]; absent fields keep the base policy's value.
#[serde_as]
#[derive(Debug, Deserialize, Clone, Default, Eq, PartialEq)]
#[serde(default)]
pub struct RetryOverrides {
    #[serde(rename = "pacing_ms")]
    #[serde_as(as = "Option<DurationMilliSeconds>")]
    pub pacing: Option<Duration>,
    #[serde(rename = "throttle_cooldown_ms")]
    #[serde_as(as = "Option<DurationMilliSeconds>")]
    pub throttle_cooldown: Option<Duration>,
    pub on_throttle: Option<OnThrottle>,
    pub max_retries: Option<usize>,
    #[serde(rename = "backoff_base_ms")]
    #[serde_as(as = "Option<DurationMilliSeconds>")]
    pub backoff_base: Option<Duration>,
    #[serde(rename = "backoff_step_ms")]
    #[serde_as(as = "Option<DurationMilliSeconds>")]
    pub backoff_step: Option<Duration>,
}

impl RetryOverrides {
    pub fn apply(self, base: RetryPolicy) -> RetryPolicy {
        RetryPolicy {
            pacing: self.pacing.unwrap_or(base.pacing),
            throttle_cooldown: self.throttle_cooldown.unwrap_or(base.throttle_cooldown),
            on_throttle: self.on_throttle.unwrap_or(base.on_throttle),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            backoff_base: self.backoff_base.unwrap_or(base.backoff_base),
            backoff_step: self.backoff_step.unwrap_or(base.backoff_step),
        }
    }
}

/// `base + step * attempt`, stopping once `max_retries` attempts have been made.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base: Duration,
    step: Duration,
    max_retries: usize,
    attempt: usize,
}

impl LinearBackoff {
    pub fn new(base: Duration, step: Duration, max_retries: usize) -> Self {
        Self {
            base,
            step,
            max_retries,
            attempt: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_retries {
            return None;
        }

        let attempt = u32::try_from(self.attempt).unwrap_or(u32::MAX);
        Some(self.base + self.step.saturating_mul(attempt))
    }
}

/// Wraps an HTTP client with pacing, throttling recovery and linear backoff.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: Client,
    policy: RetryPolicy,
    provider: String,
}

impl RetryingFetcher {
    pub fn new(client: Client, policy: RetryPolicy, provider: impl Into<String>) -> Self {
        Self {
            client,
            policy,
            provider: provider.into(),
        }
    }

    /// Runs `request` until it yields a decoded JSON document or the policy gives up.
    ///
    /// `request` is invoked once per attempt, so it must rebuild the same call every time.
    pub async fn fetch<T, F>(&self, request: F) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let throttled = AtomicBool::new(false);

        let value = backoff::future::retry_notify(
            self.policy.backoff(),
            || async { self.attempt(request(&self.client), &throttled).await },
            |err: FetchError, wait: Duration| {
                if err.is_throttled() {
                    tracing::warn!(provider = %self.provider, ?wait, "rate limit hit, cooling down");
                } else {
                    tracing::warn!(provider = %self.provider, %err, ?wait, "request failed, retrying");
                }
            },
        )
        .await?;

        tokio::time::sleep(self.policy.pacing).await;
        Ok(value)
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        throttled: &AtomicBool,
    ) -> Result<T, backoff::Error<FetchError>> {
        send(request).await.map_err(|err| {
            if err.is_throttled() {
                return match self.policy.on_throttle {
                    OnThrottle::Wait => backoff::Error::retry_after(err, self.policy.throttle_cooldown),
                    OnThrottle::RetryOnce if !throttled.swap(true, Ordering::SeqCst) => {
                        backoff::Error::retry_after(err, self.policy.throttle_cooldown)
                    },
                    OnThrottle::RetryOnce => backoff::Error::permanent(err),
                };
            }

            if err.is_transient() {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            }
        })
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, FetchError> {
    let response = request.send().await.map_err(FetchError::transport)?;
    let status = response.status();
    let host = response.url().host_str().unwrap_or_default().to_owned();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::Throttled { host });
    }

    if !status.is_success() {
        return Err(FetchError::Status { host, status });
    }

    let body = response.bytes().await.map_err(FetchError::transport)?;
    Ok(serde_json::from_slice(&body)?)
}
