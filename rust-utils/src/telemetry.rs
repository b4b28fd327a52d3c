//! Boilerplate for setting up and initializing tracing
//!
//! We are using the `tracing` crate instead of `log` for logging; records emitted through `log`
//! by dependencies are bridged into the same subscriber.
//!
//! # Usage
//! ```
//! use rust_utils::telemetry::{Telemetry, TracingSettings};
//!
//! fn main() -> anyhow::Result<()> {
//!     let tracing = TracingSettings::default(); // or use your own settings
//!
//!     let subscriber = Telemetry::init("service-name".into(), &tracing);
//!     Telemetry::init_subscriber(subscriber)?;
//!
//!     // ...
//!     Ok(())
//! }
//! ```

use anyhow::Context;
use serde::Deserialize;
use tracing::{subscriber::set_global_default, Subscriber};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

pub struct Telemetry;

impl Telemetry {
    /// Compose multiple layers into a `tracing`'s subscriber.
    ///
    /// # Implementation Notes
    ///
    /// We are using `impl Subscriber` as return type to avoid having to spell out the actual
    /// type of the returned subscriber, which is indeed quite complex.
    pub fn init(name: String, tracing_settings: &TracingSettings) -> impl Subscriber + Sync + Send {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&tracing_settings.spec));

        // Bunyan keeps span fields on every record, which plain `fmt` output does not
        let (storage_layer, formatting_layer, plain_layer) = if tracing_settings.json {
            (
                Some(JsonStorageLayer),
                Some(BunyanFormattingLayer::new(name, std::io::stdout)),
                None,
            )
        } else {
            (None, None, Some(fmt::layer().with_target(false)))
        };

        Registry::default()
            .with(env_filter)
            .with(storage_layer)
            .with(formatting_layer)
            .with(plain_layer)
    }

    /// Register a subscriber as global default to process span data.
    ///
    /// It should only be called once!
    pub fn init_subscriber(subscriber: impl Subscriber + Sync + Send) -> anyhow::Result<()> {
        LogTracer::init().context("Failed to set logger")?;
        set_global_default(subscriber).context("Failed to set subscriber")?;
        Ok(())
    }
}

#[derive(Debug, Deserialize, Eq, PartialEq, Clone)]
#[serde(default)]
pub struct TracingSettings {
    #[serde(default = "default_spec")]
    pub spec: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self {
            spec: default_spec(),
            json: false,
        }
    }
}

fn default_spec() -> String {
    "info".into()
}
