#[cfg(feature = "settings")]
pub mod settings;
#[cfg(feature = "telemetry")]
pub mod telemetry;

#[cfg(feature = "settings")]
pub extern crate config;
