pub mod error;
pub mod retry;
pub mod settings;

pub use error::FetchError;
pub use retry::{LinearBackoff, OnThrottle, RetryOverrides, RetryPolicy, RetryingFetcher};
