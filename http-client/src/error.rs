use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single remote call.
///
/// Hosts are kept instead of full urls: some providers carry the api key in the path.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{host} responded with {status}")]
    Status { host: String, status: StatusCode },

    #[error("{host} is throttling requests")]
    Throttled { host: String },

    #[error("unable to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }

    /// Transport and protocol failures are worth another attempt, malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Status { .. } | Self::Throttled { .. } => true,
            Self::Decode(_) => false,
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}
