//! Error types for storage, the remote search API, and configuration loading.

use thiserror::Error;

/// Failure reading or writing the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a call to the provider search API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[cfg(feature = "http")]
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode search response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Short message suitable for showing to the user in place of results.
    pub fn user_notice(&self) -> String {
        match self {
            #[cfg(feature = "http")]
            ApiError::Http(e) if e.is_timeout() => {
                "The search took too long. Please try again.".to_string()
            }
            #[cfg(feature = "http")]
            ApiError::Http(_) => "Could not reach the server. Check your connection.".to_string(),
            ApiError::Status { status, .. } if *status >= 500 => {
                "The search service is having trouble. Please try again later.".to_string()
            }
            ApiError::Status { .. } | ApiError::Decode(_) => {
                "Search failed. Please try again.".to_string()
            }
        }
    }
}

/// Failure loading `.glowbook.toml` when the caller asked for strict loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}
