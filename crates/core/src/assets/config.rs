//! Configuration for asset fetching.

use serde::{Deserialize, Serialize};

use crate::concurrency::RetryConfig;

/// Limits applied to remote asset downloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Maximum downloads in flight.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Ceiling on requests started in any trailing minute.
    #[serde(default = "default_calls_per_minute")]
    pub calls_per_minute: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent upstream.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_calls_per_minute() -> u32 {
    60
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("montage/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            calls_per_minute: default_calls_per_minute(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            retry: RetryConfig::default(),
        }
    }
}
