//! Error types for asset staging.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::concurrency::{BatchError, Transient};

/// Errors raised while materializing a request's assets.
#[derive(Debug, Error)]
pub enum AssetError {
    /// A local source does not exist.
    #[error("Asset not found: {path}")]
    Missing { path: PathBuf },

    /// A URL could not be parsed.
    #[error("Invalid asset URL: {url}")]
    InvalidUrl { url: String },

    /// Upstream answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// The request never produced a response.
    #[error("Request to {url} failed: {message}")]
    Request {
        url: String,
        message: String,
        transient: bool,
    },

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Embedded payload is not valid base64.
    #[error("Invalid embedded data: {0}")]
    Decode(String),

    /// Writing or reading a staged file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// One or more downloads of a batch failed.
    #[error("Asset download failed: {0}")]
    Batch(#[from] BatchError),
}

impl AssetError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            transient: e.is_connect() || e.is_timeout() || e.is_request(),
            message: e.to_string(),
        }
    }
}

impl Transient for AssetError {
    /// Rate limiting, server errors and connection failures.
    fn is_transient(&self) -> bool {
        match self {
            AssetError::Status { status, .. } => *status == 429 || *status >= 500,
            AssetError::Request { transient, .. } => *transient,
            _ => false,
        }
    }
}
