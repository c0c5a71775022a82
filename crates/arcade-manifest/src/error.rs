//! Internal error types for manifest fetching.
//!
//! These errors are internal to `arcade-manifest` and are mapped to the core
//! `ManifestError` at the port boundary.

use arcade_core::ManifestError;
use thiserror::Error;

/// Result type alias for HTTP fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors raised by the HTTP backend.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Network or HTTP client error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Anything else (fake backends, unexpected responses).
    #[error("{0}")]
    Other(String),
}

impl From<FetchError> for ManifestError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Status { status, url } => Self::HttpStatus { status, url },
            other => Self::Request(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_http_status() {
        let err: ManifestError = FetchError::Status {
            status: 503,
            url: "https://x.example/m.json".to_string(),
        }
        .into();
        assert!(matches!(err, ManifestError::HttpStatus { status: 503, .. }));
    }

    #[test]
    fn test_other_maps_to_request() {
        let err: ManifestError = FetchError::Other("boom".to_string()).into();
        assert!(matches!(err, ManifestError::Request(ref m) if m == "boom"));
    }
}
