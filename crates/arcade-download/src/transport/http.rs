//! Reqwest-backed mirror transport.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use arcade_core::{InstallError, InstallResult, Mirror};

use super::{MirrorTransport, TransferStream};

/// Default user agent sent to mirrors.
const USER_AGENT: &str = concat!("arcade/", env!("CARGO_PKG_VERSION"));

/// Production transport using reqwest streaming responses.
///
/// No overall request timeout is set: the engine applies its own per-attempt
/// timeout to connecting and to every gap between chunks, so large healthy
/// downloads are never cut off.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given connect timeout.
    pub fn new(connect_timeout: Duration) -> InstallResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| InstallError::other(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared with other adapters).
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MirrorTransport for ReqwestTransport {
    async fn open(&self, mirror: &Mirror) -> InstallResult<TransferStream> {
        let response = self
            .client
            .get(&mirror.url)
            .send()
            .await
            .map_err(|e| InstallError::network(&mirror.name, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::http_status(&mirror.name, status.as_u16()));
        }

        let content_length = response.content_length();
        let name = mirror.name.clone();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| InstallError::network(&name, describe(&e))))
            .boxed();

        Ok(TransferStream {
            content_length,
            body,
        })
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
