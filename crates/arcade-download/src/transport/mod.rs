//! Mirror transport abstraction.
//!
//! The engine only needs "open this mirror and give me a byte stream". The
//! production implementation uses reqwest; tests substitute a scripted
//! transport so fallback, timeouts and cancellation can be driven precisely.

mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use arcade_core::{InstallResult, Mirror};

pub use http::ReqwestTransport;

/// An opened transfer: optional length plus the body stream.
pub struct TransferStream {
    /// Length announced by the server, if any.
    pub content_length: Option<u64>,
    /// Body chunks. Errors are reported per mirror and are normally recoverable.
    pub body: BoxStream<'static, InstallResult<Bytes>>,
}

impl std::fmt::Debug for TransferStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Opens streamed transfers from mirrors.
///
/// Implementations map connection failures to `InstallError::Network` and
/// non-success responses to `InstallError::HttpStatus`, so the engine can
/// fall back to the next mirror.
#[async_trait]
pub trait MirrorTransport: Send + Sync {
    /// Open a transfer for `mirror`.
    async fn open(&self, mirror: &Mirror) -> InstallResult<TransferStream>;
}
