//! Manifest provider and network probe for the arcade launcher.
//!
//! This crate implements the core `ManifestProviderPort` and
//! `NetworkProbePort` over HTTP:
//!
//! - [`HttpManifestProvider`] fetches the remote manifest with retry and
//!   falls back to the last cached copy when offline
//! - [`FileManifestProvider`] reads a manifest from disk
//! - [`HttpNetworkProbe`] tracks connectivity on an interval

mod cache;
mod config;
mod error;
mod http;
mod probe;
mod provider;

pub use cache::{CachedCopy, ManifestCache};
pub use config::{DEFAULT_MANIFEST_URL, ManifestClientConfig};
pub use error::{FetchError, FetchResult};
pub use http::{HttpBackend, ReqwestBackend};
pub use probe::HttpNetworkProbe;
pub use provider::{FileManifestProvider, HttpManifestProvider};

#[cfg(any(test, feature = "test-utils"))]
pub use http::testing;
