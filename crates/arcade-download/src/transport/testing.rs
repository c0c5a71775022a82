//! Scripted transport for tests.
//!
//! Each mirror URL is bound to a [`MirrorScript`] describing how the fake
//! server behaves. Every `open` call is recorded so tests can assert the
//! exact attempt sequence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::Notify;

use arcade_core::{InstallError, InstallResult, Mirror};

use super::{MirrorTransport, TransferStream};

/// How a scripted mirror behaves when opened.
#[derive(Clone)]
pub enum MirrorScript {
    /// Serve `body` in chunks of `chunk_size`, announcing its length.
    Serve {
        body: Vec<u8>,
        chunk_size: usize,
        chunk_delay: Option<Duration>,
    },
    /// Answer with an HTTP status.
    Status(u16),
    /// Fail to connect.
    ConnectError(String),
    /// Never answer (the attempt timeout fires).
    Hang,
    /// Announce `declared` bytes but close after sending `body`.
    Truncated { body: Vec<u8>, declared: u64 },
    /// Send `body`, then stall forever.
    StallAfter { body: Vec<u8> },
    /// Wait for `gate` to be notified, then serve `body`.
    Gated { gate: Arc<Notify>, body: Vec<u8> },
}

impl MirrorScript {
    /// Serve `body` in 64-byte chunks with no delay.
    pub fn serve(body: impl Into<Vec<u8>>) -> Self {
        Self::Serve {
            body: body.into(),
            chunk_size: 64,
            chunk_delay: None,
        }
    }

    /// Serve `body` slowly.
    pub fn serve_slowly(body: impl Into<Vec<u8>>, chunk_size: usize, delay: Duration) -> Self {
        Self::Serve {
            body: body.into(),
            chunk_size: chunk_size.max(1),
            chunk_delay: Some(delay),
        }
    }
}

/// Transport that replays scripts per URL.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<HashMap<String, MirrorScript>>>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    /// Create an empty transport. Unscripted URLs answer HTTP 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a script to a URL.
    pub fn with(self, url: &str, script: MirrorScript) -> Self {
        self.set(url, script);
        self
    }

    /// Bind or replace a script.
    pub fn set(&self, url: &str, script: MirrorScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
    }

    /// URLs opened so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    /// Forget recorded attempts.
    pub fn clear_attempts(&self) {
        self.attempts.lock().unwrap().clear();
    }
}

fn chunked(body: Vec<u8>, chunk_size: usize) -> Vec<InstallResult<Bytes>> {
    body.chunks(chunk_size.max(1))
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

#[async_trait]
impl MirrorTransport for ScriptedTransport {
    async fn open(&self, mirror: &Mirror) -> InstallResult<TransferStream> {
        self.attempts.lock().unwrap().push(mirror.url.clone());
        let script = self.scripts.lock().unwrap().get(&mirror.url).cloned();

        match script {
            None => Err(InstallError::http_status(&mirror.name, 404)),
            Some(MirrorScript::Status(code)) => Err(InstallError::http_status(&mirror.name, code)),
            Some(MirrorScript::ConnectError(message)) => {
                Err(InstallError::network(&mirror.name, message))
            }
            Some(MirrorScript::Hang) => std::future::pending().await,
            Some(MirrorScript::Serve {
                body,
                chunk_size,
                chunk_delay,
            }) => {
                let len = body.len() as u64;
                let chunks = chunked(body, chunk_size);
                let body = match chunk_delay {
                    None => stream::iter(chunks).boxed(),
                    Some(delay) => stream::iter(chunks)
                        .then(move |chunk| async move {
                            tokio::time::sleep(delay).await;
                            chunk
                        })
                        .boxed(),
                };
                Ok(TransferStream {
                    content_length: Some(len),
                    body,
                })
            }
            Some(MirrorScript::Truncated { body, declared }) => Ok(TransferStream {
                content_length: Some(declared),
                body: stream::iter(chunked(body, 64)).boxed(),
            }),
            Some(MirrorScript::StallAfter { body }) => Ok(TransferStream {
                content_length: None,
                body: stream::iter(chunked(body, 64))
                    .chain(stream::pending())
                    .boxed(),
            }),
            Some(MirrorScript::Gated { gate, body }) => {
                gate.notified().await;
                let len = body.len() as u64;
                Ok(TransferStream {
                    content_length: Some(len),
                    body: stream::iter(chunked(body, 64)).boxed(),
                })
            }
        }
    }
}
