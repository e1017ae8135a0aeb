// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted chat transport for deterministic testing.
//!
//! `ScriptedTransport` implements `ChatTransport` by replaying queued
//! [`Script`]s. Byte chunks go through the real NDJSON decoder, so tests
//! exercise the same path as the HTTP transport without a network.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use tokio::sync::{mpsc, Mutex};

use rivulet_core::{ChatRequest, ChatTransport, FrameStream, HealthStatus, RivuletError};
use rivulet_transport::decode_frames;

type ByteItem = Result<Bytes, std::io::Error>;

/// What the transport does for one `open_stream` call.
#[derive(Debug)]
pub enum Script {
    /// Delivers the chunks, then ends the body.
    Chunks(Vec<Bytes>),
    /// Delivers the chunks, then never yields again.
    ChunksThenHang(Vec<Bytes>),
    /// Fails to open with the given status and message.
    OpenFailure {
        status: Option<u16>,
        message: String,
    },
    /// Delivers the chunks, then fails with a read error.
    MidStreamError { chunks: Vec<Bytes>, message: String },
    /// Delivers whatever the paired [`LiveFeed`] sends, ending when it is dropped.
    Live(mpsc::UnboundedReceiver<Bytes>),
}

impl Script {
    /// A complete reply: one token line per entry, then a terminal line.
    pub fn reply(tokens: &[&str], model: &str, total_tokens: u64) -> Self {
        let mut chunks: Vec<Bytes> = tokens.iter().map(|t| token_line(t)).collect();
        chunks.push(done_line(Some(model), Some(total_tokens)));
        Script::Chunks(chunks)
    }

    /// A live script and the handle that feeds it.
    pub fn live() -> (Self, LiveFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Script::Live(rx), LiveFeed { tx })
    }

    fn into_frames(self) -> Result<FrameStream, RivuletError> {
        match self {
            Script::Chunks(chunks) => Ok(decode_frames(stream::iter(ok_items(chunks)))),
            Script::ChunksThenHang(chunks) => Ok(decode_frames(
                stream::iter(ok_items(chunks)).chain(stream::pending()),
            )),
            Script::OpenFailure { status, message } => {
                Err(RivuletError::TransportOpen { status, message })
            }
            Script::MidStreamError { chunks, message } => {
                let mut items = ok_items(chunks);
                items.push(Err(std::io::Error::other(message)));
                Ok(decode_frames(stream::iter(items)))
            }
            Script::Live(rx) => Ok(decode_frames(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|chunk| (Ok::<_, std::io::Error>(chunk), rx))
            }))),
        }
    }
}

/// Sender side of [`Script::live`].
#[derive(Debug, Clone)]
pub struct LiveFeed {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl LiveFeed {
    /// Sends raw bytes. Returns false once the stream has been dropped.
    pub fn send(&self, chunk: impl Into<Bytes>) -> bool {
        self.tx.send(chunk.into()).is_ok()
    }

    pub fn token(&self, text: &str) -> bool {
        self.send(token_line(text))
    }

    pub fn done(&self, model: Option<&str>, total_tokens: Option<u64>) -> bool {
        self.send(done_line(model, total_tokens))
    }
}

/// One encoded `{"token":..,"done":false}` line.
pub fn token_line(text: &str) -> Bytes {
    line(serde_json::json!({ "token": text, "done": false }))
}

/// One encoded terminal line.
pub fn done_line(model: Option<&str>, total_tokens: Option<u64>) -> Bytes {
    let mut value = serde_json::json!({ "token": "", "done": true });
    if let Some(model) = model {
        value["model"] = model.into();
    }
    if let Some(total) = total_tokens {
        value["totalTokens"] = total.into();
    }
    line(value)
}

fn line(value: serde_json::Value) -> Bytes {
    Bytes::from(format!("{value}\n"))
}

fn ok_items(chunks: Vec<Bytes>) -> Vec<ByteItem> {
    chunks.into_iter().map(Ok).collect()
}

/// A chat transport that replays queued scripts and records requests.
///
/// Scripts are popped from a FIFO queue. When the queue is empty, a
/// default "mock response" reply is used.
#[derive(Clone)]
pub struct ScriptedTransport {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    health: Arc<Mutex<HealthStatus>>,
}

impl ScriptedTransport {
    /// Create a transport with an empty script queue.
    pub fn new() -> Self {
        Self::with_scripts(Vec::new())
    }

    /// Create a transport pre-loaded with the given scripts.
    pub fn with_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::from(scripts))),
            requests: Arc::new(Mutex::new(Vec::new())),
            health: Arc::new(Mutex::new(HealthStatus::Healthy)),
        }
    }

    /// Add a script to the end of the queue.
    pub async fn push(&self, script: Script) {
        self.scripts.lock().await.push_back(script);
    }

    /// Sets what `health_check` reports.
    pub async fn set_health(&self, status: HealthStatus) {
        *self.health.lock().await = status;
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_script(&self) -> Script {
        self.scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::reply(&["mock response"], "mock-model", 2))
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<FrameStream, RivuletError> {
        self.requests.lock().await.push(request.clone());
        self.next_script().await.into_frames()
    }

    async fn health_check(&self) -> Result<HealthStatus, RivuletError> {
        Ok(self.health.lock().await.clone())
    }
}
