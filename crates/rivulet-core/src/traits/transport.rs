// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for opening streaming chat requests.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::RivuletError;
use crate::types::{ChatRequest, Frame, HealthStatus};

/// A lazily decoded sequence of frames.
///
/// An `Err` item means the connection failed mid-stream; the sequence ends
/// after it. Malformed lines never appear here, the decoder drops them.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, RivuletError>> + Send>>;

/// Opens chat requests against a language-model endpoint.
///
/// The HTTP implementation lives in `rivulet-transport`; tests use the
/// scripted transport from `rivulet-test-utils`.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Returns the human-readable name of this transport.
    fn name(&self) -> &str;

    /// Sends the request and returns the decoded response frames.
    ///
    /// Fails with [`RivuletError::TransportOpen`] when the request cannot be
    /// sent or the endpoint answers with a non-success status.
    async fn open_stream(&self, request: &ChatRequest) -> Result<FrameStream, RivuletError>;

    /// Probes the endpoint and reports whether it can serve chat requests.
    async fn health_check(&self) -> Result<HealthStatus, RivuletError>;
}
