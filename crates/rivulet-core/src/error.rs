// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Rivulet chat client.

use thiserror::Error;

use crate::types::SessionId;

/// The primary error type used across the Rivulet workspace.
///
/// Decode-level problems inside an NDJSON stream never surface here; the
/// frame decoder drops malformed lines on its own. Transport failures are
/// converted into a `Failed` stream event before they reach a timeline, so
/// most of these variants are only seen by callers that talk to the
/// transport directly.
#[derive(Debug, Error)]
pub enum RivuletError {
    /// Configuration errors (invalid values, unusable endpoint settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// A send was attempted while the session still has an in-flight turn.
    #[error("session {session_id} is already streaming a response")]
    AlreadyStreaming { session_id: SessionId },

    /// The referenced session does not exist in the registry.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The chat request could not be opened (network failure or non-success status).
    #[error("failed to open stream: {message}")]
    TransportOpen {
        /// HTTP status code, when the server answered at all.
        status: Option<u16>,
        message: String,
    },

    /// The connection failed after the stream was opened.
    #[error("stream interrupted: {message}")]
    TransportStream { message: String },

    /// A non-streaming response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RivuletError {
    /// Returns `true` for failures of the underlying transport.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RivuletError::TransportOpen { .. } | RivuletError::TransportStream { .. }
        )
    }
}
