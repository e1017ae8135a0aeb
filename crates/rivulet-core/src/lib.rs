// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Rivulet chat client.
//!
//! This crate provides the error type, the turn and wire-protocol types,
//! and the [`ChatTransport`] trait that the streaming pipeline is written
//! against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RivuletError;
pub use traits::{ChatTransport, FrameStream};
pub use types::{
    Attachment, AttachmentKind, ChatRequest, Frame, HealthStatus, Role, SessionId, StreamEvent,
    Turn, TurnId, TurnState, WireMessage,
};
