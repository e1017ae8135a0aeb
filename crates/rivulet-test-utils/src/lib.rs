// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Rivulet integration tests.
//!
//! Provides a scripted in-memory transport for fast, deterministic,
//! CI-runnable tests without a chat endpoint.

pub mod scripted_transport;

pub use scripted_transport::{done_line, token_line, LiveFeed, Script, ScriptedTransport};
