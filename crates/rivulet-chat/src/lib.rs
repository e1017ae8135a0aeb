// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming chat pipeline for the Rivulet client.
//!
//! Data flows from a user submission through the [`SessionRegistry`] into a
//! session's [`Timeline`], the [`StreamController`] opens the request and
//! turns decoded frames into stream events, and the [`reducer`] folds each
//! event into the in-flight assistant turn. [`ChatClient`] ties the pieces
//! together for a display layer.

pub mod client;
pub mod controller;
pub mod reducer;
pub mod registry;
pub mod session;
pub mod timeline;

pub use client::{ChatClient, StreamOutcome, SubmitHandle, TimelineUpdate};
pub use controller::{StreamController, Subscription};
pub use reducer::reduce;
pub use registry::SessionRegistry;
pub use session::{Session, SessionSummary};
pub use timeline::{Timeline, TimelineSnapshot};
