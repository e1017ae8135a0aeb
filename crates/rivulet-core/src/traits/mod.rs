// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the chat pipeline and its collaborators.

pub mod transport;

pub use transport::{ChatTransport, FrameStream};
