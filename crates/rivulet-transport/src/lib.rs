// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport layer for the Rivulet chat client.
//!
//! [`ndjson`] turns a chunked byte stream into frames; [`http`] provides the
//! reqwest-backed [`ChatTransport`](rivulet_core::ChatTransport) used by the
//! binary.

pub mod http;
pub mod ndjson;
pub mod types;

pub use http::HttpTransport;
pub use ndjson::{decode_frames, FrameDecoder};
pub use types::{HealthResponse, ModelInfo, ProviderInfo};
