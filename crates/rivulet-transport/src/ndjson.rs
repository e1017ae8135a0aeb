// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Newline-delimited JSON frame decoding.
//!
//! The chat endpoint answers with one JSON object per line:
//!
//! ```text
//! {"token":"He","done":false}
//! {"token":"llo","done":false}
//! {"token":"","done":true,"model":"m1","total_tokens":5}
//! ```
//!
//! Chunks arrive at arbitrary byte boundaries, including inside a
//! multi-byte character. [`FrameDecoder`] buffers raw bytes and only decodes
//! a line once its terminating newline has been seen. Lines that are not
//! valid UTF-8 or not a valid frame are skipped and decoding continues.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use rivulet_core::{Frame, FrameStream, RivuletError};
use tracing::debug;

/// Incremental NDJSON decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to contain no newline.
    scanned: usize,
    skipped: u64,
}

enum Line {
    Blank,
    Frame(Frame),
    Skip(String),
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every frame completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(pos) = self.buf[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + pos;
            match parse_line(&self.buf[start..end]) {
                Line::Blank => {}
                Line::Frame(frame) => frames.push(frame),
                Line::Skip(reason) => {
                    self.skipped += 1;
                    debug!(
                        reason = %reason,
                        len = end - start,
                        skipped = self.skipped,
                        "skipping undecodable NDJSON line"
                    );
                }
            }
            start = end + 1;
            search_from = start;
        }

        self.buf.drain(..start);
        self.scanned = self.buf.len();
        frames
    }

    /// Number of lines dropped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    /// Ends decoding. An unterminated trailing line is discarded; returns its length.
    pub fn finish(self) -> usize {
        let discarded = self.buf.len();
        if discarded > 0 {
            debug!(
                discarded,
                "discarding unterminated NDJSON line at end of stream"
            );
        }
        discarded
    }
}

fn parse_line(raw: &[u8]) -> Line {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(e) => return Line::Skip(format!("invalid UTF-8: {e}")),
    };
    if text.trim().is_empty() {
        return Line::Blank;
    }
    match serde_json::from_str::<Frame>(text) {
        Ok(frame) => Line::Frame(frame),
        Err(e) => Line::Skip(e.to_string()),
    }
}

/// Decodes a chunked byte stream into a lazy stream of frames.
///
/// A read error on the underlying stream yields one
/// [`RivuletError::TransportStream`] item and ends the sequence.
pub fn decode_frames<S, E>(byte_stream: S) -> FrameStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        let mut byte_stream = std::pin::pin!(byte_stream);

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(chunk) => {
                    for frame in decoder.push(&chunk) {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    yield Err(RivuletError::TransportStream {
                        message: format!("stream read error: {e}"),
                    });
                    return;
                }
            }
        }

        decoder.finish();
    })
}
