// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single chat session and its listing summary.

use chrono::{DateTime, Utc};
use rivulet_core::SessionId;

use crate::timeline::Timeline;

/// One conversation: metadata plus its timeline.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Registry tick of the last update; orders sessions with equal `updated_at`.
    tick: u64,
    model: Option<String>,
    timeline: Timeline,
}

/// Listing row for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub preview: String,
    pub active: bool,
}

impl Session {
    pub(crate) fn new(id: SessionId, title: String, tick: u64) -> Self {
        let now = Utc::now();
        Self {
            timeline: Timeline::new(id.clone()),
            id,
            title,
            created_at: now,
            updated_at: now,
            tick,
            model: None,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Model override chosen for this session, if any.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Number of turns in the timeline.
    pub fn message_count(&self) -> usize {
        self.timeline.len()
    }

    /// Text of the latest non-empty turn on one line, cut to `max_chars` characters.
    pub fn preview_text(&self, max_chars: usize) -> String {
        let snapshot = self.timeline.snapshot();
        let Some(turn) = snapshot.iter().rev().find(|t| !t.text.trim().is_empty()) else {
            return String::new();
        };

        let flat = turn.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            return flat;
        }
        let mut cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }

    pub fn summary(&self, preview_chars: usize, active: bool) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            updated_at: self.updated_at,
            message_count: self.message_count(),
            preview: self.preview_text(preview_chars),
            active,
        }
    }

    /// Sort key for "most recently updated first".
    pub(crate) fn recency(&self) -> (DateTime<Utc>, u64) {
        (self.updated_at, self.tick)
    }

    pub(crate) fn touch(&mut self, tick: u64) {
        self.updated_at = Utc::now().max(self.updated_at);
        self.tick = tick;
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }

    pub(crate) fn set_model(&mut self, model: Option<String>) {
        self.model = model;
    }

    pub(crate) fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }
}
