// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered, copy-on-write turn storage for one session.

use std::collections::HashMap;
use std::sync::Arc;

use rivulet_core::{Attachment, RivuletError, SessionId, StreamEvent, Turn, TurnId};
use tracing::debug;

use crate::reducer;

/// Immutable view of a timeline at one point in time.
pub type TimelineSnapshot = Arc<Vec<Arc<Turn>>>;

/// The ordered turns of one session.
///
/// At most one turn is in flight (pending or streaming) at a time. Turns
/// are only ever appended or replaced in place by id; [`Timeline::clear`]
/// is the only way to remove them.
#[derive(Debug, Clone)]
pub struct Timeline {
    session_id: SessionId,
    turns: TimelineSnapshot,
    positions: HashMap<TurnId, usize>,
    in_flight: Option<TurnId>,
}

impl Timeline {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            turns: Arc::new(Vec::new()),
            positions: HashMap::new(),
            in_flight: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// O(1) snapshot that stays valid while the timeline keeps changing.
    pub fn snapshot(&self) -> TimelineSnapshot {
        Arc::clone(&self.turns)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, turn_id: &TurnId) -> Option<&Turn> {
        self.positions
            .get(turn_id)
            .map(|&index| self.turns[index].as_ref())
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last().map(Arc::as_ref)
    }

    /// The pending or streaming turn, if any.
    pub fn in_flight(&self) -> Option<&TurnId> {
        self.in_flight.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Appends a completed user turn.
    pub fn append_user(&mut self, text: impl Into<String>, attachments: Vec<Attachment>) -> TurnId {
        self.push(Turn::user(text, attachments))
    }

    /// Appends a completed system turn.
    pub fn append_system(&mut self, text: impl Into<String>) -> TurnId {
        self.push(Turn::system(text))
    }

    /// Appends an empty assistant turn and marks it in flight.
    pub fn append_pending_assistant(
        &mut self,
        model: impl Into<String>,
    ) -> Result<TurnId, RivuletError> {
        if self.in_flight.is_some() {
            return Err(RivuletError::AlreadyStreaming {
                session_id: self.session_id.clone(),
            });
        }
        let id = self.push(Turn::pending_assistant(model));
        self.in_flight = Some(id.clone());
        Ok(id)
    }

    /// Runs the reducer on the turn with `turn_id` and stores the result in place.
    ///
    /// Returns the turn after the event, or `None` when no such turn exists
    /// (for example after [`Timeline::clear`]).
    pub fn apply_event(&mut self, turn_id: &TurnId, event: &StreamEvent) -> Option<Arc<Turn>> {
        let Some(&index) = self.positions.get(turn_id) else {
            debug!(
                session_id = %self.session_id,
                turn_id = %turn_id,
                "dropping event for missing turn"
            );
            return None;
        };

        if self.turns[index].state.is_terminal() {
            return Some(Arc::clone(&self.turns[index]));
        }

        let turns = Arc::make_mut(&mut self.turns);
        let slot = Arc::make_mut(&mut turns[index]);
        *slot = reducer::reduce(std::mem::take(slot), event);

        if slot.state.is_terminal() && self.in_flight.as_ref() == Some(turn_id) {
            self.in_flight = None;
        }
        Some(Arc::clone(&turns[index]))
    }

    /// Removes every turn.
    pub fn clear(&mut self) {
        self.turns = Arc::new(Vec::new());
        self.positions.clear();
        self.in_flight = None;
    }

    fn push(&mut self, turn: Turn) -> TurnId {
        let id = turn.id.clone();
        let turns = Arc::make_mut(&mut self.turns);
        self.positions.insert(id.clone(), turns.len());
        turns.push(Arc::new(turn));
        id
    }
}
