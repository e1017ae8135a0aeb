// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The set of chat sessions and the active-session pointer.
//!
//! Timeline mutations go through the registry so that `updated_at` and the
//! recency ordering stay in step with the turns. The active id is always
//! either `None` or the key of an existing session.

use std::collections::HashMap;
use std::sync::Arc;

use rivulet_config::model::SessionsConfig;
use rivulet_core::{Attachment, RivuletError, SessionId, StreamEvent, Turn, TurnId};
use tracing::{debug, info};

use crate::session::{Session, SessionSummary};

/// Owns every session of the client.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    active: Option<SessionId>,
    default_title: String,
    preview_chars: usize,
    clock: u64,
}

impl SessionRegistry {
    pub fn new(config: &SessionsConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            active: None,
            default_title: config.default_title.clone(),
            preview_chars: config.preview_chars,
            clock: 0,
        }
    }

    /// Creates an empty session with the default title and makes it active.
    pub fn create(&mut self) -> SessionId {
        let id = SessionId::generate();
        let tick = self.tick();
        self.sessions.insert(
            id.clone(),
            Session::new(id.clone(), self.default_title.clone(), tick),
        );
        self.active = Some(id.clone());
        info!(session_id = %id, "session created");
        id
    }

    /// Sets a trimmed title. Blank titles and unknown ids are ignored.
    pub fn rename(&mut self, id: &SessionId, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            debug!(session_id = %id, "ignoring blank session title");
            return false;
        }
        let Some(session) = self.sessions.get_mut(id) else {
            return false;
        };
        session.set_title(title.to_string());
        info!(session_id = %id, title, "session renamed");
        true
    }

    /// Removes a session. If it was active, the most recently updated
    /// remaining session becomes active, or none if the registry is empty.
    pub fn delete(&mut self, id: &SessionId) -> bool {
        if self.sessions.remove(id).is_none() {
            return false;
        }
        if self.active.as_ref() == Some(id) {
            self.active = self
                .sessions
                .values()
                .max_by_key(|s| s.recency())
                .map(|s| s.id().clone());
        }
        info!(session_id = %id, active = ?self.active, "session deleted");
        true
    }

    /// Makes `id` active. Unknown ids leave the active session unchanged.
    pub fn select(&mut self, id: &SessionId) -> bool {
        if !self.sessions.contains_key(id) {
            return false;
        }
        self.active = Some(id.clone());
        true
    }

    /// Every session, most recently updated first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.recency()));
        sessions
            .into_iter()
            .map(|s| s.summary(self.preview_chars, self.active.as_ref() == Some(s.id())))
            .collect()
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn active(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref().and_then(|id| self.sessions.get(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Overrides the model for one session; `None` restores the default.
    pub fn set_model(&mut self, id: &SessionId, model: Option<String>) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.set_model(model);
                true
            }
            None => false,
        }
    }

    pub fn append_user(
        &mut self,
        id: &SessionId,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<TurnId, RivuletError> {
        let tick = self.tick();
        let session = self.session_mut(id)?;
        let turn_id = session.timeline_mut().append_user(text, attachments);
        session.touch(tick);
        Ok(turn_id)
    }

    pub fn append_system(
        &mut self,
        id: &SessionId,
        text: impl Into<String>,
    ) -> Result<TurnId, RivuletError> {
        let tick = self.tick();
        let session = self.session_mut(id)?;
        let turn_id = session.timeline_mut().append_system(text);
        session.touch(tick);
        Ok(turn_id)
    }

    pub fn append_pending_assistant(
        &mut self,
        id: &SessionId,
        model: impl Into<String>,
    ) -> Result<TurnId, RivuletError> {
        let tick = self.tick();
        let session = self.session_mut(id)?;
        let turn_id = session.timeline_mut().append_pending_assistant(model)?;
        session.touch(tick);
        Ok(turn_id)
    }

    /// Applies a stream event to a turn; a terminal transition refreshes `updated_at`.
    ///
    /// Returns `None` when the session or turn no longer exists.
    pub fn apply_event(
        &mut self,
        id: &SessionId,
        turn_id: &TurnId,
        event: &StreamEvent,
    ) -> Option<Arc<Turn>> {
        let tick = self.tick();
        let session = self.sessions.get_mut(id)?;
        let was_in_flight = session.timeline().in_flight() == Some(turn_id);
        let turn = session.timeline_mut().apply_event(turn_id, event)?;
        if was_in_flight && turn.state.is_terminal() {
            session.touch(tick);
        }
        Some(turn)
    }

    /// Removes every turn of a session.
    pub fn clear(&mut self, id: &SessionId) -> Result<(), RivuletError> {
        self.session_mut(id)?.timeline_mut().clear();
        info!(session_id = %id, "session cleared");
        Ok(())
    }

    fn session_mut(&mut self, id: &SessionId) -> Result<&mut Session, RivuletError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| RivuletError::SessionNotFound(id.clone()))
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}
