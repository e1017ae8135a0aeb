// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application-facing chat client.
//!
//! [`ChatClient`] owns the session registry and the stream controller behind
//! one async mutex. Each accepted submission spawns a task that pulls events
//! from its subscription and applies them under the lock, re-checking the
//! cancellation token while holding it. Stop, clear and delete take the same
//! lock and cancel first, so no event lands after a cancellation.
//! Display layers follow changes through [`ChatClient::subscribe`].

use std::sync::Arc;

use rivulet_config::RivuletConfig;
use rivulet_core::{Attachment, ChatTransport, RivuletError, SessionId, StreamEvent, Turn, TurnId};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::{StreamController, Subscription, CANCELLED};
use crate::registry::SessionRegistry;
use crate::session::SessionSummary;
use crate::timeline::TimelineSnapshot;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// A change display layers may want to render.
#[derive(Debug, Clone)]
pub enum TimelineUpdate {
    TurnAppended {
        session_id: SessionId,
        turn: Arc<Turn>,
    },
    TurnUpdated {
        session_id: SessionId,
        turn: Arc<Turn>,
    },
    Cleared {
        session_id: SessionId,
    },
    /// A session was created, renamed, deleted or selected.
    SessionsChanged,
}

/// How a submitted stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed {
        model: Option<String>,
        total_tokens: Option<u64>,
    },
    Failed {
        reason: String,
    },
    Cancelled,
}

/// Handle to a running submission.
#[derive(Debug)]
pub struct SubmitHandle {
    session_id: SessionId,
    turn_id: TurnId,
    cancel: CancellationToken,
    task: JoinHandle<StreamOutcome>,
}

impl SubmitHandle {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the stream to end.
    pub async fn wait(self) -> StreamOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => StreamOutcome::Failed {
                reason: format!("stream task failed: {e}"),
            },
        }
    }
}

struct ClientState {
    registry: SessionRegistry,
    controller: StreamController,
}

/// Sessions plus streaming, shared between the UI and the stream tasks.
#[derive(Clone)]
pub struct ChatClient {
    state: Arc<Mutex<ClientState>>,
    updates: broadcast::Sender<TimelineUpdate>,
}

impl ChatClient {
    pub fn new(transport: Arc<dyn ChatTransport>, config: &RivuletConfig) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(ClientState {
                registry: SessionRegistry::new(&config.sessions),
                controller: StreamController::new(transport, config.generation.clone()),
            })),
            updates,
        }
    }

    /// Receives every subsequent timeline update.
    pub fn subscribe(&self) -> broadcast::Receiver<TimelineUpdate> {
        self.updates.subscribe()
    }

    pub async fn create_session(&self) -> SessionId {
        let id = self.state.lock().await.registry.create();
        self.notify(TimelineUpdate::SessionsChanged);
        id
    }

    pub async fn rename_session(&self, id: &SessionId, title: &str) -> bool {
        let renamed = self.state.lock().await.registry.rename(id, title);
        if renamed {
            self.notify(TimelineUpdate::SessionsChanged);
        }
        renamed
    }

    /// Cancels any running stream of the session, then deletes it.
    pub async fn delete_session(&self, id: &SessionId) -> bool {
        let mut state = self.state.lock().await;
        state.controller.cancel(id);
        let deleted = state.registry.delete(id);
        drop(state);
        if deleted {
            self.notify(TimelineUpdate::SessionsChanged);
        }
        deleted
    }

    pub async fn select_session(&self, id: &SessionId) -> bool {
        let selected = self.state.lock().await.registry.select(id);
        if selected {
            self.notify(TimelineUpdate::SessionsChanged);
        }
        selected
    }

    pub async fn active_session(&self) -> Option<SessionId> {
        self.state.lock().await.registry.active().cloned()
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.state.lock().await.registry.list()
    }

    /// Snapshot of a session's turns.
    pub async fn turns(&self, id: &SessionId) -> Option<TimelineSnapshot> {
        let state = self.state.lock().await;
        state.registry.get(id).map(|s| s.timeline().snapshot())
    }

    pub async fn is_streaming(&self, id: &SessionId) -> bool {
        let state = self.state.lock().await;
        state
            .registry
            .get(id)
            .is_some_and(|s| s.timeline().is_streaming())
    }

    /// Model used for the next request of a session.
    pub async fn model_for(&self, id: &SessionId) -> String {
        let state = self.state.lock().await;
        state
            .registry
            .get(id)
            .and_then(|s| s.model())
            .unwrap_or_else(|| state.controller.default_model())
            .to_string()
    }

    pub async fn set_model(&self, id: &SessionId, model: Option<String>) -> bool {
        self.state.lock().await.registry.set_model(id, model)
    }

    /// Submits to the active session, creating one if there is none.
    pub async fn submit(
        &self,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<SubmitHandle, RivuletError> {
        let id = match self.active_session().await {
            Some(id) => id,
            None => self.create_session().await,
        };
        self.submit_to(&id, text, attachments).await
    }

    /// Appends the user and pending assistant turns, then streams the
    /// response in a background task.
    pub async fn submit_to(
        &self,
        id: &SessionId,
        text: &str,
        attachments: Vec<Attachment>,
    ) -> Result<SubmitHandle, RivuletError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let model = state
            .registry
            .get(id)
            .ok_or_else(|| RivuletError::SessionNotFound(id.clone()))?
            .model()
            .unwrap_or_else(|| state.controller.default_model())
            .to_string();

        let subscription = state
            .controller
            .send(&mut state.registry, id, text, attachments, &model)?;

        if let Some(session) = state.registry.get(id) {
            let snapshot = session.timeline().snapshot();
            for turn in &snapshot[snapshot.len().saturating_sub(2)..] {
                self.notify(TimelineUpdate::TurnAppended {
                    session_id: id.clone(),
                    turn: Arc::clone(turn),
                });
            }
        }
        drop(guard);

        let handle = SubmitHandle {
            session_id: id.clone(),
            turn_id: subscription.turn_id().clone(),
            cancel: subscription.cancel_token(),
            task: tokio::spawn(pump(
                Arc::clone(&self.state),
                self.updates.clone(),
                subscription,
            )),
        };
        Ok(handle)
    }

    /// Stops the running stream of a session and marks its turn as failed.
    ///
    /// Returns false when nothing was streaming.
    pub async fn stop(&self, id: &SessionId) -> bool {
        let mut state = self.state.lock().await;
        state.controller.cancel(id);
        let Some(turn_id) = state
            .registry
            .get(id)
            .and_then(|s| s.timeline().in_flight().cloned())
        else {
            return false;
        };

        let event = StreamEvent::Failed {
            reason: CANCELLED.to_string(),
        };
        let turn = state.registry.apply_event(id, &turn_id, &event);
        drop(state);

        info!(session_id = %id, turn_id = %turn_id, "stream stopped");
        if let Some(turn) = turn {
            self.notify(TimelineUpdate::TurnUpdated {
                session_id: id.clone(),
                turn,
            });
        }
        true
    }

    /// Cancels any running stream of the session, then removes all its turns.
    pub async fn clear_session(&self, id: &SessionId) -> Result<(), RivuletError> {
        let mut state = self.state.lock().await;
        state.controller.cancel(id);
        state.registry.clear(id)?;
        drop(state);
        self.notify(TimelineUpdate::Cleared {
            session_id: id.clone(),
        });
        Ok(())
    }

    fn notify(&self, update: TimelineUpdate) {
        // No receivers is fine.
        let _ = self.updates.send(update);
    }
}

async fn pump(
    state: Arc<Mutex<ClientState>>,
    updates: broadcast::Sender<TimelineUpdate>,
    mut subscription: Subscription,
) -> StreamOutcome {
    let session_id = subscription.session_id().clone();
    let turn_id = subscription.turn_id().clone();

    while let Some(event) = subscription.next().await {
        let mut guard = state.lock().await;
        if subscription.is_cancelled() {
            debug!(session_id = %session_id, "dropping event after cancellation");
            return StreamOutcome::Cancelled;
        }

        if let Some(turn) = guard.registry.apply_event(&session_id, &turn_id, &event) {
            let _ = updates.send(TimelineUpdate::TurnUpdated {
                session_id: session_id.clone(),
                turn,
            });
        }

        match event {
            StreamEvent::Token(_) => {}
            StreamEvent::Completed {
                model,
                total_tokens,
            } => {
                guard.controller.release(&session_id, &turn_id);
                debug!(session_id = %session_id, ?total_tokens, "stream completed");
                return StreamOutcome::Completed {
                    model,
                    total_tokens,
                };
            }
            StreamEvent::Failed { reason } => {
                guard.controller.release(&session_id, &turn_id);
                return StreamOutcome::Failed { reason };
            }
        }
    }

    StreamOutcome::Cancelled
}
