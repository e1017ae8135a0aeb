// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream controller: turns a user submission into a request and a
//! cancellable sequence of stream events.
//!
//! `send` mutates the timeline synchronously (user turn, then a pending
//! assistant turn) and returns a [`Subscription`]. The request is only
//! issued once the subscription is first polled. Every subscription yields
//! zero or more `Token` events followed by exactly one terminal event,
//! unless it is cancelled, after which it yields nothing.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use rivulet_config::model::GenerationConfig;
use rivulet_core::{
    Attachment, AttachmentKind, ChatRequest, ChatTransport, Role, RivuletError, SessionId,
    StreamEvent, Turn, TurnId, TurnState, WireMessage,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::registry::SessionRegistry;

/// Reason reported when the body ends without a terminal frame.
pub const INCOMPLETE_STREAM: &str = "stream ended before completion";

/// Reason applied to a turn stopped by the user.
pub const CANCELLED: &str = "cancelled";

type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Events of one `send`, guarded by a cancellation token.
pub struct Subscription {
    session_id: SessionId,
    turn_id: TurnId,
    cancel: CancellationToken,
    events: EventStream,
}

impl Subscription {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The assistant turn the events belong to.
    pub fn turn_id(&self) -> &TurnId {
        &self.turn_id
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Next event, or `None` once the stream is finished or cancelled.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            event = self.events.next() => event,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("session_id", &self.session_id)
            .field("turn_id", &self.turn_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Issues chat requests and tracks the in-flight call of each session.
pub struct StreamController {
    transport: Arc<dyn ChatTransport>,
    generation: GenerationConfig,
    in_flight: HashMap<SessionId, (TurnId, CancellationToken)>,
}

impl StreamController {
    pub fn new(transport: Arc<dyn ChatTransport>, generation: GenerationConfig) -> Self {
        Self {
            transport,
            generation,
            in_flight: HashMap::new(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.generation.default_model
    }

    /// Appends the user turn and a pending assistant turn, then returns the
    /// subscription that will stream the response.
    ///
    /// Fails with `AlreadyStreaming` (and changes nothing) while the session
    /// has an in-flight turn.
    pub fn send(
        &mut self,
        registry: &mut SessionRegistry,
        session_id: &SessionId,
        text: &str,
        attachments: Vec<Attachment>,
        model: &str,
    ) -> Result<Subscription, RivuletError> {
        let session = registry
            .get(session_id)
            .ok_or_else(|| RivuletError::SessionNotFound(session_id.clone()))?;
        if session.timeline().is_streaming() {
            return Err(RivuletError::AlreadyStreaming {
                session_id: session_id.clone(),
            });
        }

        self.cancel(session_id);

        let request = self.build_request(&session.timeline().snapshot(), text, &attachments, model);
        registry.append_user(session_id, text, attachments)?;
        let turn_id = registry.append_pending_assistant(session_id, model)?;

        let cancel = CancellationToken::new();
        self.in_flight
            .insert(session_id.clone(), (turn_id.clone(), cancel.clone()));
        debug!(
            session_id = %session_id,
            turn_id = %turn_id,
            model,
            messages = request.messages.len(),
            "stream accepted"
        );

        Ok(Subscription {
            session_id: session_id.clone(),
            turn_id,
            cancel,
            events: Box::pin(event_stream(Arc::clone(&self.transport), request)),
        })
    }

    /// Cancels the in-flight call of a session. Returns its turn id, if any.
    pub fn cancel(&mut self, session_id: &SessionId) -> Option<TurnId> {
        let (turn_id, token) = self.in_flight.remove(session_id)?;
        token.cancel();
        debug!(session_id = %session_id, turn_id = %turn_id, "stream cancelled");
        Some(turn_id)
    }

    /// Forgets a finished call. A newer call for the same session is left alone.
    pub fn release(&mut self, session_id: &SessionId, turn_id: &TurnId) {
        if self
            .in_flight
            .get(session_id)
            .is_some_and(|(current, _)| current == turn_id)
        {
            self.in_flight.remove(session_id);
        }
    }

    pub fn is_in_flight(&self, session_id: &SessionId) -> bool {
        self.in_flight.contains_key(session_id)
    }

    /// Builds the request body from the prior turns plus the new user message.
    ///
    /// Failed turns and empty assistant turns are left out. System turns
    /// are merged into the `system` field ahead of the configured prompt.
    pub fn build_request(
        &self,
        prior: &[Arc<Turn>],
        text: &str,
        attachments: &[Attachment],
        model: &str,
    ) -> ChatRequest {
        let mut system = Vec::new();
        let mut messages = Vec::new();

        for turn in prior {
            if turn.state == TurnState::Error {
                continue;
            }
            match turn.role {
                Role::System => system.push(turn.text.clone()),
                Role::User => messages.push(WireMessage {
                    role: Role::User,
                    content: message_content(&turn.text, &turn.attachments),
                }),
                Role::Assistant => {
                    if !turn.text.is_empty() {
                        messages.push(WireMessage {
                            role: Role::Assistant,
                            content: turn.text.clone(),
                        });
                    }
                }
            }
        }
        messages.push(WireMessage {
            role: Role::User,
            content: message_content(text, attachments),
        });

        if let Some(prompt) = &self.generation.system_prompt {
            system.push(prompt.clone());
        }

        ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            stream: true,
        }
    }
}

/// Folds attachments into the text content of a message.
fn message_content(text: &str, attachments: &[Attachment]) -> String {
    let mut parts = Vec::with_capacity(attachments.len() + 1);
    if !text.is_empty() {
        parts.push(text.to_string());
    }
    for attachment in attachments {
        parts.push(match attachment.kind {
            AttachmentKind::File => {
                format!("{}:\n```\n{}\n```", attachment.name, attachment.payload)
            }
            AttachmentKind::Image => {
                format!("[image: {} ({})]", attachment.name, attachment.mime_type)
            }
        });
    }
    parts.join("\n\n")
}

fn event_stream(
    transport: Arc<dyn ChatTransport>,
    request: ChatRequest,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let mut frames = match transport.open_stream(&request).await {
            Ok(frames) => frames,
            Err(e) => {
                warn!(transport = transport.name(), error = %e, "failed to open chat stream");
                yield StreamEvent::Failed { reason: e.to_string() };
                return;
            }
        };

        while let Some(item) = frames.next().await {
            match item {
                Ok(frame) if frame.done => {
                    if !frame.token.is_empty() {
                        yield StreamEvent::Token(frame.token);
                    }
                    yield StreamEvent::Completed {
                        model: frame.model,
                        total_tokens: frame.total_tokens,
                    };
                    return;
                }
                Ok(frame) => {
                    yield StreamEvent::Token(frame.token);
                }
                Err(e) => {
                    warn!(error = %e, "chat stream interrupted");
                    yield StreamEvent::Failed { reason: e.to_string() };
                    return;
                }
            }
        }

        warn!("chat stream ended without a terminal frame");
        yield StreamEvent::Failed { reason: INCOMPLETE_STREAM.to_string() };
    }
}
