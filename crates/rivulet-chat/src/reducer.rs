// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure state transitions for assistant turns.
//!
//! ```text
//! Pending --Token--> Streaming --Token--> Streaming
//!    |                   |
//!    +---Completed/Failed+--> Complete | Error   (terminal, absorbs all events)
//! ```

use rivulet_core::{StreamEvent, Turn, TurnState};

/// Applies one stream event to a turn and returns the resulting turn.
///
/// Terminal turns are returned unchanged. A `Completed` event without a
/// model keeps the model the turn was requested with.
pub fn reduce(mut turn: Turn, event: &StreamEvent) -> Turn {
    match turn.state {
        TurnState::Complete | TurnState::Error => turn,
        TurnState::Pending | TurnState::Streaming => {
            match event {
                StreamEvent::Token(text) => {
                    turn.text.push_str(text);
                    turn.state = TurnState::Streaming;
                }
                StreamEvent::Completed { model, .. } => {
                    if let Some(model) = model {
                        turn.model = Some(model.clone());
                    }
                    turn.state = TurnState::Complete;
                }
                StreamEvent::Failed { reason } => {
                    turn.text = failure_text(reason);
                    turn.state = TurnState::Error;
                }
            }
            turn
        }
    }
}

/// Text shown in place of a failed response.
pub fn failure_text(reason: &str) -> String {
    format!("Error: {reason}")
}
