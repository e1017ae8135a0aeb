// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rivulet chat` command implementation.
//!
//! Launches an interactive REPL with colored prompt, streaming output,
//! and readline history. Messages go to the active session; slash commands
//! manage sessions, models and attachments. Ctrl+C while a response streams
//! stops it.

use std::io::Write;
use std::sync::Arc;

use chrono::Local;
use colored::Colorize;
use rivulet_chat::{ChatClient, SessionSummary, StreamOutcome, SubmitHandle, TimelineUpdate};
use rivulet_config::RivuletConfig;
use rivulet_core::{
    Attachment, ChatTransport, HealthStatus, RivuletError, Role, SessionId, Turn, TurnState,
};
use rivulet_transport::{HealthResponse, HttpTransport, ModelInfo};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::attachment::load_attachment;
use crate::commands::{self, ModelChoice, SessionRef, ShellCommand};

/// Whether the endpoint reported a usable model provider.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ProviderGate {
    Open,
    Closed(String),
}

struct Shell {
    client: ChatClient,
    http: Arc<HttpTransport>,
    gate: ProviderGate,
    pending: Vec<Attachment>,
}

/// Runs the `rivulet chat` interactive REPL.
pub async fn run_shell(config: RivuletConfig) -> Result<(), RivuletError> {
    let http = Arc::new(HttpTransport::new(&config.endpoint)?);
    let transport: Arc<dyn ChatTransport> = http.clone();
    let mut shell = Shell {
        client: ChatClient::new(transport, &config),
        http,
        gate: ProviderGate::Open,
        pending: Vec::new(),
    };

    let mut rl = DefaultEditor::new()
        .map_err(|e| RivuletError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "rivulet chat".bold().green());
    println!(
        "Connected to {}. Type {} for commands, {} to exit.\n",
        config.endpoint.base_url.cyan(),
        "/help".yellow(),
        "/quit".yellow()
    );
    shell.probe(false).await;

    loop {
        let prompt = format!("{}> ", "rivulet".green());
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                let command = match commands::parse(&line) {
                    Ok(command) => command,
                    Err(e) => {
                        eprintln!("{}", e.to_string().yellow());
                        continue;
                    }
                };
                if command == ShellCommand::Quit {
                    break;
                }
                if let Err(e) = shell.execute(command).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt: exit.
                break;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}

impl Shell {
    async fn execute(&mut self, command: ShellCommand) -> Result<(), RivuletError> {
        match command {
            ShellCommand::Message(text) => self.send(&text).await?,
            ShellCommand::New => {
                self.client.create_session().await;
                println!("{}", "started a new session".dimmed());
            }
            ShellCommand::Sessions => {
                let sessions = self.client.list_sessions().await;
                if sessions.is_empty() {
                    println!("{}", "no sessions yet".dimmed());
                }
                for (index, summary) in sessions.iter().enumerate() {
                    print_summary(index + 1, summary);
                }
            }
            ShellCommand::Switch(target) => {
                let id = self.resolve(&target).await?;
                self.client.select_session(&id).await;
                self.print_history(&id).await;
            }
            ShellCommand::Rename(title) => {
                let id = self.active_or_create().await;
                if self.client.rename_session(&id, &title).await {
                    println!("{} {}", "renamed to".dimmed(), title.trim().bold());
                }
            }
            ShellCommand::Delete(target) => {
                let id = match target {
                    Some(target) => self.resolve(&target).await?,
                    None => self
                        .client
                        .active_session()
                        .await
                        .ok_or_else(|| RivuletError::Internal("no active session".into()))?,
                };
                if self.client.delete_session(&id).await {
                    println!("{}", "session deleted".dimmed());
                }
            }
            ShellCommand::Clear => {
                if let Some(id) = self.client.active_session().await {
                    self.client.clear_session(&id).await?;
                }
                println!("{}", "session cleared".dimmed());
            }
            ShellCommand::Model(choice) => self.model(choice).await?,
            ShellCommand::Models => print_models(&self.http.models().await?),
            ShellCommand::Health => {
                let health = self.http.health().await?;
                print_health(&health);
                self.probe(true).await;
            }
            ShellCommand::Attach(path) => {
                let attachment = load_attachment(&path)?;
                println!(
                    "{} {} ({}), sent with your next message",
                    "attached".dimmed(),
                    attachment.name.bold(),
                    attachment.kind
                );
                self.pending.push(attachment);
            }
            ShellCommand::History => {
                if let Some(id) = self.client.active_session().await {
                    self.print_history(&id).await;
                }
            }
            ShellCommand::Help => {
                for (usage, description) in commands::HELP {
                    println!("  {:<22} {}", usage.yellow(), description);
                }
            }
            ShellCommand::Quit | ShellCommand::Empty => {}
        }
        Ok(())
    }

    async fn send(&mut self, text: &str) -> Result<(), RivuletError> {
        if let ProviderGate::Closed(reason) = &self.gate {
            debug!(%reason, "provider gate closed, probing again");
            self.probe(true).await;
        }
        if let ProviderGate::Closed(reason) = &self.gate {
            eprintln!(
                "{}: {reason}; not sending. Check {} once the endpoint has a provider.",
                "unavailable".yellow(),
                "/health".yellow()
            );
            return Ok(());
        }

        // Subscribe before submitting so the first tokens are not missed.
        let mut updates = self.client.subscribe();
        let attachments = std::mem::take(&mut self.pending);
        let handle = match self.client.submit(text, attachments.clone()).await {
            Ok(handle) => handle,
            Err(e) => {
                self.pending = attachments;
                return Err(e);
            }
        };
        self.stream_reply(&mut updates, handle).await;
        Ok(())
    }

    /// Prints tokens as they arrive until the stream ends or Ctrl+C stops it.
    async fn stream_reply(
        &self,
        updates: &mut broadcast::Receiver<TimelineUpdate>,
        handle: SubmitHandle,
    ) {
        let session_id = handle.session_id().clone();
        let turn_id = handle.turn_id().clone();
        let mut printed = 0usize;
        let mut wait = std::pin::pin!(handle.wait());

        let outcome = loop {
            tokio::select! {
                outcome = &mut wait => break outcome,
                update = updates.recv() => match update {
                    Ok(TimelineUpdate::TurnUpdated { turn, .. })
                        if turn.id == turn_id && turn.state != TurnState::Error =>
                    {
                        printed = print_delta(&turn.text, printed);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "display fell behind the stream");
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                },
                _ = tokio::signal::ctrl_c() => {
                    self.client.stop(&session_id).await;
                }
            }
        };

        // Updates dropped by a lagging receiver are recovered from the snapshot.
        let turns = self.client.turns(&session_id).await.unwrap_or_default();
        if let Some(turn) = turns
            .iter()
            .find(|t| t.id == turn_id && t.state == TurnState::Complete)
        {
            printed = print_delta(&turn.text, printed);
        }
        if printed > 0 {
            println!();
        }

        match outcome {
            StreamOutcome::Completed {
                model,
                total_tokens,
            } => {
                let mut footer = Vec::new();
                if let Some(model) = model {
                    footer.push(model);
                }
                if let Some(total) = total_tokens {
                    footer.push(format!("{total} tokens"));
                }
                if !footer.is_empty() {
                    println!("{}", format!("[{}]", footer.join(", ")).dimmed());
                }
            }
            StreamOutcome::Failed { reason } => {
                eprintln!("{}: {reason}", "error".red());
            }
            StreamOutcome::Cancelled => {
                eprintln!("{}", "stopped".yellow());
            }
        }
    }

    /// Probes the endpoint and updates the provider gate.
    ///
    /// An unreachable endpoint only warns; sending stays possible.
    async fn probe(&mut self, verbose: bool) {
        match self.http.health_check().await {
            Ok(HealthStatus::Healthy) => {
                self.gate = ProviderGate::Open;
                if verbose {
                    println!("{}", "endpoint is ready".green());
                }
            }
            Ok(HealthStatus::Degraded(reason)) => {
                eprintln!("{}: {reason}", "warning".yellow());
                self.gate = ProviderGate::Closed(reason);
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                warn!(%reason, "health probe failed");
                eprintln!("{}: health probe failed: {reason}", "warning".yellow());
                self.gate = ProviderGate::Open;
            }
            Err(e) => {
                warn!(error = %e, "health probe failed");
                eprintln!("{}: health probe failed: {e}", "warning".yellow());
                self.gate = ProviderGate::Open;
            }
        }
    }

    async fn model(&mut self, choice: Option<ModelChoice>) -> Result<(), RivuletError> {
        let id = self.active_or_create().await;
        match choice {
            None => {}
            Some(ModelChoice::Default) => {
                self.client.set_model(&id, None).await;
            }
            Some(ModelChoice::Named(model)) => {
                match self.http.models().await {
                    Ok(models) if !models.iter().any(|m| m.id == model) => {
                        eprintln!(
                            "{}: {model} is not in the endpoint's catalog",
                            "warning".yellow()
                        );
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "model catalog unavailable"),
                }
                self.client.set_model(&id, Some(model)).await;
            }
        }
        println!(
            "{} {}",
            "model:".dimmed(),
            self.client.model_for(&id).await.bold()
        );
        Ok(())
    }

    async fn active_or_create(&self) -> SessionId {
        match self.client.active_session().await {
            Some(id) => id,
            None => self.client.create_session().await,
        }
    }

    async fn resolve(&self, target: &SessionRef) -> Result<SessionId, RivuletError> {
        let sessions = self.client.list_sessions().await;
        resolve_session(&sessions, target)
    }

    async fn print_history(&self, id: &SessionId) {
        let Some(turns) = self.client.turns(id).await else {
            return;
        };
        if turns.is_empty() {
            println!("{}", "(empty session)".dimmed());
        }
        for turn in turns.iter() {
            print_turn(turn);
        }
    }
}

/// Picks a session by 1-based listing row or by unique id prefix.
fn resolve_session(
    sessions: &[SessionSummary],
    target: &SessionRef,
) -> Result<SessionId, RivuletError> {
    match target {
        SessionRef::Index(n) => n
            .checked_sub(1)
            .and_then(|row| sessions.get(row))
            .map(|s| s.id.clone())
            .ok_or_else(|| RivuletError::Internal(format!("there is no session #{n}"))),
        SessionRef::Id(prefix) => {
            let mut matches = sessions.iter().filter(|s| s.id.as_str().starts_with(prefix.as_str()));
            match (matches.next(), matches.next()) {
                (Some(found), None) => Ok(found.id.clone()),
                (None, _) => Err(RivuletError::SessionNotFound(SessionId(prefix.clone()))),
                (Some(_), Some(_)) => Err(RivuletError::Internal(format!(
                    "{prefix} matches more than one session"
                ))),
            }
        }
    }
}

/// Prints the part of `text` past byte `printed`; returns the new length.
fn print_delta(text: &str, printed: usize) -> usize {
    match text.get(printed..) {
        Some(rest) if !rest.is_empty() => {
            print!("{rest}");
            std::io::stdout().flush().ok();
            text.len()
        }
        _ => printed,
    }
}

fn print_summary(row: usize, summary: &SessionSummary) {
    let marker = if summary.active { "*" } else { " " };
    let updated = summary.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    println!(
        "{marker} {row:>2}. {}  {}  {}",
        summary.title.bold(),
        format!("{} messages", summary.message_count).dimmed(),
        updated.to_string().dimmed()
    );
    if !summary.preview.is_empty() {
        println!("       {}", summary.preview.dimmed());
    }
}

fn print_turn(turn: &Turn) {
    let label = match turn.role {
        Role::User => "you".green().bold(),
        Role::Assistant => "assistant".cyan().bold(),
        Role::System => "system".dimmed(),
    };
    let text = match turn.state {
        TurnState::Error => turn.text.red(),
        TurnState::Pending | TurnState::Streaming | TurnState::Complete => turn.text.normal(),
    };
    println!("{label}: {text}");
    for attachment in &turn.attachments {
        println!("  {}", format!("[attached {}]", attachment.name).dimmed());
    }
}

pub fn print_health(health: &HealthResponse) {
    let status = if health.status == "ok" {
        health.status.green()
    } else {
        health.status.yellow()
    };
    println!("{} {status}", "status:".bold());
    if !health.app.is_empty() {
        println!("{} {} {}", "server:".bold(), health.app, health.version);
    }
    println!("{} {}s", "uptime:".bold(), health.uptime_seconds);
    for provider in &health.providers {
        let state = if provider.available {
            "available".green()
        } else {
            "unavailable".red()
        };
        println!("  {:<16} {state}", provider.name);
    }
    if !health.any_provider_available() {
        println!("{}", "no model provider is available".yellow());
    }
}

pub fn print_models(models: &[ModelInfo]) {
    if models.is_empty() {
        println!("{}", "the endpoint offers no models".dimmed());
    }
    for model in models {
        let id = if model.available {
            model.id.bold()
        } else {
            model.id.dimmed()
        };
        println!(
            "  {id}  {} {}",
            model.name,
            format!("({}, {})", model.tier, model.provider).dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(id: &str) -> SessionSummary {
        SessionSummary {
            id: SessionId::from(id),
            title: "New chat".into(),
            updated_at: Utc::now(),
            message_count: 0,
            preview: String::new(),
            active: false,
        }
    }

    #[test]
    fn resolves_rows_from_one() {
        let sessions = vec![summary("aaa"), summary("bbb")];
        assert_eq!(
            resolve_session(&sessions, &SessionRef::Index(2)).unwrap(),
            SessionId::from("bbb")
        );
        assert!(resolve_session(&sessions, &SessionRef::Index(3)).is_err());
    }

    #[test]
    fn resolves_unique_id_prefix() {
        let sessions = vec![summary("ab12"), summary("ab34"), summary("cd56")];
        assert_eq!(
            resolve_session(&sessions, &SessionRef::Id("cd".into())).unwrap(),
            SessionId::from("cd56")
        );

        let ambiguous = resolve_session(&sessions, &SessionRef::Id("ab".into())).unwrap_err();
        assert!(ambiguous.to_string().contains("more than one"));

        let missing = resolve_session(&sessions, &SessionRef::Id("zz".into())).unwrap_err();
        assert!(matches!(missing, RivuletError::SessionNotFound(_)));
    }

    #[test]
    fn delta_prints_only_new_text() {
        assert_eq!(print_delta("He", 0), 2);
        assert_eq!(print_delta("Hello", 2), 5);
        assert_eq!(print_delta("Hello", 5), 5);
        assert_eq!(print_delta("héllo", 3), 6);
    }
}
