// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slash-command parsing for the interactive shell.

use std::path::PathBuf;

/// A line typed at the shell prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Plain text to send to the active session.
    Message(String),
    New,
    Sessions,
    Switch(SessionRef),
    Rename(String),
    Delete(Option<SessionRef>),
    Clear,
    /// Show the model (`None`) or switch it. `default` resets the override.
    Model(Option<ModelChoice>),
    Models,
    Health,
    Attach(PathBuf),
    History,
    Help,
    Quit,
    Empty,
}

/// How a command names a session: a 1-based row of `/sessions` or an id prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRef {
    Index(usize),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    Default,
    Named(String),
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command {0}, type /help for a list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &[(&str, &str)] = &[
    ("/new", "start a new session"),
    ("/sessions", "list sessions, most recent first"),
    ("/switch <n|id>", "make another session active"),
    ("/rename <title>", "rename the active session"),
    ("/delete [n|id]", "delete a session (default: the active one)"),
    ("/clear", "remove every turn of the active session"),
    ("/model [id|default]", "show or switch the model of the active session"),
    ("/models", "list models offered by the endpoint"),
    ("/health", "probe the endpoint"),
    ("/attach <path>", "attach a file or image to the next message"),
    ("/history", "print the active session's turns"),
    ("/help", "show this help"),
    ("/quit", "leave the shell"),
];

pub fn parse(line: &str) -> Result<ShellCommand, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(ShellCommand::Empty);
    }
    let Some(body) = trimmed.strip_prefix('/') else {
        return Ok(ShellCommand::Message(trimmed.to_string()));
    };

    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    let arg = (!rest.is_empty()).then_some(rest);

    let command = match (name, arg) {
        ("new", None) => ShellCommand::New,
        ("sessions", None) => ShellCommand::Sessions,
        ("switch", Some(target)) => ShellCommand::Switch(session_ref(target)),
        ("switch", None) => return Err(ParseError::Usage("/switch <n|id>")),
        ("rename", Some(title)) => ShellCommand::Rename(title.to_string()),
        ("rename", None) => return Err(ParseError::Usage("/rename <title>")),
        ("delete", target) => ShellCommand::Delete(target.map(session_ref)),
        ("clear", None) => ShellCommand::Clear,
        ("model", None) => ShellCommand::Model(None),
        ("model", Some("default")) => ShellCommand::Model(Some(ModelChoice::Default)),
        ("model", Some(id)) => ShellCommand::Model(Some(ModelChoice::Named(id.to_string()))),
        ("models", None) => ShellCommand::Models,
        ("health", None) => ShellCommand::Health,
        ("attach", Some(path)) => ShellCommand::Attach(PathBuf::from(path)),
        ("attach", None) => return Err(ParseError::Usage("/attach <path>")),
        ("history", None) => ShellCommand::History,
        ("help", None) => ShellCommand::Help,
        ("quit" | "exit", None) => ShellCommand::Quit,
        (
            "new" | "sessions" | "clear" | "models" | "health" | "history" | "help" | "quit"
            | "exit",
            Some(_),
        ) => return Err(ParseError::Usage(usage_of(name))),
        _ => return Err(ParseError::Unknown(format!("/{name}"))),
    };
    Ok(command)
}

fn session_ref(target: &str) -> SessionRef {
    match target.parse::<usize>() {
        Ok(n) if n > 0 => SessionRef::Index(n),
        _ => SessionRef::Id(target.to_string()),
    }
}

fn usage_of(name: &str) -> &'static str {
    HELP.iter()
        .map(|(usage, _)| *usage)
        .find(|usage| usage[1..].starts_with(name))
        .unwrap_or("/help")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse("  hello there \n").unwrap(),
            ShellCommand::Message("hello there".into())
        );
        assert_eq!(parse("   ").unwrap(), ShellCommand::Empty);
    }

    #[test]
    fn commands_without_arguments() {
        assert_eq!(parse("/new").unwrap(), ShellCommand::New);
        assert_eq!(parse("/sessions").unwrap(), ShellCommand::Sessions);
        assert_eq!(parse("/clear").unwrap(), ShellCommand::Clear);
        assert_eq!(parse("/history").unwrap(), ShellCommand::History);
        assert_eq!(parse("/exit").unwrap(), ShellCommand::Quit);
        assert_eq!(parse("/quit").unwrap(), ShellCommand::Quit);
    }

    #[test]
    fn switch_accepts_rows_and_ids() {
        assert_eq!(
            parse("/switch 2").unwrap(),
            ShellCommand::Switch(SessionRef::Index(2))
        );
        assert_eq!(
            parse("/switch 0").unwrap(),
            ShellCommand::Switch(SessionRef::Id("0".into()))
        );
        assert_eq!(
            parse("/switch 3f2a").unwrap(),
            ShellCommand::Switch(SessionRef::Id("3f2a".into()))
        );
        assert_eq!(
            parse("/switch").unwrap_err(),
            ParseError::Usage("/switch <n|id>")
        );
    }

    #[test]
    fn rename_keeps_inner_whitespace() {
        assert_eq!(
            parse("/rename   Trip  planning ").unwrap(),
            ShellCommand::Rename("Trip  planning".into())
        );
        assert!(parse("/rename   ").is_err());
    }

    #[test]
    fn delete_target_is_optional() {
        assert_eq!(parse("/delete").unwrap(), ShellCommand::Delete(None));
        assert_eq!(
            parse("/delete 1").unwrap(),
            ShellCommand::Delete(Some(SessionRef::Index(1)))
        );
    }

    #[test]
    fn model_forms() {
        assert_eq!(parse("/model").unwrap(), ShellCommand::Model(None));
        assert_eq!(
            parse("/model default").unwrap(),
            ShellCommand::Model(Some(ModelChoice::Default))
        );
        assert_eq!(
            parse("/model claude-haiku-4-5-20251001").unwrap(),
            ShellCommand::Model(Some(ModelChoice::Named(
                "claude-haiku-4-5-20251001".into()
            )))
        );
    }

    #[test]
    fn attach_takes_the_rest_of_the_line() {
        assert_eq!(
            parse("/attach notes/meeting minutes.md").unwrap(),
            ShellCommand::Attach(PathBuf::from("notes/meeting minutes.md"))
        );
    }

    #[test]
    fn unexpected_argument_reports_usage() {
        assert_eq!(parse("/help me").unwrap_err(), ParseError::Usage("/help"));
        assert_eq!(parse("/new x").unwrap_err(), ParseError::Usage("/new"));
    }

    #[test]
    fn unknown_command() {
        let err = parse("/frobnicate now").unwrap_err();
        assert_eq!(err, ParseError::Unknown("/frobnicate".into()));
        assert!(err.to_string().contains("/help"));
    }
}
