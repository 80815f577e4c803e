//! Terminal rendering and REPL input parsing.
//!
//! Pure string functions: the main loop does the I/O.

use std::fmt::Write;

use chat::composer::DiscardReason;
use chat::{APOLOGY, Message, Resolution, Role, Session, SessionId};
use time::format_description::well_known::Rfc3339;

pub const HELP: &str = "\
commands:
  /new            start a new session
  /list           list sessions
  /switch <id>    switch to a session
  /help           show this help
  /quit           leave";

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Send(String),
    New,
    List,
    Switch(String),
    Help,
    Quit,
    Unknown(String),
}

#[must_use]
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Send(line.to_string());
    };

    let mut words = command.split_whitespace();
    match (words.next(), words.next()) {
        (Some("new"), None) => Input::New,
        (Some("list" | "sessions"), None) => Input::List,
        (Some("switch"), Some(id)) => Input::Switch(id.to_string()),
        (Some("help"), None) => Input::Help,
        (Some("quit" | "exit"), None) => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Model => "aasha",
    }
}

/// `speaker> text`, with continuation lines indented under the text.
#[must_use]
pub fn render_message(message: &Message) -> String {
    let label = speaker(message.role);
    let indent = " ".repeat(label.len() + 2);
    let mut out = String::new();
    for (i, line) in message.text.lines().enumerate() {
        if i == 0 {
            let _ = writeln!(out, "{label}> {line}");
        } else {
            let _ = writeln!(out, "{indent}{line}");
        }
    }
    if message.text.is_empty() {
        let _ = writeln!(out, "{label}>");
    }
    out
}

fn created(session: &Session) -> String {
    session.created.format(&Rfc3339).unwrap_or_else(|_| "unknown".to_string())
}

#[must_use]
pub fn render_session(session: &Session) -> String {
    let mut out = format!("-- session {} (started {}) --\n", session.id, created(session));
    for message in &session.messages {
        out.push_str(&render_message(message));
    }
    out
}

#[must_use]
pub fn render_session_list(sessions: &[Session], selected: &SessionId) -> String {
    let mut out = String::new();
    for session in sessions {
        let marker = if &session.id == selected { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {}  {}  {} messages",
            session.id,
            created(session),
            session.messages.len()
        );
    }
    out
}

#[must_use]
pub fn render_resolution(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Replied { text, .. } => render_message(&Message::model(text.as_str())),
        Resolution::Apologized { .. } => render_message(&Message::model(APOLOGY)),
        Resolution::Discarded { session_id, reason } => {
            let why = match reason {
                DiscardReason::Stale => "superseded",
                DiscardReason::SessionSwitched => "session switched",
            };
            format!("(reply for session {session_id} discarded: {why})\n")
        }
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
