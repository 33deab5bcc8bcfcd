//! Plain-text rendering of widget state.

use chatline_app::{App, LogEntry};
use chatline_client::{ConnectionState, UserMessage};

/// One printed line per log entry.
pub fn entry_line(entry: &LogEntry) -> String {
    match entry {
        LogEntry::System { text, at } => format!("[{}] * {text}", at.format("%H:%M:%S")),
        LogEntry::Error { text } => format!("! {text}"),
        LogEntry::Chat { message, own, history } => chat_line(message, *own, *history),
    }
}

fn chat_line(message: &UserMessage, own: bool, history: bool) -> String {
    let mut line = format!("[{}] #{} ", message.at.format("%H:%M:%S"), message.message_id);
    if history {
        line.push_str("(earlier) ");
    }
    line.push_str(&message.username);
    if let Some(title) = &message.user_title {
        line.push_str(&format!(" [{title}]"));
    }
    if own {
        line.push_str(" (you)");
    }
    if let Some(reply) = &message.reply_to {
        line.push_str(&format!(" (re {}: {})", reply.username, reply.snippet));
    }
    line.push_str(&format!(": {}", message.text));
    line
}

/// Status bar: connection state, unread marker, reply bar and status message.
pub fn status_line(app: &App) -> String {
    let mut parts = vec![match app.state() {
        ConnectionState::Open => "online".to_string(),
        state => format!("offline ({state})"),
    }];
    if app.unread() {
        parts.push("new messages".to_string());
    }
    if let Some(draft) = app.reply_draft() {
        parts.push(format!("replying to {}: {}", draft.username(), draft.snippet()));
    }
    if let Some(status) = app.status_message() {
        parts.push(status.to_string());
    }
    format!("-- {} --", parts.join(" | "))
}
