//! Observable widget state.
//!
//! [`LogEntry`] is the view model of one line in the chat log. It carries
//! what the UI needs to render the line and nothing about the wire.

use chatline_proto::UserMessage;
use chrono::{DateTime, Utc};

/// One line in the chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// Informational notice.
    System {
        /// Notice text.
        text: String,
        /// When it was issued.
        at: DateTime<Utc>,
    },

    /// Error notice.
    Error {
        /// Error text.
        text: String,
    },

    /// Chat message.
    Chat {
        /// The message.
        message: UserMessage,
        /// Sent by the local user.
        own: bool,
        /// Arrived as part of a history batch.
        history: bool,
    },
}

impl LogEntry {
    /// Chat message carried by this entry, if any.
    pub fn message(&self) -> Option<&UserMessage> {
        match self {
            Self::Chat { message, .. } => Some(message),
            _ => None,
        }
    }
}
