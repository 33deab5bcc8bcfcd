//! Reply drafts.

use chatline_proto::{MessageId, UserMessage};

/// Longest snippet, in characters, shown before the ellipsis.
pub const SNIPPET_MAX_CHARS: usize = 25;

const ELLIPSIS: &str = "...";

/// Message the user is composing a reply to.
///
/// Local to the client and never sent as-is: only the id travels with the
/// next outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDraft {
    message_id: MessageId,
    username: String,
    snippet: String,
}

impl ReplyDraft {
    /// Build a draft, computing the snippet from the full message text.
    pub fn new(message_id: MessageId, username: impl Into<String>, text: &str) -> Self {
        Self { message_id, username: username.into(), snippet: snippet(text) }
    }

    /// Build a draft from a snippet computed elsewhere.
    pub fn with_snippet(
        message_id: MessageId,
        username: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self { message_id, username: username.into(), snippet: snippet.into() }
    }

    /// Draft replying to a received message.
    pub fn from_message(message: &UserMessage) -> Self {
        Self::new(message.message_id.clone(), message.username.clone(), &message.text)
    }

    /// Id of the message being replied to.
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// Author of the message being replied to.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Preview of the message being replied to.
    pub fn snippet(&self) -> &str {
        &self.snippet
    }
}

/// Preview of `text` for the reply bar.
///
/// Line breaks become spaces. Text longer than [`SNIPPET_MAX_CHARS`]
/// characters is cut there and marked with `...`.
pub fn snippet(text: &str) -> String {
    let folded: String =
        text.trim().chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect();

    if folded.chars().count() <= SNIPPET_MAX_CHARS {
        return folded;
    }

    let mut cut: String = folded.chars().take(SNIPPET_MAX_CHARS).collect();
    cut.push_str(ELLIPSIS);
    cut
}
