//! Frames sent from the client to the chat endpoint.

use serde::Serialize;

use crate::{MessageId, ProtocolError, Result};

/// User chat message, optionally replying to an earlier message.
///
/// # Invariants
///
/// - `message` is trimmed and non-empty. Enforced by [`Self::new`], the only
///   constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundChatMessage {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_id: Option<MessageId>,
}

impl OutboundChatMessage {
    /// Build a chat message from raw user input.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EmptyMessage` if `text` is empty after trimming
    pub fn new(text: &str, reply_to_id: Option<MessageId>) -> Result<Self> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ProtocolError::EmptyMessage);
        }

        Ok(Self { message: message.to_string(), reply_to_id })
    }

    /// Trimmed message text.
    pub fn text(&self) -> &str {
        &self.message
    }

    /// Message this one replies to. `None` for a top-level message.
    pub fn reply_to_id(&self) -> Option<&MessageId> {
        self.reply_to_id.as_ref()
    }
}

/// Control frames understood by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// Ask the server to resend the recent message history.
    RequestRecentMessages,
}

/// Every frame the client can put on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// User chat message.
    Chat(OutboundChatMessage),
    /// Control request.
    Control(ControlFrame),
}

impl OutboundFrame {
    /// History request sent after every successful open.
    pub const REQUEST_RECENT_MESSAGES: Self = Self::Control(ControlFrame::RequestRecentMessages);

    /// Serialize to a single JSON text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Whether this is the history request control frame.
    pub fn is_history_request(&self) -> bool {
        matches!(self, Self::Control(ControlFrame::RequestRecentMessages))
    }
}

impl From<OutboundChatMessage> for OutboundFrame {
    fn from(message: OutboundChatMessage) -> Self {
        Self::Chat(message)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn chat(text: &str, reply_to: Option<MessageId>) -> String {
        OutboundFrame::from(OutboundChatMessage::new(text, reply_to).unwrap()).encode().unwrap()
    }

    #[test]
    fn plain_message() {
        assert_snapshot!(chat("hello", None), @r#"{"message":"hello"}"#);
    }

    #[test]
    fn reply_keeps_string_id() {
        assert_snapshot!(chat("reply!", Some(MessageId::from("42"))), @r#"{"message":"reply!","reply_to_id":"42"}"#);
    }

    #[test]
    fn reply_keeps_numeric_id() {
        assert_snapshot!(chat("ok", Some(MessageId::from(7))), @r#"{"message":"ok","reply_to_id":7}"#);
    }

    #[test]
    fn history_request() {
        let frame = OutboundFrame::REQUEST_RECENT_MESSAGES.encode().unwrap();
        assert_snapshot!(frame, @r#"{"type":"request_recent_messages"}"#);
    }

    #[test]
    fn text_is_trimmed() {
        let msg = OutboundChatMessage::new("  padded \n", None).unwrap();
        assert_eq!(msg.text(), "padded");
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(OutboundChatMessage::new("", None), Err(ProtocolError::EmptyMessage));
        assert_eq!(OutboundChatMessage::new(" \t\n ", None), Err(ProtocolError::EmptyMessage));
    }
}
