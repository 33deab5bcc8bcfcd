//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to a running widget. They
//! are generated randomly by proptest or a fuzzer and applied to a
//! [`crate::Simulation`].

use arbitrary::Arbitrary;
use chatline_client::CloseCode;
use serde_json::{Value, json};

/// Operations that can be applied to the system.
///
/// Transport operations target the client's current transport instance, or
/// an unknown one when there is none.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// User submits the input box.
    Submit(SmallText),

    /// User replies to a message id.
    ReplyTo(u8),

    /// User dismisses the reply bar.
    CancelReply,

    /// Widget shown.
    Show,

    /// Widget hidden.
    Hide,

    /// User asks to connect.
    Reconnect,

    /// User asks to disconnect.
    Disconnect,

    /// Handshake completes.
    Opened,

    /// Handshake fails.
    ConnectFailed,

    /// Socket error; the close follows as a separate operation.
    Errored,

    /// Socket closes.
    Closed(CloseKind),

    /// Writing a frame fails.
    SendFailed,

    /// Peer sends a chat message.
    ChatFrame {
        /// Message id.
        message_id: u8,
        /// Sender id.
        user_id: u8,
        /// Message text.
        text: SmallText,
    },

    /// Peer sends a history batch.
    HistoryFrame {
        /// Message ids in the batch.
        message_ids: Vec<u8>,
    },

    /// Peer sends a system notice.
    SystemFrame(SmallText),

    /// Peer sends something that is not a valid frame.
    GarbageFrame(SmallText),

    /// Transport event for an instance that is no longer current.
    StaleClosed,

    /// Virtual time passes, then a tick.
    Advance {
        /// Seconds to advance.
        secs: u8,
    },
}

/// Close codes worth distinguishing.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub enum CloseKind {
    /// 1000
    Normal,
    /// 1001
    GoingAway,
    /// 1005
    NoStatus,
    /// 1006
    Abnormal,
    /// Anything else.
    Other(u16),
}

impl CloseKind {
    /// Wire close code.
    pub fn code(self) -> CloseCode {
        match self {
            Self::Normal => CloseCode::NORMAL,
            Self::GoingAway => CloseCode::GOING_AWAY,
            Self::NoStatus => CloseCode::NO_STATUS,
            Self::Abnormal => CloseCode::ABNORMAL,
            Self::Other(code) => CloseCode(code),
        }
    }
}

/// Short text drawn from a tiny alphabet so blank and whitespace-only input
/// shows up often.
#[derive(Debug, Clone, Arbitrary)]
pub struct SmallText {
    /// Character seeds.
    pub seeds: [u8; 4],
    /// Length hint.
    pub len: u8,
}

impl SmallText {
    /// Expand to the actual text.
    pub fn text(&self) -> String {
        const ALPHABET: [char; 6] = [' ', 'a', 'b', '\n', 'z', ' '];
        let len = usize::from(self.len % 5);
        self.seeds[..len.min(self.seeds.len())]
            .iter()
            .map(|seed| ALPHABET[usize::from(*seed) % ALPHABET.len()])
            .collect()
    }
}

/// Inbound `user` frame.
pub fn user_frame(message_id: u8, user_id: u8, text: &str) -> Value {
    json!({
        "type": "user",
        "message_id": message_id,
        "user_id": user_id,
        "username": format!("user{user_id}"),
        "message": text,
        "timestamp": "2024-05-01T12:00:00+00:00",
    })
}

/// Inbound `message_history` frame.
pub fn history_frame(message_ids: &[u8]) -> Value {
    let messages: Vec<Value> =
        message_ids.iter().map(|id| user_frame(*id, id % 3, "from history")).collect();
    json!({ "type": "message_history", "messages": messages })
}

/// Inbound `system` frame.
pub fn system_frame(text: &str) -> Value {
    json!({ "type": "system", "message": text })
}
