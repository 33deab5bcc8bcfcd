//! Client events and actions.

use chatline_core::{ConnectionId, ConnectionState};
use chatline_proto::{CloseCode, InboundEvent, MessageId};

use crate::reply::ReplyDraft;

/// Callback from one transport instance.
///
/// Replaces the separate open/message/close/error callbacks of a socket with
/// one union consumed by a single transition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed; frames may be sent.
    Opened,

    /// One complete text frame arrived.
    Frame(String),

    /// The socket closed.
    Closed {
        /// Close status. 1005 when the peer sent none, 1006 when the stream
        /// ended without a close frame.
        code: CloseCode,
        /// Close reason, possibly empty.
        reason: String,
    },

    /// The socket reported an error. A `Closed` follows.
    Errored {
        /// Error description.
        reason: String,
    },

    /// The socket could not be created or the handshake failed. No `Closed`
    /// follows.
    ConnectFailed {
        /// Error description.
        reason: String,
    },

    /// Writing a frame failed. The connection is left as is.
    SendFailed {
        /// Error description.
        reason: String,
    },
}

/// Events the caller feeds into the client.
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation environments.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Open a connection on user request. Resets the retry counter.
    Connect,

    /// Callback from a transport instance.
    Transport {
        /// Instance that produced the event.
        conn: ConnectionId,
        /// What happened.
        event: TransportEvent,
    },

    /// Send a chat message.
    Send {
        /// Raw input text; trimmed before sending.
        text: String,
        /// Explicit reply target. Falls back to the reply draft.
        reply_to: Option<MessageId>,
    },

    /// Start replying to a message.
    SetReplyDraft(ReplyDraft),

    /// Cancel the current reply.
    ClearReplyDraft,

    /// Close the connection on user request.
    Close,

    /// Time tick for retry scheduling.
    Tick {
        /// Current time from the environment.
        now: I,
    },
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Create a transport instance and connect it to `url`.
    ///
    /// Its events must be reported back tagged with `conn`.
    OpenTransport {
        /// Id for the new instance.
        conn: ConnectionId,
        /// Endpoint URL.
        url: String,
    },

    /// Close a transport instance.
    CloseTransport {
        /// Instance to close.
        conn: ConnectionId,
        /// Close status to send.
        code: CloseCode,
        /// Close reason to send.
        reason: String,
    },

    /// Write one text frame.
    SendFrame {
        /// Instance to write on.
        conn: ConnectionId,
        /// Encoded JSON frame.
        frame: String,
    },

    /// Hand an event to the UI layer.
    ///
    /// Registered handlers have already seen it by the time `handle` returns.
    Deliver(InboundEvent),

    /// Connection state changed.
    StateChanged(ConnectionState),

    /// Reply draft was set or cleared.
    ReplyDraftChanged(Option<ReplyDraft>),
}

impl ClientAction {
    /// Delivered event, if this is a `Deliver` action.
    pub fn delivered(&self) -> Option<&InboundEvent> {
        match self {
            Self::Deliver(event) => Some(event),
            _ => None,
        }
    }
}
