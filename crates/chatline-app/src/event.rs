//! Application input events.
//!
//! Events originate from two distinct sources:
//! - User interactions (input, reply selection, widget visibility).
//! - Notifications mirrored from the chat client.

use chatline_client::{ConnectionState, InboundEvent, ReplyDraft};

/// Events processed by the App state machine.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// User submitted the input box.
    Submit(String),

    /// User picked a message to reply to, by message id.
    ReplyTo(String),

    /// User dismissed the reply bar.
    CancelReply,

    /// Widget became visible.
    Shown,

    /// Widget was hidden.
    Hidden,

    /// User asked to connect.
    Reconnect,

    /// User asked to disconnect.
    Disconnect,

    /// User asked to quit.
    Quit,

    /// Event delivered by the client.
    Inbound(InboundEvent),

    /// Client connection state changed.
    ConnectionChanged(ConnectionState),

    /// Client reply draft changed.
    ReplyDraftChanged(Option<ReplyDraft>),
}
