//! Application side-effects and intents.

use chatline_client::ReplyDraft;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Connect manually (resets the reconnect budget).
    Connect,

    /// Close the connection.
    Close,

    /// Send a chat message.
    Send {
        /// Raw input text.
        text: String,
    },

    /// Start replying to a message.
    SetReplyDraft(ReplyDraft),

    /// Cancel the reply.
    ClearReplyDraft,
}
