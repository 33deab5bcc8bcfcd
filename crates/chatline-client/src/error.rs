//! Client errors.
//!
//! None of these are fatal. The client reports them to the UI as
//! [`chatline_proto::InboundEvent::ErrorNotice`] using their display text.

use chatline_core::{ConnectionError, ConnectionState};
use chatline_proto::ProtocolError;
use thiserror::Error;

/// Errors raised while processing a client event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Send attempted while the connection is not open
    #[error("Cannot send: not connected ({state}).")]
    NotConnected {
        /// State at the time of the send
        state: ConnectionState,
    },

    /// Send attempted with blank text
    #[error("Cannot send an empty message.")]
    EmptyMessage,

    /// Inbound frame failed validation
    #[error("Received a malformed message: {0}")]
    MalformedFrame(ProtocolError),

    /// Outbound frame could not be encoded
    #[error("Failed to encode message: {0}")]
    Encode(ProtocolError),

    /// Connection state machine rejected the operation
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}
