//! Error types for the connection layer.

use thiserror::Error;

use crate::connection::{ConnectionId, ConnectionState};

/// Errors from connection state machine operations and endpoint setup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation is not valid in the current state
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Event belongs to a transport instance that has been replaced
    #[error("stale connection {id}: current is {current:?}")]
    StaleConnection {
        /// Id carried by the event
        id: ConnectionId,
        /// Id of the live transport, if any
        current: Option<ConnectionId>,
    },

    /// Page origin cannot be mapped to a WebSocket endpoint
    #[error("invalid origin: {0}")]
    InvalidOrigin(String),
}
