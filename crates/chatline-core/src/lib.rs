//! Chatline core
//!
//! Pure connection logic for the chat client: the environment abstraction,
//! endpoint derivation and the connection lifecycle state machine with its
//! reconnect policy. Nothing here performs I/O; time is passed in and
//! decisions are returned to the caller.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod connection;
pub mod endpoint;
pub mod env;
pub mod error;

pub use connection::{
    CloseOutcome, ConnectAttempt, Connection, ConnectionId, ConnectionState, ReconnectPolicy,
};
pub use endpoint::Endpoint;
pub use env::{Environment, MonotonicInstant, SystemEnv};
pub use error::ConnectionError;
