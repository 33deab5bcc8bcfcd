//! Client
//!
//! Action-based chat transport client. Owns the connection lifecycle, the
//! reconnect policy, outbound message framing and the reply draft, and turns
//! inbound frames into typed [`InboundEvent`]s for the UI layer.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`chatline_core`]. It receives events ([`ClientEvent`]), processes them
//! through one transition function, and returns actions ([`ClientAction`]) for
//! the caller to execute. Transport callbacks arrive as a single
//! [`TransportEvent`] union tagged with the [`ConnectionId`] of the instance
//! that produced them; events from replaced instances are ignored.
//!
//! # Components
//!
//! - [`ChatClient`]: The transport client state machine
//! - [`ReplyDraft`]: Pending reply reference with its cached snippet
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::open`]: Open a WebSocket to the chat endpoint
//! - [`transport::TransportHandle`]: Send, close or abort an open socket

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod notice;
mod reply;

#[cfg(feature = "transport")]
pub mod transport;

pub use chatline_core::{
    ConnectionId, ConnectionState, Endpoint, Environment, ReconnectPolicy, SystemEnv,
};
pub use chatline_proto::{CloseCode, InboundEvent, MessageId, ReplyRef, UserId, UserMessage};
pub use client::{ChatClient, ClientConfig, EventHandler};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, TransportEvent};
pub use reply::{ReplyDraft, SNIPPET_MAX_CHARS, snippet};
