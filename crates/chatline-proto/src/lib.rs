//! Chatline wire protocol
//!
//! JSON frames exchanged with the chat endpoint. One frame is one complete
//! WebSocket text message.
//!
//! # Outbound
//!
//! ```text
//! { "message": string, "reply_to_id"?: string|number }
//! { "type": "request_recent_messages" }
//! ```
//!
//! # Inbound
//!
//! Discriminated by `type`: `system`, `user`, `message_history`, `error`.
//! Decoding validates the full shape of each variant; malformed frames are
//! rejected with a [`ProtocolError`] instead of being coerced.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod close;
pub mod errors;
pub mod ids;
pub mod inbound;
pub mod outbound;

pub use close::CloseCode;
pub use errors::{ProtocolError, Result};
pub use ids::{Id, MessageId, UserId};
pub use inbound::{InboundEvent, ReplyRef, UserMessage};
pub use outbound::{OutboundChatMessage, OutboundFrame};
