//! Frames received from the chat endpoint.
//!
//! Decoding is two-step: the text is parsed as JSON, then the object is
//! validated against the shape declared by its `type`. Optional fields may be
//! absent or `null`; required fields may be neither. Values of the wrong JSON
//! type are rejected rather than converted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::{Id, MessageId, ProtocolError, Result, UserId};

/// Reference to the message a user message replies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRef {
    /// Id of the quoted message.
    pub message_id: MessageId,
    /// Display name of the quoted author.
    pub username: String,
    /// Server-truncated text of the quoted message.
    pub snippet: String,
}

/// Chat message authored by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    /// Server-assigned message id.
    pub message_id: MessageId,
    /// Author id.
    pub user_id: UserId,
    /// Author display name.
    pub username: String,
    /// Message body.
    pub text: String,
    /// Server timestamp, or the receipt time when the server sent none.
    pub at: DateTime<Utc>,
    /// Rank title earned by the author. `None` for untitled users.
    pub user_title: Option<String>,
    /// Quoted message. `None` for top-level messages.
    pub reply_to: Option<ReplyRef>,
}

/// Typed event decoded from one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Informational notice from the server or the client itself.
    SystemNotice {
        /// Notice text.
        text: String,
        /// When the notice was issued.
        at: DateTime<Utc>,
    },

    /// Live chat message.
    UserMessage(UserMessage),

    /// Recent messages, in the order the server delivered them.
    MessageHistory {
        /// Historical messages.
        messages: Vec<UserMessage>,
    },

    /// Error reported by the server or raised locally.
    ErrorNotice {
        /// Error text.
        text: String,
    },
}

impl InboundEvent {
    /// Decode one text frame.
    ///
    /// `received_at` stands in for frames that carry no timestamp.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::InvalidJson` if `text` is not JSON
    /// - `ProtocolError::NotAnObject` if the JSON is not an object
    /// - `ProtocolError::MissingType` / `UnknownType` for a bad discriminator
    /// - `ProtocolError::MissingField` / `InvalidField` for a bad shape
    /// - `ProtocolError::InvalidTimestamp` for an unparsable timestamp
    pub fn decode(text: &str, received_at: DateTime<Utc>) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value, received_at)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: &Value, received_at: DateTime<Utc>) -> Result<Self> {
        let obj = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        let kind = match obj.get("type") {
            None | Some(Value::Null) => return Err(ProtocolError::MissingType),
            Some(Value::String(kind)) => kind.as_str(),
            Some(_) => {
                return Err(ProtocolError::InvalidField {
                    frame: "inbound",
                    field: "type",
                    expected: "string",
                });
            },
        };

        match kind {
            "system" => {
                let text = required_str(obj, "system", "message")?;
                let at = timestamp(obj, "system", received_at)?;
                Ok(Self::SystemNotice { text, at })
            },
            "user" => UserMessage::from_object(obj, "user", received_at).map(Self::UserMessage),
            "message_history" => {
                let entries = match obj.get("messages") {
                    None | Some(Value::Null) => {
                        return Err(ProtocolError::MissingField {
                            frame: "message_history",
                            field: "messages",
                        });
                    },
                    Some(Value::Array(entries)) => entries,
                    Some(_) => {
                        return Err(ProtocolError::InvalidField {
                            frame: "message_history",
                            field: "messages",
                            expected: "array",
                        });
                    },
                };

                let messages = entries
                    .iter()
                    .map(|entry| history_entry(entry, received_at))
                    .collect::<Result<Vec<_>>>()?;

                Ok(Self::MessageHistory { messages })
            },
            "error" => Ok(Self::ErrorNotice { text: required_str(obj, "error", "message")? }),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }

    /// Wire name of this event's type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SystemNotice { .. } => "system",
            Self::UserMessage(_) => "user",
            Self::MessageHistory { .. } => "message_history",
            Self::ErrorNotice { .. } => "error",
        }
    }

    /// Build a system notice.
    pub fn system(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::SystemNotice { text: text.into(), at }
    }

    /// Build an error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self::ErrorNotice { text: text.into() }
    }
}

impl UserMessage {
    fn from_object(
        obj: &Map<String, Value>,
        frame: &'static str,
        received_at: DateTime<Utc>,
    ) -> Result<Self> {
        let message_id = MessageId(required_id(obj, frame, "message_id")?);
        let user_id = UserId(required_id(obj, frame, "user_id")?);
        let username = required_str(obj, frame, "username")?;
        let text = required_str(obj, frame, "message")?;
        let at = timestamp(obj, frame, received_at)?;
        let user_title = optional_str(obj, frame, "user_title")?;

        let reply_id = optional_id(obj, frame, "reply_to_id")?;
        let quoted_username = optional_str(obj, frame, "quoted_username")?;
        let quoted_text = optional_str(obj, frame, "quoted_message_text")?;

        // The server nulls the quote when the original was deleted; the reply
        // id alone is not enough to render a quote.
        let reply_to = match (reply_id, quoted_username) {
            (Some(id), Some(username)) => Some(ReplyRef {
                message_id: MessageId(id),
                username,
                snippet: quoted_text.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self { message_id, user_id, username, text, at, user_title, reply_to })
    }
}

fn history_entry(entry: &Value, received_at: DateTime<Utc>) -> Result<UserMessage> {
    let obj = entry.as_object().ok_or(ProtocolError::InvalidField {
        frame: "message_history",
        field: "messages",
        expected: "array of objects",
    })?;

    match obj.get("type") {
        None | Some(Value::Null) => {},
        Some(Value::String(kind)) if kind == "user" => {},
        Some(_) => {
            return Err(ProtocolError::InvalidField {
                frame: "message_history",
                field: "messages",
                expected: "user messages",
            });
        },
    }

    UserMessage::from_object(obj, "message_history", received_at)
}

fn required_str(
    obj: &Map<String, Value>,
    frame: &'static str,
    field: &'static str,
) -> Result<String> {
    optional_str(obj, frame, field)?.ok_or(ProtocolError::MissingField { frame, field })
}

fn optional_str(
    obj: &Map<String, Value>,
    frame: &'static str,
    field: &'static str,
) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ProtocolError::InvalidField { frame, field, expected: "string" }),
    }
}

fn required_id(obj: &Map<String, Value>, frame: &'static str, field: &'static str) -> Result<Id> {
    optional_id(obj, frame, field)?.ok_or(ProtocolError::MissingField { frame, field })
}

fn optional_id(
    obj: &Map<String, Value>,
    frame: &'static str,
    field: &'static str,
) -> Result<Option<Id>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Id::from_value(value).map(Some).ok_or(ProtocolError::InvalidField {
            frame,
            field,
            expected: "integer or string",
        }),
    }
}

fn timestamp(
    obj: &Map<String, Value>,
    frame: &'static str,
    received_at: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    match optional_str(obj, frame, "timestamp")? {
        Some(raw) => parse_timestamp(&raw),
        None => Ok(received_at),
    }
}

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 with an offset, and zone-less date-times which are taken
/// as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| ProtocolError::InvalidTimestamp(raw.to_string()))
}
