//! Message and user identifiers.
//!
//! The server emits database keys as JSON numbers, but also string ids (live
//! messages that failed to persist carry `"live_<ts>"`). Both forms are kept
//! verbatim so an id echoed back in `reply_to_id` has the same JSON type it
//! arrived with.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier that is either a JSON integer or a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// Numeric id.
    Int(i64),
    /// String id.
    Text(String),
}

impl Id {
    /// Extract an id from a JSON value. Floats, booleans, arrays and objects
    /// are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Int),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Whether the textual form of this id equals `s`.
    ///
    /// Used when an id is typed by a user and the wire type is unknown.
    pub fn matches_str(&self, s: &str) -> bool {
        match self {
            Self::Int(n) => s.parse::<i64>().is_ok_and(|parsed| parsed == *n),
            Self::Text(t) => t == s,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Id);

        impl $name {
            /// Underlying id.
            pub fn id(&self) -> &Id {
                &self.0
            }

            /// Whether the textual form of this id equals `s`.
            pub fn matches_str(&self, s: &str) -> bool {
                self.0.matches_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Id> for $name {
            fn from(id: Id) -> Self {
                Self(id)
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                Self(Id::Int(n))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(Id::Text(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(Id::Text(s))
            }
        }
    };
}

id_newtype!(
    /// Identifier of a chat message.
    MessageId
);

id_newtype!(
    /// Identifier of a chat user.
    UserId
);
