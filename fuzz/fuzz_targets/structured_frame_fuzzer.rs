//! Fuzz target for well-typed but hostile inbound frames
//!
//! Random bytes rarely get past the JSON parser. This target builds objects
//! with a valid `type` and fields of arbitrary JSON types.
//!
//! # Invariants
//!
//! - NEVER panic
//! - A decoded user message always has the id and text it was sent with
//! - A decoded history batch has as many messages as the frame

#![no_main]

use arbitrary::Arbitrary;
use chatline_proto::InboundEvent;
use chrono::DateTime;
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value, json};

#[derive(Debug, Arbitrary)]
enum Kind {
    System,
    User,
    History,
    Error,
    Other(String),
}

#[derive(Debug, Arbitrary)]
enum Field {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<i64>),
    Absent,
}

impl Field {
    fn value(&self) -> Option<Value> {
        match self {
            Self::Null => Some(Value::Null),
            Self::Bool(b) => Some(json!(b)),
            Self::Int(n) => Some(json!(n)),
            Self::Float(f) => Some(json!(f)),
            Self::Text(s) => Some(json!(s)),
            Self::List(items) => Some(json!(items)),
            Self::Absent => None,
        }
    }
}

#[derive(Debug, Arbitrary)]
struct Frame {
    kind: Kind,
    message_id: Field,
    user_id: Field,
    username: Field,
    message: Field,
    timestamp: Field,
    user_title: Field,
    reply_to_id: Field,
    history_len: u8,
}

impl Frame {
    fn user_object(&self) -> Map<String, Value> {
        let mut obj = Map::new();
        obj.insert("type".into(), json!("user"));
        for (key, field) in [
            ("message_id", &self.message_id),
            ("user_id", &self.user_id),
            ("username", &self.username),
            ("message", &self.message),
            ("timestamp", &self.timestamp),
            ("user_title", &self.user_title),
            ("reply_to_id", &self.reply_to_id),
        ] {
            if let Some(value) = field.value() {
                obj.insert(key.into(), value);
            }
        }
        obj
    }

    fn to_value(&self) -> Value {
        let kind = match &self.kind {
            Kind::System => "system",
            Kind::User => "user",
            Kind::History => "message_history",
            Kind::Error => "error",
            Kind::Other(other) => other.as_str(),
        };

        match self.kind {
            Kind::User => Value::Object(self.user_object()),
            Kind::History => {
                let entries = vec![Value::Object(self.user_object()); usize::from(self.history_len % 8)];
                json!({ "type": kind, "messages": entries })
            },
            _ => {
                let mut obj = self.user_object();
                obj.insert("type".into(), json!(kind));
                Value::Object(obj)
            },
        }
    }
}

fuzz_target!(|frame: Frame| {
    let value = frame.to_value();
    match InboundEvent::decode(&value.to_string(), DateTime::UNIX_EPOCH) {
        Ok(InboundEvent::UserMessage(message)) => {
            assert_eq!(Some(&Value::String(message.text.clone())), value.get("message"));
        },
        Ok(InboundEvent::MessageHistory { messages }) => {
            assert_eq!(messages.len(), usize::from(frame.history_len % 8));
        },
        Ok(_) | Err(_) => {},
    }
});
