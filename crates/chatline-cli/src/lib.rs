//! Line-oriented terminal client for chatline.
//!
//! Reads commands and messages from stdin, prints the chat log to stdout and
//! talks to the chat endpoint over WebSockets. All orchestration is the
//! shared [`chatline_app::Runtime`]; this crate only supplies the
//! [`terminal::TerminalDriver`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod command;
pub mod render;
pub mod terminal;

pub use command::{CommandError, parse_line};
pub use terminal::{TerminalDriver, TerminalError};
