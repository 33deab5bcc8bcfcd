//! Application layer for chatline
//!
//! Pure view-model state machine and generic runtime for the chat widget,
//! enabling deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: Widget state machine (log, input, reply bar, unread marker)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop wiring App, client and Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod driver;
mod event;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use driver::{Driver, DriverInput};
pub use event::AppEvent;
pub use runtime::Runtime;
pub use state::LogEntry;
