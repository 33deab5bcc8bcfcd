//! Deterministic simulation harness for chatline testing.
//!
//! Virtual-time [`SimEnv`] and scripted [`SimDriver`] implementations of the
//! Environment and Driver traits, so the production [`chatline_app::Runtime`]
//! can be driven step by step without sockets or real timers.
//!
//! # Model-Based Testing
//!
//! [`Operation`] enumerates everything that can happen to a running widget:
//! user intents, transport callbacks and the passage of time. [`Simulation`]
//! applies arbitrary operation sequences and checks invariants after each.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod operation;
pub mod sim_driver;
pub mod sim_env;
pub mod simulation;

pub use invariants::{
    HistoryRequestFirst, InputOnlyWhenOpen, Invariant, InvariantRegistry, InvariantResult,
    RetryBudget, RetryOnlyWhenClosed, StateMirrored, SystemSnapshot, UniqueChatLog, Violation,
};
pub use operation::{Operation, SmallText};
pub use sim_driver::{RecordedClose, SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
pub use simulation::Simulation;
