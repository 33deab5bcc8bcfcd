//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific input, rendering and WebSocket transport, while the
//! generic [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use chatline_client::{CloseCode, ConnectionId, TransportEvent};

use crate::{App, AppEvent};

/// Input gathered by a driver.
#[derive(Debug, Clone)]
pub enum DriverInput {
    /// User interaction.
    App(AppEvent),

    /// Callback from a transport instance opened through [`Driver::open`].
    Transport {
        /// Instance that produced the event.
        conn: ConnectionId,
        /// What happened.
        event: TransportEvent,
    },

    /// Periodic tick for retry scheduling.
    Tick,

    /// Stop the runtime.
    Shutdown,
}

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the terminal client and in
/// simulation.
///
/// Transport operations start work and return; their outcomes come back
/// through [`Driver::poll_input`] as [`DriverInput::Transport`]. An `Err` from
/// `open` or `send` is reported to the client as a connect or send failure.
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next input.
    fn poll_input(&mut self) -> impl Future<Output = Result<DriverInput, Self::Error>> + Send;

    /// Start a transport instance connecting to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot even be created.
    fn open(
        &mut self,
        conn: ConnectionId,
        url: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close a transport instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance is unknown or already gone.
    fn close(
        &mut self,
        conn: ConnectionId,
        code: CloseCode,
        reason: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Write a text frame on a transport instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be queued.
    fn send(
        &mut self,
        conn: ConnectionId,
        frame: String,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Stop all transports and clean up resources.
    fn stop(&mut self);
}
