//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`chatline_app::Runtime`] orchestration code runs in both production and
//! simulation. Transports are never real: opens, closes and frames are
//! recorded, and transport callbacks are injected by the test.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chatline_app::{App, AppEvent, Driver, DriverInput};
use chatline_client::{CloseCode, ConnectionId, TransportEvent};
use thiserror::Error;

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sim driver: {0}")]
pub struct SimDriverError(pub String);

/// Close request recorded by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedClose {
    /// Instance that was closed.
    pub conn: ConnectionId,
    /// Close status sent.
    pub code: CloseCode,
    /// Close reason sent.
    pub reason: String,
}

/// Shared state for input injection and effect capture.
///
/// This allows injection from outside async contexts.
#[derive(Debug, Default)]
struct SharedState {
    inputs: VecDeque<DriverInput>,
    opened: Vec<(ConnectionId, String)>,
    closed: Vec<RecordedClose>,
    sent: Vec<(ConnectionId, String)>,
    renders: usize,
    fail_open: Option<String>,
    fail_send: Option<String>,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
///
/// Clones share state, so a test can keep a handle after moving the driver
/// into a [`chatline_app::Runtime`]. When no input is queued,
/// [`Driver::poll_input`] returns [`DriverInput::Shutdown`].
#[derive(Debug, Clone, Default)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
}

impl SimDriver {
    /// Create a new simulation driver.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a driver input.
    pub fn inject(&self, input: DriverInput) {
        self.lock().inputs.push_back(input);
    }

    /// Queue a user event.
    pub fn inject_event(&self, event: AppEvent) {
        self.inject(DriverInput::App(event));
    }

    /// Queue a transport callback.
    pub fn inject_transport(&self, conn: ConnectionId, event: TransportEvent) {
        self.inject(DriverInput::Transport { conn, event });
    }

    /// Queue an inbound text frame.
    pub fn inject_frame(&self, conn: ConnectionId, frame: impl Into<String>) {
        self.inject_transport(conn, TransportEvent::Frame(frame.into()));
    }

    /// Queue a tick.
    pub fn inject_tick(&self) {
        self.inject(DriverInput::Tick);
    }

    /// Take the next queued input.
    pub fn pop_input(&self) -> Option<DriverInput> {
        self.lock().inputs.pop_front()
    }

    /// Check if there are pending inputs to process.
    pub fn has_pending(&self) -> bool {
        !self.lock().inputs.is_empty()
    }

    /// Make every following `open` fail with `reason`. `None` restores
    /// success.
    pub fn fail_open(&self, reason: Option<&str>) {
        self.lock().fail_open = reason.map(str::to_string);
    }

    /// Make every following `send` fail with `reason`. `None` restores
    /// success.
    pub fn fail_send(&self, reason: Option<&str>) {
        self.lock().fail_send = reason.map(str::to_string);
    }

    /// Every transport open requested so far, in order.
    pub fn opened(&self) -> Vec<(ConnectionId, String)> {
        self.lock().opened.clone()
    }

    /// Most recently opened transport.
    pub fn last_opened(&self) -> Option<ConnectionId> {
        self.lock().opened.last().map(|(conn, _)| *conn)
    }

    /// Every transport close requested so far, in order.
    pub fn closed(&self) -> Vec<RecordedClose> {
        self.lock().closed.clone()
    }

    /// Every frame written so far, in order.
    pub fn sent(&self) -> Vec<(ConnectionId, String)> {
        self.lock().sent.clone()
    }

    /// Frames written on one transport, in order.
    pub fn sent_on(&self, conn: ConnectionId) -> Vec<String> {
        self.lock().sent.iter().filter(|(c, _)| *c == conn).map(|(_, f)| f.clone()).collect()
    }

    /// Take all captured outgoing frames.
    pub fn take_sent(&self) -> Vec<(ConnectionId, String)> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Number of renders so far.
    pub fn render_count(&self) -> usize {
        self.lock().renders
    }

    /// Whether the runtime stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    fn record_open(&self, conn: ConnectionId, url: &str) -> Result<(), SimDriverError> {
        let mut state = self.lock();
        state.opened.push((conn, url.to_string()));
        match &state.fail_open {
            Some(reason) => Err(SimDriverError(reason.clone())),
            None => Ok(()),
        }
    }

    fn record_send(&self, conn: ConnectionId, frame: String) -> Result<(), SimDriverError> {
        let mut state = self.lock();
        if let Some(reason) = &state.fail_send {
            return Err(SimDriverError(reason.clone()));
        }
        state.sent.push((conn, frame));
        Ok(())
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_input(&mut self) -> Result<DriverInput, Self::Error> {
        Ok(self.pop_input().unwrap_or(DriverInput::Shutdown))
    }

    async fn open(&mut self, conn: ConnectionId, url: &str) -> Result<(), Self::Error> {
        self.record_open(conn, url)
    }

    async fn close(
        &mut self,
        conn: ConnectionId,
        code: CloseCode,
        reason: &str,
    ) -> Result<(), Self::Error> {
        self.lock().closed.push(RecordedClose { conn, code, reason: reason.to_string() });
        Ok(())
    }

    async fn send(&mut self, conn: ConnectionId, frame: String) -> Result<(), Self::Error> {
        self.record_send(conn, frame)
    }

    fn render(&mut self, _app: &App) -> Result<(), Self::Error> {
        self.lock().renders += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inject_event_queues_input() {
        let driver = SimDriver::new();
        driver.inject_event(AppEvent::Shown);

        assert!(driver.has_pending());
    }

    #[tokio::test]
    async fn poll_input_drains_then_shuts_down() {
        let mut driver = SimDriver::new();
        driver.inject_tick();

        assert!(matches!(driver.poll_input().await, Ok(DriverInput::Tick)));
        assert!(matches!(driver.poll_input().await, Ok(DriverInput::Shutdown)));
    }

    #[tokio::test]
    async fn clones_share_captures() {
        let handle = SimDriver::new();
        let mut driver = handle.clone();

        driver.send(ConnectionId::from(1), "frame".to_string()).await.unwrap();
        assert_eq!(handle.sent_on(ConnectionId::from(1)), vec!["frame".to_string()]);
        assert!(handle.sent_on(ConnectionId::from(2)).is_empty());
    }

    #[tokio::test]
    async fn failing_open_is_still_recorded() {
        let mut driver = SimDriver::new();
        driver.fail_open(Some("refused"));

        let result = driver.open(ConnectionId::from(1), "wss://x/ws/chat/").await;
        assert_eq!(result, Err(SimDriverError("refused".to_string())));
        assert_eq!(driver.last_opened(), Some(ConnectionId::from(1)));
    }

    #[tokio::test]
    async fn failing_send_is_not_captured() {
        let mut driver = SimDriver::new();
        driver.fail_send(Some("broken pipe"));

        assert!(driver.send(ConnectionId::from(1), "x".to_string()).await.is_err());
        assert!(driver.sent().is_empty());
    }
}
