//! Terminal driver for the line-oriented client.
//!
//! Implements the [`Driver`] trait over stdin/stdout. Each transport the
//! client asks for is a [`transport::open`] task; their events arrive on one
//! shared channel.

use std::{
    collections::{HashMap, VecDeque},
    io::{self, Stdout, Write},
    time::Duration,
};

use chatline_app::{App, AppEvent, Driver, DriverInput};
use chatline_client::{
    CloseCode, ConnectionId, Environment, SystemEnv, TransportEvent,
    transport::{self, EventReceiver, EventSender, TransportError, TransportHandle},
};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc,
};
use tracing::debug;

use crate::{
    command::parse_line,
    render::{entry_line, status_line},
};

/// How often retry deadlines are checked.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No transport with this id is running.
    #[error("no transport {0}")]
    UnknownTransport(ConnectionId),
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Prints each log entry once, and the status line whenever it changes.
/// Ticks are timed with the environment's clock.
pub struct TerminalDriver<E: Environment = SystemEnv> {
    env: E,
    next_tick: E::Instant,
    input: Lines<BufReader<Stdin>>,
    input_open: bool,
    out: Stdout,
    pending: VecDeque<DriverInput>,
    events_tx: EventSender,
    events_rx: EventReceiver,
    transports: HashMap<ConnectionId, TransportHandle>,
    printed: usize,
    last_status: Option<String>,
}

impl Default for TerminalDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalDriver {
    /// Create a driver reading stdin on the system clock.
    ///
    /// Must be called within a tokio runtime.
    pub fn new() -> Self {
        Self::with_env(SystemEnv::new())
    }
}

impl<E: Environment> TerminalDriver<E> {
    /// Create a driver reading stdin, ticking on `env`. The chat counts as
    /// visible from the start.
    ///
    /// Must be called within a tokio runtime.
    pub fn with_env(env: E) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let next_tick = env.now() + TICK_INTERVAL;

        Self {
            env,
            next_tick,
            input: BufReader::new(tokio::io::stdin()).lines(),
            input_open: true,
            out: io::stdout(),
            pending: VecDeque::from([DriverInput::App(AppEvent::Shown)]),
            events_tx,
            events_rx,
            transports: HashMap::new(),
            printed: 0,
            last_status: None,
        }
    }

    fn transport(&self, conn: ConnectionId) -> Result<&TransportHandle, TerminalError> {
        self.transports.get(&conn).ok_or(TerminalError::UnknownTransport(conn))
    }

    /// Forget transports that reported their final event.
    fn track(&mut self, conn: ConnectionId, event: &TransportEvent) {
        if matches!(event, TransportEvent::Closed { .. } | TransportEvent::ConnectFailed { .. }) {
            debug!(%conn, "transport finished");
            self.transports.remove(&conn);
        }
    }

    /// Time left until the next tick is due.
    fn until_tick(&self) -> Duration {
        let now = self.env.now();
        if now >= self.next_tick { Duration::ZERO } else { self.next_tick - now }
    }

    fn print(&mut self, line: &str) -> Result<(), TerminalError> {
        writeln!(self.out, "{line}")?;
        Ok(())
    }
}

impl<E: Environment> Driver for TerminalDriver<E> {
    type Error = TerminalError;

    async fn poll_input(&mut self) -> Result<DriverInput, Self::Error> {
        if let Some(input) = self.pending.pop_front() {
            return Ok(input);
        }

        loop {
            let wait = self.until_tick();
            tokio::select! {
                line = self.input.next_line(), if self.input_open => match line? {
                    Some(line) => match parse_line(&line) {
                        Ok(event) => return Ok(DriverInput::App(event)),
                        Err(e) => self.print(&e.to_string())?,
                    },
                    None => {
                        debug!("stdin closed");
                        self.input_open = false;
                        return Ok(DriverInput::Shutdown);
                    },
                },

                Some((conn, event)) = self.events_rx.recv() => {
                    self.track(conn, &event);
                    return Ok(DriverInput::Transport { conn, event });
                },

                () = self.env.sleep(wait) => {
                    self.next_tick = self.env.now() + TICK_INTERVAL;
                    return Ok(DriverInput::Tick);
                },
            }
        }
    }

    async fn open(&mut self, conn: ConnectionId, url: &str) -> Result<(), Self::Error> {
        let handle = transport::open(conn, url.to_string(), self.events_tx.clone());
        self.transports.insert(conn, handle);
        Ok(())
    }

    async fn close(
        &mut self,
        conn: ConnectionId,
        code: CloseCode,
        reason: &str,
    ) -> Result<(), Self::Error> {
        self.transport(conn)?.close(code, reason)?;
        Ok(())
    }

    async fn send(&mut self, conn: ConnectionId, frame: String) -> Result<(), Self::Error> {
        self.transport(conn)?.send(frame)?;
        Ok(())
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let log = app.log();
        let new = log.get(self.printed..).unwrap_or_default();
        for entry in new {
            writeln!(self.out, "{}", entry_line(entry))?;
        }
        self.printed = log.len();

        let status = status_line(app);
        if self.last_status.as_ref() != Some(&status) {
            writeln!(self.out, "{status}")?;
            self.last_status = Some(status);
        }

        self.out.flush()?;
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping a handle closes its socket with 1001.
        self.transports.clear();
    }
}
