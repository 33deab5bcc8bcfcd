//! Connection lifecycle state machine.
//!
//! Tracks which transport instance is live, the logical connection state and
//! the reconnect budget. Uses the action pattern: methods take time as input
//! and return decisions for the caller to act on. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ connect ┌────────────┐  opened  ┌──────┐
//! │ Idle │────────>│ Connecting │─────────>│ Open │
//! └──────┘         └────────────┘          └──────┘
//!                     │      ^                │  │
//!          closed     │      │ connect /      │  │ close()
//!                     ↓      │ retry due      │  ↓
//!                  ┌────────┐│     closed     │ ┌─────────┐
//!                  │ Closed │<────────────────┘ │ Closing │
//!                  └────────┘<──────────────────└─────────┘
//! ```
//!
//! Every transport instance gets a fresh [`ConnectionId`]. Events from an id
//! other than the current one are rejected with
//! [`ConnectionError::StaleConnection`], so a replaced transport can never
//! drive the state machine.

use std::{
    fmt,
    time::{Duration, Instant},
};

use chatline_proto::CloseCode;
use tracing::{debug, info, warn};

use crate::{env::MonotonicInstant, error::ConnectionError};

/// Reconnect attempts allowed after an abnormal close.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Fixed delay before each reconnect attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Identifier of one transport instance.
///
/// Ids increase monotonically over the lifetime of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Logical connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection attempted yet
    #[default]
    Idle,
    /// Transport created, waiting for it to open
    Connecting,
    /// Transport open, frames may be sent
    Open,
    /// Close requested locally, waiting for the transport to finish
    Closing,
    /// Transport gone (normal close, failure or local close)
    Closed,
}

impl ConnectionState {
    /// Whether a new connect is allowed from this state.
    pub fn can_connect(self) -> bool {
        !matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Reconnect budget applied after abnormal closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts allowed before giving up
    pub max_attempts: u32,
    /// Delay before each attempt
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delay: DEFAULT_RETRY_DELAY }
    }
}

/// A transport instance the caller must now open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectAttempt {
    /// Id of the new transport
    pub id: ConnectionId,
    /// One-based attempt number within the current retry cycle
    pub attempt: u32,
    /// Instance replaced by this one, which the caller must close
    pub superseded: Option<ConnectionId>,
}

/// What happened when the current transport closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Close was requested locally
    Requested,
    /// Peer closed with a normal code; no retry
    Normal,
    /// Abnormal close; one retry is scheduled
    Retry {
        /// Retry counter after this close
        attempt: u32,
        /// Delay until the retry is due
        delay: Duration,
    },
    /// Abnormal close with the retry budget spent
    Exhausted {
        /// Attempts made before giving up
        attempts: u32,
    },
}

/// Connection state machine
///
/// Owns the state, the id of the live transport, the retry counter and at
/// most one retry deadline.
///
/// # Invariants
///
/// - `attempts <= policy.max_attempts`
/// - `retry_at` is only set while `Closed`
/// - `current` is `Some` exactly while `Connecting`, `Open` or `Closing`
#[derive(Debug, Clone)]
pub struct Connection<I = Instant> {
    state: ConnectionState,
    policy: ReconnectPolicy,
    current: Option<ConnectionId>,
    next_id: u64,
    attempts: u32,
    retry_at: Option<I>,
}

impl<I: MonotonicInstant> Connection<I> {
    /// Create a connection in [`ConnectionState::Idle`].
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy,
            current: None,
            next_id: 0,
            attempts: 0,
            retry_at: None,
        }
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect policy in force
    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Id of the live transport. `None` while idle or closed.
    #[must_use]
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current
    }

    /// Reconnect attempts made since the last successful open or manual
    /// connect.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// When the pending retry is due. `None` if no retry is scheduled.
    #[must_use]
    pub fn retry_deadline(&self) -> Option<I> {
        self.retry_at
    }

    /// Whether `id` is the live transport.
    #[must_use]
    pub fn is_current(&self, id: ConnectionId) -> bool {
        self.current == Some(id)
    }

    /// Start a new transport instance.
    ///
    /// A manual connect (user action) resets the retry counter. Any pending
    /// retry is consumed. From `Closing`, the closing instance is superseded
    /// and returned for the caller to tear down.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if `Connecting` or `Open`
    pub fn begin_connect(&mut self, manual: bool) -> Result<ConnectAttempt, ConnectionError> {
        if !self.state.can_connect() {
            return Err(ConnectionError::InvalidState {
                state: self.state,
                operation: "connect",
            });
        }

        if manual {
            self.attempts = 0;
        }
        self.retry_at = None;

        let superseded = self.current.take();
        self.next_id += 1;
        let id = ConnectionId(self.next_id);

        self.current = Some(id);
        self.state = ConnectionState::Connecting;
        debug!(conn = %id, manual, attempt = self.attempts + 1, "connecting");

        Ok(ConnectAttempt { id, attempt: self.attempts + 1, superseded })
    }

    /// Transport `id` opened.
    ///
    /// Transitions `Connecting → Open` and resets the retry counter.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::StaleConnection` if `id` is not current
    /// - `ConnectionError::InvalidState` if not `Connecting`
    pub fn opened(&mut self, id: ConnectionId) -> Result<(), ConnectionError> {
        self.check_current(id)?;

        if self.state != ConnectionState::Connecting {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "open" });
        }

        self.state = ConnectionState::Open;
        self.attempts = 0;
        info!(conn = %id, "connection open");

        Ok(())
    }

    /// Transport `id` closed with `code`.
    ///
    /// Always transitions to `Closed`. After an abnormal close with budget
    /// left, records a single retry deadline at `now + policy.delay`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::StaleConnection` if `id` is not current
    pub fn closed(
        &mut self,
        id: ConnectionId,
        code: CloseCode,
        now: I,
    ) -> Result<CloseOutcome, ConnectionError> {
        self.check_current(id)?;

        let previous = self.state;
        self.state = ConnectionState::Closed;
        self.current = None;

        if previous == ConnectionState::Closing {
            debug!(conn = %id, %code, "closed on request");
            return Ok(CloseOutcome::Requested);
        }

        if code.is_normal() {
            info!(conn = %id, %code, "connection closed");
            return Ok(CloseOutcome::Normal);
        }

        if self.attempts >= self.policy.max_attempts {
            warn!(conn = %id, %code, attempts = self.attempts, "reconnect budget exhausted");
            return Ok(CloseOutcome::Exhausted { attempts: self.attempts });
        }

        self.attempts += 1;
        self.retry_at = Some(now + self.policy.delay);
        debug!(
            conn = %id,
            %code,
            attempt = self.attempts,
            delay_ms = self.policy.delay.as_millis() as u64,
            "retry scheduled"
        );

        Ok(CloseOutcome::Retry { attempt: self.attempts, delay: self.policy.delay })
    }

    /// Request a local close of the live transport.
    ///
    /// Transitions `Open|Connecting → Closing` and returns the id to close.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if there is no live transport
    pub fn begin_close(&mut self) -> Result<ConnectionId, ConnectionError> {
        match (self.state, self.current) {
            (ConnectionState::Open | ConnectionState::Connecting, Some(id)) => {
                self.state = ConnectionState::Closing;
                Ok(id)
            },
            (state, _) => Err(ConnectionError::InvalidState { state, operation: "close" }),
        }
    }

    /// Drop the pending retry, if any. Returns whether one was pending.
    pub fn cancel_retry(&mut self) -> bool {
        self.retry_at.take().is_some()
    }

    /// Whether the pending retry is due at `now`.
    ///
    /// Returns true at most once per scheduled retry; the deadline is cleared
    /// when it fires.
    pub fn poll_retry(&mut self, now: I) -> bool {
        match self.retry_at {
            Some(at) if now >= at && self.state == ConnectionState::Closed => {
                self.retry_at = None;
                debug!(attempt = self.attempts, "retry due");
                true
            },
            _ => false,
        }
    }

    fn check_current(&self, id: ConnectionId) -> Result<(), ConnectionError> {
        if self.is_current(id) {
            Ok(())
        } else {
            Err(ConnectionError::StaleConnection { id, current: self.current })
        }
    }
}
