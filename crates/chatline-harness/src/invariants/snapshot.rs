//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use chatline_app::{LogEntry, Runtime};
use chatline_client::{ConnectionId, ConnectionState, MessageId, ReplyDraft};
use chatline_core::Environment;

use crate::SimDriver;

/// Snapshot of one widget and everything its driver recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    /// Connection state held by the client.
    pub client_state: ConnectionState,
    /// Connection state mirrored by the widget.
    pub app_state: ConnectionState,
    /// Whether the widget accepts input.
    pub input_enabled: bool,
    /// Consecutive reconnect attempts.
    pub reconnect_attempts: u32,
    /// Attempts allowed by the policy.
    pub max_attempts: u32,
    /// Whether a reconnect is scheduled.
    pub retry_pending: bool,
    /// Reply draft held by the client.
    pub client_draft: Option<ReplyDraft>,
    /// Reply draft shown by the widget.
    pub app_draft: Option<ReplyDraft>,
    /// Every frame written, in order.
    pub sent: Vec<(ConnectionId, String)>,
    /// Ids of chat messages in the log, in order.
    pub chat_ids: Vec<MessageId>,
}

impl SystemSnapshot {
    /// Snapshot of a fresh, idle widget.
    pub fn idle(max_attempts: u32) -> Self {
        Self {
            client_state: ConnectionState::Idle,
            app_state: ConnectionState::Idle,
            input_enabled: false,
            reconnect_attempts: 0,
            max_attempts,
            retry_pending: false,
            client_draft: None,
            app_draft: None,
            sent: Vec::new(),
            chat_ids: Vec::new(),
        }
    }

    /// Capture the state of a simulated runtime.
    pub fn capture<E: Environment>(runtime: &Runtime<SimDriver, E>) -> Self {
        let app = runtime.app();
        let client = runtime.client();

        Self {
            client_state: client.state(),
            app_state: app.state(),
            input_enabled: app.input_enabled(),
            reconnect_attempts: client.reconnect_attempts(),
            max_attempts: client.config().policy.max_attempts,
            retry_pending: client.retry_deadline().is_some(),
            client_draft: client.reply_draft().cloned(),
            app_draft: app.reply_draft().cloned(),
            sent: runtime.driver().sent(),
            chat_ids: app
                .log()
                .iter()
                .filter_map(LogEntry::message)
                .map(|m| m.message_id.clone())
                .collect(),
        }
    }
}
