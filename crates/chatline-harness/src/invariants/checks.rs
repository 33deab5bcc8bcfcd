//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::{HashMap, HashSet};

use chatline_client::ConnectionState;
use chatline_proto::OutboundFrame;

use super::{Invariant, InvariantResult, SystemSnapshot};

/// The widget mirrors the client's connection state and reply draft.
///
/// Checked between inputs, once the runtime has drained its work queue.
pub struct StateMirrored;

impl Invariant for StateMirrored {
    fn name(&self) -> &'static str {
        "state_mirrored"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.app_state != state.client_state {
            return Err(self.violation(format!(
                "widget shows {} but client is {}",
                state.app_state, state.client_state
            )));
        }
        if state.app_draft != state.client_draft {
            return Err(self.violation(format!(
                "widget draft {:?} differs from client draft {:?}",
                state.app_draft, state.client_draft
            )));
        }
        Ok(())
    }
}

/// Input is enabled exactly while the connection is open.
pub struct InputOnlyWhenOpen;

impl Invariant for InputOnlyWhenOpen {
    fn name(&self) -> &'static str {
        "input_only_when_open"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let open = state.app_state == ConnectionState::Open;
        if state.input_enabled != open {
            return Err(self.violation(format!(
                "input_enabled={} in state {}",
                state.input_enabled, state.app_state
            )));
        }
        Ok(())
    }
}

/// Reconnect attempts never exceed the policy's budget.
pub struct RetryBudget;

impl Invariant for RetryBudget {
    fn name(&self) -> &'static str {
        "retry_budget"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.reconnect_attempts > state.max_attempts {
            return Err(self.violation(format!(
                "{} attempts with a budget of {}",
                state.reconnect_attempts, state.max_attempts
            )));
        }
        Ok(())
    }
}

/// A reconnect is only scheduled while the connection is closed.
pub struct RetryOnlyWhenClosed;

impl Invariant for RetryOnlyWhenClosed {
    fn name(&self) -> &'static str {
        "retry_only_when_closed"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.retry_pending && state.client_state != ConnectionState::Closed {
            return Err(self.violation(format!("retry pending in state {}", state.client_state)));
        }
        Ok(())
    }
}

/// The first frame on every transport is the history request, and it is
/// never sent twice on the same transport.
pub struct HistoryRequestFirst;

impl Invariant for HistoryRequestFirst {
    fn name(&self) -> &'static str {
        "history_request_first"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let history = OutboundFrame::REQUEST_RECENT_MESSAGES
            .encode()
            .map_err(|e| self.violation(format!("cannot encode history request: {e}")))?;

        let mut per_conn: HashMap<_, Vec<&str>> = HashMap::new();
        for (conn, frame) in &state.sent {
            per_conn.entry(*conn).or_default().push(frame);
        }

        for (conn, frames) in per_conn {
            if frames.first() != Some(&history.as_str()) {
                return Err(self.violation(format!(
                    "transport {conn} started with {:?}",
                    frames.first()
                )));
            }
            let requests = frames.iter().filter(|f| **f == history).count();
            if requests > 1 {
                return Err(
                    self.violation(format!("transport {conn} requested history {requests} times"))
                );
            }
        }
        Ok(())
    }
}

/// No chat message appears twice in the log.
pub struct UniqueChatLog;

impl Invariant for UniqueChatLog {
    fn name(&self) -> &'static str {
        "unique_chat_log"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut seen = HashSet::new();
        for id in &state.chat_ids {
            if !seen.insert(id) {
                return Err(self.violation(format!("message {id} logged twice")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chatline_client::{ConnectionId, MessageId};

    use super::*;

    fn history() -> String {
        OutboundFrame::REQUEST_RECENT_MESSAGES.encode().unwrap()
    }

    #[test]
    fn state_mirrored_detects_divergence() {
        let mut state = SystemSnapshot::idle(5);
        state.client_state = ConnectionState::Open;

        let violation = StateMirrored.check(&state).unwrap_err();
        assert_eq!(violation.invariant, "state_mirrored");
    }

    #[test]
    fn input_only_when_open_detects_enabled_input_while_closed() {
        let mut state = SystemSnapshot::idle(5);
        state.input_enabled = true;

        assert!(InputOnlyWhenOpen.check(&state).is_err());
    }

    #[test]
    fn retry_budget_allows_exactly_max() {
        let mut state = SystemSnapshot::idle(5);
        state.reconnect_attempts = 5;
        assert!(RetryBudget.check(&state).is_ok());

        state.reconnect_attempts = 6;
        assert!(RetryBudget.check(&state).is_err());
    }

    #[test]
    fn retry_only_when_closed_rejects_pending_retry_while_open() {
        let mut state = SystemSnapshot::idle(5);
        state.client_state = ConnectionState::Open;
        state.app_state = ConnectionState::Open;
        state.retry_pending = true;

        assert!(RetryOnlyWhenClosed.check(&state).is_err());
    }

    #[test]
    fn history_request_first_accepts_one_request_per_transport() {
        let mut state = SystemSnapshot::idle(5);
        state.sent = vec![
            (ConnectionId::from(1), history()),
            (ConnectionId::from(1), r#"{"message":"hi"}"#.to_string()),
            (ConnectionId::from(2), history()),
        ];

        assert!(HistoryRequestFirst.check(&state).is_ok());
    }

    #[test]
    fn history_request_first_rejects_chat_before_history() {
        let mut state = SystemSnapshot::idle(5);
        state.sent = vec![(ConnectionId::from(1), r#"{"message":"hi"}"#.to_string())];

        assert!(HistoryRequestFirst.check(&state).is_err());
    }

    #[test]
    fn history_request_first_rejects_repeated_request() {
        let mut state = SystemSnapshot::idle(5);
        state.sent = vec![(ConnectionId::from(1), history()), (ConnectionId::from(1), history())];

        assert!(HistoryRequestFirst.check(&state).is_err());
    }

    #[test]
    fn unique_chat_log_detects_duplicates() {
        let mut state = SystemSnapshot::idle(5);
        state.chat_ids = vec![MessageId::from(1), MessageId::from(2), MessageId::from(1)];

        assert!(UniqueChatLog.check(&state).is_err());
    }

    #[test]
    fn unique_chat_log_keeps_wire_types_apart() {
        let mut state = SystemSnapshot::idle(5);
        state.chat_ids = vec![MessageId::from(1), MessageId::from("1")];

        assert!(UniqueChatLog.check(&state).is_ok());
    }
}
