//! Chat transport client state machine.
//!
//! [`ChatClient`] owns exactly one logical connection to the chat endpoint.
//! It decides when transports are opened and closed, frames outbound
//! messages, decodes inbound frames and retries abnormal losses within the
//! [`ReconnectPolicy`]. All I/O is left to the caller through
//! [`ClientAction`]s.

use std::fmt;

use chatline_core::{
    CloseOutcome, ConnectAttempt, Connection, ConnectionId, ConnectionState, Endpoint,
    Environment, ReconnectPolicy,
};
use chatline_proto::{
    CloseCode, InboundEvent, MessageId, OutboundChatMessage, OutboundFrame, ProtocolError,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent, TransportEvent},
    notice,
    reply::ReplyDraft,
};

/// Callback invoked once per delivered [`InboundEvent`].
pub type EventHandler = Box<dyn FnMut(&InboundEvent) + Send>;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Chat endpoint.
    pub endpoint: Endpoint,
    /// Reconnect budget.
    pub policy: ReconnectPolicy,
}

impl ClientConfig {
    /// Configuration for `endpoint` with the default reconnect policy.
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint, policy: ReconnectPolicy::default() }
    }

    /// Replace the reconnect policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Chat transport client.
///
/// # Invariants
///
/// - A chat frame is only emitted while the state is `Open`
/// - The first frame after every open is the history request
/// - The reply draft is cleared by every send, by local close, by reconnect
///   and on entering `Closed`
pub struct ChatClient<E: Environment> {
    env: E,
    config: ClientConfig,
    connection: Connection<E::Instant>,
    reply_draft: Option<ReplyDraft>,
    handlers: Vec<EventHandler>,
}

impl<E: Environment> ChatClient<E> {
    /// Create an idle client. Nothing connects until [`Self::connect`].
    pub fn new(env: E, config: ClientConfig) -> Self {
        let connection = Connection::new(config.policy);
        Self { env, config, connection, reply_draft: None, handlers: Vec::new() }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Id of the live transport instance. `None` while idle or closed.
    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.connection.current_id()
    }

    /// Reconnect attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.connection.attempts()
    }

    /// When the pending reconnect is due. `None` if none is scheduled.
    pub fn retry_deadline(&self) -> Option<E::Instant> {
        self.connection.retry_deadline()
    }

    /// Active reply draft.
    pub fn reply_draft(&self) -> Option<&ReplyDraft> {
        self.reply_draft.as_ref()
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register a handler for delivered events.
    ///
    /// Handlers run synchronously, in registration order, before
    /// [`Self::handle`] returns.
    pub fn on_event(&mut self, handler: impl FnMut(&InboundEvent) + Send + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Manually connect. No-op if already connecting or open.
    pub fn connect(&mut self) -> Vec<ClientAction> {
        self.handle(ClientEvent::Connect)
    }

    /// Send a chat message, replying to `reply_to` or the reply draft.
    pub fn send(&mut self, text: &str, reply_to: Option<MessageId>) -> Vec<ClientAction> {
        self.handle(ClientEvent::Send { text: text.to_string(), reply_to })
    }

    /// Set the reply draft.
    pub fn set_reply_draft(&mut self, draft: ReplyDraft) -> Vec<ClientAction> {
        self.handle(ClientEvent::SetReplyDraft(draft))
    }

    /// Clear the reply draft. Idempotent.
    pub fn clear_reply_draft(&mut self) -> Vec<ClientAction> {
        self.handle(ClientEvent::ClearReplyDraft)
    }

    /// Close the connection, or cancel a pending reconnect.
    pub fn close(&mut self) -> Vec<ClientAction> {
        self.handle(ClientEvent::Close)
    }

    /// Process an event and return resulting actions.
    ///
    /// Every `Deliver` action has been passed to the registered handlers, in
    /// order, when this returns.
    pub fn handle(&mut self, event: ClientEvent<E::Instant>) -> Vec<ClientAction> {
        let actions = match event {
            ClientEvent::Connect => self.handle_connect(true),
            ClientEvent::Transport { conn, event } => self.handle_transport(conn, event),
            ClientEvent::Send { text, reply_to } => self.handle_send(&text, reply_to),
            ClientEvent::SetReplyDraft(draft) => {
                debug!(message_id = %draft.message_id(), "reply draft set");
                self.reply_draft = Some(draft.clone());
                vec![ClientAction::ReplyDraftChanged(Some(draft))]
            },
            ClientEvent::ClearReplyDraft => {
                let mut actions = Vec::new();
                self.clear_draft(&mut actions);
                actions
            },
            ClientEvent::Close => self.handle_close(),
            ClientEvent::Tick { now } => self.handle_tick(now),
        };

        self.dispatch(&actions);
        actions
    }

    fn handle_connect(&mut self, manual: bool) -> Vec<ClientAction> {
        let ConnectAttempt { id, attempt, superseded } =
            match self.connection.begin_connect(manual) {
                Ok(attempt) => attempt,
                Err(e) => {
                    debug!(error = %e, "skipping connect: connection already live");
                    return vec![];
                },
            };

        let url = self.config.endpoint.to_string();
        info!(conn = %id, attempt, %url, "connecting");

        let mut actions = Vec::new();
        if let Some(old) = superseded {
            debug!(conn = %old, "closing superseded transport");
            actions.push(ClientAction::CloseTransport {
                conn: old,
                code: CloseCode::NORMAL,
                reason: "superseded".to_string(),
            });
        }

        self.clear_draft(&mut actions);
        actions.push(ClientAction::StateChanged(ConnectionState::Connecting));
        actions.push(self.system_notice(notice::connecting(attempt)));
        actions.push(ClientAction::OpenTransport { conn: id, url });
        actions
    }

    fn handle_transport(&mut self, conn: ConnectionId, event: TransportEvent) -> Vec<ClientAction> {
        if !self.connection.is_current(conn) {
            debug!(%conn, current = ?self.connection.current_id(), ?event, "ignoring stale transport event");
            return vec![];
        }

        match event {
            TransportEvent::Opened => self.handle_opened(conn),
            TransportEvent::Frame(text) => self.handle_frame(conn, &text),
            TransportEvent::Closed { code, reason } => {
                let mut actions = Vec::new();
                self.handle_closed(conn, code, &reason, &mut actions);
                actions
            },
            TransportEvent::Errored { reason } => {
                warn!(%conn, %reason, "transport error");
                vec![ClientAction::Deliver(InboundEvent::error(notice::transport_error(&reason)))]
            },
            TransportEvent::ConnectFailed { reason } => {
                warn!(%conn, %reason, "connect failed");
                let mut actions =
                    vec![ClientAction::Deliver(InboundEvent::error(notice::connect_failed(&reason)))];
                self.handle_closed(conn, CloseCode::ABNORMAL, &reason, &mut actions);
                actions
            },
            TransportEvent::SendFailed { reason } => {
                warn!(%conn, %reason, "send failed");
                vec![ClientAction::Deliver(InboundEvent::error(notice::send_failed(&reason)))]
            },
        }
    }

    fn handle_opened(&mut self, conn: ConnectionId) -> Vec<ClientAction> {
        if let Err(e) = self.connection.opened(conn) {
            warn!(%conn, error = %e, "unexpected open");
            return vec![];
        }

        info!(%conn, "connected");

        let mut actions = vec![ClientAction::StateChanged(ConnectionState::Open)];
        match OutboundFrame::REQUEST_RECENT_MESSAGES.encode() {
            Ok(frame) => actions.push(ClientAction::SendFrame { conn, frame }),
            Err(e) => {
                error!(%conn, error = %e, "failed to encode history request");
                actions.push(ClientAction::Deliver(InboundEvent::error(
                    ClientError::Encode(e).to_string(),
                )));
            },
        }
        actions.push(self.system_notice(notice::CONNECTED));
        actions
    }

    fn handle_frame(&mut self, conn: ConnectionId, text: &str) -> Vec<ClientAction> {
        match InboundEvent::decode(text, self.env.wall_clock()) {
            Ok(event) => {
                debug!(%conn, kind = event.kind(), "frame received");
                vec![ClientAction::Deliver(event)]
            },
            Err(e) => {
                warn!(%conn, error = %e, len = text.len(), "dropping malformed frame");
                let err = ClientError::MalformedFrame(e);
                vec![ClientAction::Deliver(InboundEvent::error(err.to_string()))]
            },
        }
    }

    fn handle_closed(
        &mut self,
        conn: ConnectionId,
        code: CloseCode,
        reason: &str,
        actions: &mut Vec<ClientAction>,
    ) {
        let outcome = match self.connection.closed(conn, code, self.env.now()) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%conn, error = %e, "unexpected close");
                return;
            },
        };

        self.clear_draft(actions);
        actions.push(ClientAction::StateChanged(ConnectionState::Closed));

        match outcome {
            CloseOutcome::Requested | CloseOutcome::Normal => {
                info!(%conn, %code, %reason, ?outcome, "connection closed");
                actions.push(self.system_notice(notice::CLOSED));
            },
            CloseOutcome::Retry { attempt, delay } => {
                warn!(%conn, %code, %reason, attempt, ?delay, "connection lost, retry scheduled");
                let max = self.config.policy.max_attempts;
                actions.push(self.system_notice(notice::reconnecting(attempt, max, delay)));
            },
            CloseOutcome::Exhausted { attempts } => {
                error!(%conn, %code, %reason, attempts, "reconnect attempts exhausted");
                actions.push(ClientAction::Deliver(InboundEvent::error(
                    notice::RECONNECT_EXHAUSTED,
                )));
            },
        }
    }

    fn handle_send(&mut self, text: &str, reply_to: Option<MessageId>) -> Vec<ClientAction> {
        let draft = self.reply_draft.take();
        let reply_to = reply_to.or_else(|| draft.as_ref().map(|d| d.message_id().clone()));

        let mut actions = Vec::new();
        match self.frame_message(text, reply_to) {
            Ok((conn, frame)) => {
                debug!(%conn, len = frame.len(), "sending message");
                actions.push(ClientAction::SendFrame { conn, frame });
            },
            Err(e) => {
                warn!(error = %e, "send rejected");
                actions.push(ClientAction::Deliver(InboundEvent::error(e.to_string())));
            },
        }

        if draft.is_some() {
            actions.push(ClientAction::ReplyDraftChanged(None));
        }
        actions
    }

    fn frame_message(
        &self,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<(ConnectionId, String), ClientError> {
        let state = self.connection.state();
        let conn = match (state, self.connection.current_id()) {
            (ConnectionState::Open, Some(conn)) => conn,
            _ => return Err(ClientError::NotConnected { state }),
        };

        let message = OutboundChatMessage::new(text, reply_to).map_err(|e| match e {
            ProtocolError::EmptyMessage => ClientError::EmptyMessage,
            other => ClientError::Encode(other),
        })?;
        let frame = OutboundFrame::from(message).encode().map_err(ClientError::Encode)?;

        Ok((conn, frame))
    }

    fn handle_close(&mut self) -> Vec<ClientAction> {
        match self.connection.begin_close() {
            Ok(conn) => {
                info!(%conn, "closing connection");
                let mut actions = Vec::new();
                self.clear_draft(&mut actions);
                actions.push(ClientAction::StateChanged(ConnectionState::Closing));
                actions.push(ClientAction::CloseTransport {
                    conn,
                    code: CloseCode::NORMAL,
                    reason: "client closed".to_string(),
                });
                actions
            },
            Err(e) => {
                if self.connection.cancel_retry() {
                    info!("pending reconnect cancelled");
                    vec![self.system_notice(notice::RETRY_CANCELLED)]
                } else {
                    debug!(error = %e, "nothing to close");
                    vec![]
                }
            },
        }
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        if self.connection.poll_retry(now) {
            debug!(attempts = self.connection.attempts(), "retry due");
            self.handle_connect(false)
        } else {
            vec![]
        }
    }

    fn clear_draft(&mut self, actions: &mut Vec<ClientAction>) {
        if self.reply_draft.take().is_some() {
            debug!("reply draft cleared");
            actions.push(ClientAction::ReplyDraftChanged(None));
        }
    }

    fn system_notice(&self, text: impl Into<String>) -> ClientAction {
        ClientAction::Deliver(InboundEvent::system(text, self.env.wall_clock()))
    }

    fn dispatch(&mut self, actions: &[ClientAction]) {
        for event in actions.iter().filter_map(ClientAction::delivered) {
            for handler in &mut self.handlers {
                handler(event);
            }
        }
    }
}

impl<E: Environment> fmt::Debug for ChatClient<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("config", &self.config)
            .field("state", &self.connection.state())
            .field("current", &self.connection.current_id())
            .field("attempts", &self.connection.attempts())
            .field("reply_draft", &self.reply_draft)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use chatline_core::endpoint::DEFAULT_PATH;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    use super::*;

    #[derive(Clone)]
    struct TestEnv {
        base: Instant,
        elapsed: Arc<Mutex<Duration>>,
    }

    impl TestEnv {
        fn new() -> Self {
            Self { base: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
        }

        fn advance(&self, by: Duration) -> Instant {
            let mut elapsed = self.elapsed.lock().unwrap();
            *elapsed += by;
            self.base + *elapsed
        }
    }

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.base + *self.elapsed.lock().unwrap()
        }

        fn wall_clock(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }
    }

    fn client() -> (ChatClient<TestEnv>, TestEnv) {
        let env = TestEnv::new();
        let endpoint = Endpoint::from_origin("https://chat.example.com", DEFAULT_PATH).unwrap();
        (ChatClient::new(env.clone(), ClientConfig::new(endpoint)), env)
    }

    fn opened_client() -> (ChatClient<TestEnv>, TestEnv, ConnectionId) {
        let (mut client, env) = client();
        let conn = open_transport(&mut client);
        (client, env, conn)
    }

    /// Connect (or retry) and report the new transport as opened.
    fn open_transport(client: &mut ChatClient<TestEnv>) -> ConnectionId {
        let conn = client.current_connection().unwrap_or_else(|| {
            client.connect();
            client.current_connection().unwrap()
        });
        client.handle(ClientEvent::Transport { conn, event: TransportEvent::Opened });
        conn
    }

    fn transport(
        client: &mut ChatClient<TestEnv>,
        conn: ConnectionId,
        event: TransportEvent,
    ) -> Vec<ClientAction> {
        client.handle(ClientEvent::Transport { conn, event })
    }

    fn close(client: &mut ChatClient<TestEnv>, conn: ConnectionId, code: u16) -> Vec<ClientAction> {
        transport(client, conn, TransportEvent::Closed { code: CloseCode(code), reason: String::new() })
    }

    fn frames(actions: &[ClientAction]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::SendFrame { frame, .. } => Some(frame.as_str()),
                _ => None,
            })
            .collect()
    }

    fn errors(actions: &[ClientAction]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|a| match a.delivered() {
                Some(InboundEvent::ErrorNotice { text }) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn notices(actions: &[ClientAction]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|a| match a.delivered() {
                Some(InboundEvent::SystemNotice { text, .. }) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn connect_opens_transport_to_endpoint() {
        let (mut client, _env) = client();
        let actions = client.connect();

        assert_eq!(client.state(), ConnectionState::Connecting);
        let conn = client.current_connection().unwrap();
        assert_eq!(actions, vec![
            ClientAction::StateChanged(ConnectionState::Connecting),
            ClientAction::Deliver(InboundEvent::system(
                "Connecting to chat... (attempt 1)",
                Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            )),
            ClientAction::OpenTransport { conn, url: "wss://chat.example.com/ws/chat/".into() },
        ]);
    }

    #[test]
    fn connect_while_live_is_noop() {
        let (mut client, _env) = client();
        client.connect();
        assert!(client.connect().is_empty());

        let conn = open_transport(&mut client);
        assert!(client.connect().is_empty());
        assert_eq!(client.current_connection(), Some(conn));
    }

    #[test]
    fn open_requests_history_first() {
        let (mut client, _env) = client();
        client.connect();
        let conn = client.current_connection().unwrap();

        let actions = transport(&mut client, conn, TransportEvent::Opened);

        assert_eq!(client.state(), ConnectionState::Open);
        assert_eq!(actions[0], ClientAction::StateChanged(ConnectionState::Open));
        assert_eq!(frames(&actions), vec![r#"{"type":"request_recent_messages"}"#]);
        assert_eq!(notices(&actions), vec!["Connected."]);
    }

    #[test]
    fn plain_send_has_no_reply_id() {
        let (mut client, _env, conn) = opened_client();

        let actions = client.send("hello", None);

        assert_eq!(actions, vec![ClientAction::SendFrame {
            conn,
            frame: r#"{"message":"hello"}"#.into()
        }]);
        assert_eq!(client.reply_draft(), None);
    }

    #[test]
    fn reply_send_consumes_draft() {
        let (mut client, _env, conn) = opened_client();
        client.set_reply_draft(ReplyDraft::with_snippet(MessageId::from("42"), "Alice", "hi there..."));

        let actions = client.send("reply!", None);

        assert_eq!(actions, vec![
            ClientAction::SendFrame { conn, frame: r#"{"message":"reply!","reply_to_id":"42"}"#.into() },
            ClientAction::ReplyDraftChanged(None),
        ]);
        assert_eq!(client.reply_draft(), None);
    }

    #[test]
    fn explicit_reply_target_wins_over_draft() {
        let (mut client, _env, _conn) = opened_client();
        client.set_reply_draft(ReplyDraft::new(MessageId::from(1), "Bob", "first"));

        let actions = client.send("  yes  ", Some(MessageId::from(7)));

        assert_eq!(frames(&actions), vec![r#"{"message":"yes","reply_to_id":7}"#]);
        assert_eq!(client.reply_draft(), None);
    }

    #[test]
    fn going_away_close_is_not_retried() {
        let (mut client, _env, conn) = opened_client();

        let actions = close(&mut client, conn, 1001);

        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.retry_deadline(), None);
        assert_eq!(notices(&actions), vec!["Connection closed."]);
        assert!(errors(&actions).is_empty());
    }

    #[test]
    fn abnormal_closes_retry_then_open_resets_budget() {
        let (mut client, env, mut conn) = opened_client();
        let delay = client.config().policy.delay;

        for attempt in 1..=3 {
            let actions = close(&mut client, conn, 1006);
            assert_eq!(client.state(), ConnectionState::Closed);
            assert_eq!(client.reconnect_attempts(), attempt);
            assert_eq!(notices(&actions), vec![format!(
                "Connection lost. Reconnecting in 5s (attempt {attempt} of 5)..."
            )]);

            let early = env.advance(delay - Duration::from_millis(1));
            assert!(client.handle(ClientEvent::Tick { now: early }).is_empty());

            let due = env.advance(Duration::from_millis(1));
            let actions = client.handle(ClientEvent::Tick { now: due });
            assert_eq!(client.state(), ConnectionState::Connecting);
            assert!(actions.iter().any(|a| matches!(a, ClientAction::OpenTransport { .. })));
            assert_eq!(notices(&actions), vec![format!(
                "Connecting to chat... (attempt {})",
                attempt + 1
            )]);
            conn = client.current_connection().unwrap();
        }

        assert_eq!(client.reconnect_attempts(), 3);
        transport(&mut client, conn, TransportEvent::Opened);
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[test]
    fn send_while_connecting_is_rejected() {
        let (mut client, _env) = client();
        client.connect();

        let actions = client.send("hello", None);

        assert!(frames(&actions).is_empty());
        assert_eq!(errors(&actions), vec!["Cannot send: not connected (connecting)."]);
        assert_eq!(client.state(), ConnectionState::Connecting);
    }

    #[test]
    fn blank_send_is_rejected_but_clears_draft() {
        let (mut client, _env, _conn) = opened_client();
        client.set_reply_draft(ReplyDraft::new(MessageId::from(1), "Bob", "hi"));

        let actions = client.send("   ", None);

        assert!(frames(&actions).is_empty());
        assert_eq!(errors(&actions), vec!["Cannot send an empty message."]);
        assert_eq!(client.reply_draft(), None);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[test]
    fn retries_exhaust_with_terminal_notice() {
        let (mut client, env, mut conn) = opened_client();
        let delay = client.config().policy.delay;

        for _ in 0..5 {
            close(&mut client, conn, 1006);
            let now = env.advance(delay);
            client.handle(ClientEvent::Tick { now });
            conn = client.current_connection().unwrap();
        }

        let actions = close(&mut client, conn, 1006);

        assert_eq!(errors(&actions), vec![
            "Unable to reconnect to chat. Please reload the page to retry."
        ]);
        assert_eq!(client.retry_deadline(), None);

        let now = env.advance(Duration::from_secs(60));
        assert!(client.handle(ClientEvent::Tick { now }).is_empty());
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[test]
    fn manual_connect_after_exhaustion_starts_fresh() {
        let (mut client, env, mut conn) = opened_client();
        for _ in 0..5 {
            close(&mut client, conn, 1011);
            let now = env.advance(Duration::from_secs(5));
            client.handle(ClientEvent::Tick { now });
            conn = client.current_connection().unwrap();
        }
        close(&mut client, conn, 1011);

        let actions = client.connect();

        assert_eq!(client.reconnect_attempts(), 0);
        assert_eq!(notices(&actions), vec!["Connecting to chat... (attempt 1)"]);
    }

    #[test]
    fn connect_failure_is_retried() {
        let (mut client, _env) = client();
        client.connect();
        let conn = client.current_connection().unwrap();

        let actions =
            transport(&mut client, conn, TransportEvent::ConnectFailed { reason: "dns".into() });

        assert_eq!(errors(&actions), vec!["Could not connect: dns"]);
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.reconnect_attempts(), 1);
        assert!(client.retry_deadline().is_some());
    }

    #[test]
    fn transport_error_waits_for_close() {
        let (mut client, _env, conn) = opened_client();

        let actions = transport(&mut client, conn, TransportEvent::Errored { reason: "reset".into() });

        assert_eq!(errors(&actions), vec!["Connection error: reset"]);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[test]
    fn send_failure_keeps_connection() {
        let (mut client, _env, conn) = opened_client();

        let actions =
            transport(&mut client, conn, TransportEvent::SendFailed { reason: "broken pipe".into() });

        assert_eq!(errors(&actions), vec!["Failed to send message: broken pipe"]);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[test]
    fn inbound_frames_are_delivered() {
        let (mut client, _env, conn) = opened_client();
        let frame = json!({ "type": "error", "message": "slow down" }).to_string();

        let actions = transport(&mut client, conn, TransportEvent::Frame(frame));

        assert_eq!(actions, vec![ClientAction::Deliver(InboundEvent::error("slow down"))]);
    }

    #[test]
    fn malformed_frame_is_reported_without_state_change() {
        let (mut client, _env, conn) = opened_client();
        let frame = json!({ "type": "user", "message": "no ids" }).to_string();

        let actions = transport(&mut client, conn, TransportEvent::Frame(frame));

        assert_eq!(errors(&actions), vec![
            "Received a malformed message: user frame is missing required field `message_id`"
        ]);
        assert_eq!(client.state(), ConnectionState::Open);
        assert_eq!(client.current_connection(), Some(conn));
    }

    #[test]
    fn stale_transport_events_are_ignored() {
        let (mut client, _env, old) = opened_client();
        close(&mut client, old, 1000);
        client.connect();
        let new = client.current_connection().unwrap();

        assert!(close(&mut client, old, 1006).is_empty());
        assert!(transport(&mut client, old, TransportEvent::Opened).is_empty());
        assert!(transport(&mut client, old, TransportEvent::Frame("{}".into())).is_empty());

        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(client.current_connection(), Some(new));
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[test]
    fn local_close_is_not_retried() {
        let (mut client, _env, conn) = opened_client();
        client.set_reply_draft(ReplyDraft::new(MessageId::from(3), "Carol", "hey"));

        let actions = client.close();
        assert_eq!(client.state(), ConnectionState::Closing);
        assert_eq!(client.reply_draft(), None);
        assert!(actions.contains(&ClientAction::CloseTransport {
            conn,
            code: CloseCode::NORMAL,
            reason: "client closed".into(),
        }));

        let actions = close(&mut client, conn, 1006);
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.retry_deadline(), None);
        assert_eq!(notices(&actions), vec!["Connection closed."]);
    }

    #[test]
    fn connect_while_closing_supersedes_transport() {
        let (mut client, _env, old) = opened_client();
        client.close();

        let actions = client.connect();
        let new = client.current_connection().unwrap();

        assert_ne!(new, old);
        assert_eq!(actions[0], ClientAction::CloseTransport {
            conn: old,
            code: CloseCode::NORMAL,
            reason: "superseded".into(),
        });
    }

    #[test]
    fn close_cancels_pending_retry() {
        let (mut client, env, conn) = opened_client();
        close(&mut client, conn, 1006);

        let actions = client.close();
        assert_eq!(notices(&actions), vec!["Reconnect cancelled."]);

        let now = env.advance(Duration::from_secs(10));
        assert!(client.handle(ClientEvent::Tick { now }).is_empty());
    }

    #[test]
    fn clear_reply_draft_is_idempotent() {
        let (mut client, _env) = client();
        client.set_reply_draft(ReplyDraft::new(MessageId::from(1), "Bob", "hi"));

        assert_eq!(client.clear_reply_draft(), vec![ClientAction::ReplyDraftChanged(None)]);
        assert!(client.clear_reply_draft().is_empty());
    }

    #[test]
    fn reconnect_clears_reply_draft() {
        let (mut client, env, conn) = opened_client();
        close(&mut client, conn, 1006);
        client.set_reply_draft(ReplyDraft::new(MessageId::from(1), "Bob", "hi"));

        let now = env.advance(Duration::from_secs(5));
        let actions = client.handle(ClientEvent::Tick { now });

        assert!(actions.contains(&ClientAction::ReplyDraftChanged(None)));
        assert_eq!(client.reply_draft(), None);
    }

    #[test]
    fn handlers_see_events_in_order() {
        let (mut client, _env) = client();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        client.on_event(move |event| log.lock().unwrap().push(format!("a:{}", event.kind())));
        let log = Arc::clone(&seen);
        client.on_event(move |event| log.lock().unwrap().push(format!("b:{}", event.kind())));

        let conn = open_transport(&mut client);
        transport(
            &mut client,
            conn,
            TransportEvent::Frame(json!({ "type": "message_history", "messages": [] }).to_string()),
        );

        assert_eq!(*seen.lock().unwrap(), vec![
            "a:system", "b:system", "a:system", "b:system", "a:message_history",
            "b:message_history",
        ]);
    }
}
