//! Application state machine.
//!
//! [`App`] is the chat widget's view model. It consumes [`crate::AppEvent`]s
//! from the user and from the client, and produces [`crate::AppAction`]s for
//! the runtime to execute. It never touches the wire.
//!
//! # Responsibilities
//!
//! - Keeps the chat log, merging history batches without duplicates.
//! - Enables input only while the connection is open.
//! - Tracks visibility and the unread marker.
//! - Mirrors the client's reply draft for the reply bar.

use std::collections::HashSet;

use chatline_client::{ConnectionState, InboundEvent, MessageId, ReplyDraft, UserMessage};
use tracing::debug;

use crate::{AppAction, AppEvent, LogEntry};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Id of the logged-in user, as injected by the host.
    user_id: String,
    /// Connection state mirrored from the client.
    state: ConnectionState,
    /// Chat log, oldest first.
    log: Vec<LogEntry>,
    /// Ids of chat messages in the log.
    seen: HashSet<MessageId>,
    /// Whether the widget is on screen.
    visible: bool,
    /// Unread marker.
    unread: bool,
    /// Reply bar content mirrored from the client.
    reply: Option<ReplyDraft>,
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl App {
    /// Create a hidden, idle widget for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: ConnectionState::Idle,
            log: Vec::new(),
            seen: HashSet::new(),
            visible: false,
            unread: false,
            reply: None,
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Submit(text) => self.submit(text),
            AppEvent::ReplyTo(message_id) => self.reply_to(&message_id),
            AppEvent::CancelReply => vec![AppAction::ClearReplyDraft],
            AppEvent::Shown => self.show(),
            AppEvent::Hidden => {
                self.visible = false;
                vec![AppAction::Render]
            },
            AppEvent::Reconnect => vec![AppAction::Connect],
            AppEvent::Disconnect => vec![AppAction::Close],
            AppEvent::Quit => vec![AppAction::Quit],
            AppEvent::Inbound(event) => {
                self.record(event);
                vec![AppAction::Render]
            },
            AppEvent::ConnectionChanged(state) => {
                self.state = state;
                vec![AppAction::Render]
            },
            AppEvent::ReplyDraftChanged(draft) => {
                self.reply = draft;
                vec![AppAction::Render]
            },
        }
    }

    fn submit(&mut self, text: String) -> Vec<AppAction> {
        if !self.input_enabled() {
            self.status_message = Some(format!("Not connected ({}).", self.state));
            return vec![AppAction::Render];
        }
        if text.trim().is_empty() {
            return vec![];
        }

        self.status_message = None;
        vec![AppAction::Send { text }]
    }

    fn reply_to(&mut self, message_id: &str) -> Vec<AppAction> {
        match self.find_message(message_id) {
            Some(message) => {
                let draft = ReplyDraft::from_message(message);
                self.status_message = None;
                vec![AppAction::SetReplyDraft(draft)]
            },
            None => {
                self.status_message = Some(format!("No message with id {message_id}."));
                vec![AppAction::Render]
            },
        }
    }

    fn show(&mut self) -> Vec<AppAction> {
        self.visible = true;
        if self.unread {
            debug!("widget visible, clearing unread marker");
            self.unread = false;
        }

        let mut actions = Vec::new();
        if matches!(self.state, ConnectionState::Idle | ConnectionState::Closed) {
            debug!(state = %self.state, "widget visible while disconnected, reconnecting");
            actions.push(AppAction::Connect);
        }
        actions.push(AppAction::Render);
        actions
    }

    fn record(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::SystemNotice { text, at } => self.log.push(LogEntry::System { text, at }),
            InboundEvent::ErrorNotice { text } => self.log.push(LogEntry::Error { text }),
            InboundEvent::UserMessage(message) => {
                let own = self.is_own(&message);
                if !self.visible && !own {
                    self.unread = true;
                }
                self.push_chat(message, own, false);
            },
            InboundEvent::MessageHistory { messages } => {
                for message in messages {
                    let own = self.is_own(&message);
                    self.push_chat(message, own, true);
                }
            },
        }
    }

    fn push_chat(&mut self, message: UserMessage, own: bool, history: bool) {
        if !self.seen.insert(message.message_id.clone()) {
            return;
        }
        self.log.push(LogEntry::Chat { message, own, history });
    }

    fn is_own(&self, message: &UserMessage) -> bool {
        message.user_id.matches_str(&self.user_id)
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Chat message in the log with the given id.
    pub fn find_message(&self, message_id: &str) -> Option<&UserMessage> {
        self.log
            .iter()
            .rev()
            .filter_map(LogEntry::message)
            .find(|message| message.message_id.matches_str(message_id))
    }

    /// Id of the logged-in user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the input box accepts submissions.
    pub fn input_enabled(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Chat log, oldest first.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// Whether the widget is visible.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Whether the unread marker is shown.
    pub fn unread(&self) -> bool {
        self.unread
    }

    /// Reply bar content. `None` when not replying.
    pub fn reply_draft(&self) -> Option<&ReplyDraft> {
        self.reply.as_ref()
    }

    /// Status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use chatline_client::UserId;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn message(id: i64, user: i64, text: &str) -> UserMessage {
        UserMessage {
            message_id: MessageId::from(id),
            user_id: UserId::from(user),
            username: format!("user{user}"),
            text: text.to_string(),
            at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            user_title: None,
            reply_to: None,
        }
    }

    fn open_app() -> App {
        let mut app = App::new("7");
        app.handle(AppEvent::ConnectionChanged(ConnectionState::Open));
        app
    }

    #[test]
    fn new_app_is_hidden_and_idle() {
        let app = App::new("7");
        assert_eq!(app.state(), ConnectionState::Idle);
        assert!(!app.visible());
        assert!(!app.input_enabled());
        assert!(app.log().is_empty());
    }

    #[test]
    fn input_enabled_only_when_open() {
        let mut app = App::new("7");
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            app.handle(AppEvent::ConnectionChanged(state));
            assert!(!app.input_enabled(), "{state}");
        }

        app.handle(AppEvent::ConnectionChanged(ConnectionState::Open));
        assert!(app.input_enabled());
    }

    #[test]
    fn submit_while_open_sends() {
        let mut app = open_app();
        assert_eq!(app.handle(AppEvent::Submit("hi".into())), vec![AppAction::Send {
            text: "hi".into()
        }]);
    }

    #[test]
    fn submit_while_disconnected_is_rejected() {
        let mut app = App::new("7");
        app.handle(AppEvent::ConnectionChanged(ConnectionState::Connecting));

        let actions = app.handle(AppEvent::Submit("hi".into()));

        assert_eq!(actions, vec![AppAction::Render]);
        assert_eq!(app.status_message(), Some("Not connected (connecting)."));
    }

    #[test]
    fn blank_submit_is_ignored() {
        let mut app = open_app();
        assert!(app.handle(AppEvent::Submit("   ".into())).is_empty());
    }

    #[test]
    fn message_from_other_while_hidden_marks_unread() {
        let mut app = open_app();
        app.handle(AppEvent::Inbound(InboundEvent::UserMessage(message(1, 9, "hey"))));
        assert!(app.unread());

        app.handle(AppEvent::Shown);
        assert!(!app.unread());
    }

    #[test]
    fn own_message_does_not_mark_unread() {
        let mut app = open_app();
        app.handle(AppEvent::Inbound(InboundEvent::UserMessage(message(1, 7, "mine"))));

        assert!(!app.unread());
        assert!(matches!(app.log()[0], LogEntry::Chat { own: true, history: false, .. }));
    }

    #[test]
    fn message_while_visible_does_not_mark_unread() {
        let mut app = open_app();
        app.handle(AppEvent::Shown);
        app.handle(AppEvent::Inbound(InboundEvent::UserMessage(message(1, 9, "hey"))));
        assert!(!app.unread());
    }

    #[test]
    fn history_does_not_mark_unread() {
        let mut app = open_app();
        app.handle(AppEvent::Inbound(InboundEvent::MessageHistory {
            messages: vec![message(1, 9, "old")],
        }));
        assert!(!app.unread());
        assert!(matches!(app.log()[0], LogEntry::Chat { history: true, .. }));
    }

    #[test]
    fn repeated_history_is_not_duplicated() {
        let mut app = open_app();
        let history = InboundEvent::MessageHistory {
            messages: vec![message(1, 9, "a"), message(2, 9, "b")],
        };

        app.handle(AppEvent::Inbound(history.clone()));
        app.handle(AppEvent::Inbound(history));
        app.handle(AppEvent::Inbound(InboundEvent::UserMessage(message(3, 9, "c"))));

        let ids: Vec<_> =
            app.log().iter().filter_map(LogEntry::message).map(|m| m.text.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn numeric_and_textual_ids_are_distinct_messages() {
        let mut app = open_app();
        let textual = UserMessage { message_id: MessageId::from("42"), ..message(42, 9, "text id") };

        app.handle(AppEvent::Inbound(InboundEvent::UserMessage(message(42, 9, "int id"))));
        app.handle(AppEvent::Inbound(InboundEvent::UserMessage(textual)));

        let texts: Vec<_> =
            app.log().iter().filter_map(LogEntry::message).map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["int id", "text id"]);
    }

    #[test]
    fn shown_while_disconnected_connects() {
        let mut app = App::new("7");
        assert_eq!(app.handle(AppEvent::Shown), vec![AppAction::Connect, AppAction::Render]);

        app.handle(AppEvent::ConnectionChanged(ConnectionState::Closed));
        assert_eq!(app.handle(AppEvent::Shown), vec![AppAction::Connect, AppAction::Render]);
    }

    #[test]
    fn shown_while_connecting_does_not_reconnect() {
        let mut app = App::new("7");
        app.handle(AppEvent::ConnectionChanged(ConnectionState::Connecting));
        assert_eq!(app.handle(AppEvent::Shown), vec![AppAction::Render]);
    }

    #[test]
    fn reply_to_known_message_sets_draft() {
        let mut app = open_app();
        app.handle(AppEvent::Inbound(InboundEvent::UserMessage(message(
            42,
            9,
            "a fairly long message that needs a snippet",
        ))));

        let actions = app.handle(AppEvent::ReplyTo("42".into()));

        let [AppAction::SetReplyDraft(draft)] = actions.as_slice() else {
            panic!("expected SetReplyDraft, got {actions:?}");
        };
        assert_eq!(draft.message_id(), &MessageId::from(42));
        assert_eq!(draft.username(), "user9");
        assert_eq!(draft.snippet(), "a fairly long message tha...");
    }

    #[test]
    fn reply_to_unknown_message_sets_status() {
        let mut app = open_app();
        assert_eq!(app.handle(AppEvent::ReplyTo("404".into())), vec![AppAction::Render]);
        assert_eq!(app.status_message(), Some("No message with id 404."));
    }

    #[test]
    fn notices_are_logged() {
        let mut app = App::new("7");
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        app.handle(AppEvent::Inbound(InboundEvent::system("Connected.", at)));
        app.handle(AppEvent::Inbound(InboundEvent::error("boom")));

        assert_eq!(app.log(), &[
            LogEntry::System { text: "Connected.".into(), at },
            LogEntry::Error { text: "boom".into() },
        ]);
    }

    #[test]
    fn reply_bar_mirrors_client() {
        let mut app = open_app();
        let draft = ReplyDraft::new(MessageId::from(1), "bob", "hi");

        app.handle(AppEvent::ReplyDraftChanged(Some(draft.clone())));
        assert_eq!(app.reply_draft(), Some(&draft));

        app.handle(AppEvent::ReplyDraftChanged(None));
        assert_eq!(app.reply_draft(), None);
    }
}
