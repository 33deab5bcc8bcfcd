//! Property-based tests for App state machine.
//!
//! Tests verify that invariants hold under arbitrary event sequences.

use std::collections::HashSet;

use chatline_app::{App, AppAction, AppEvent, LogEntry};
use chatline_client::{ConnectionState, InboundEvent, MessageId, UserId, UserMessage};
use chrono::{DateTime, Utc};
use proptest::prelude::*;

const LOCAL_USER: &str = "7";

fn at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_714_564_800, 0).unwrap()
}

fn message(id: i64, user: i64) -> UserMessage {
    UserMessage {
        message_id: MessageId::from(id),
        user_id: UserId::from(user),
        username: format!("user{user}"),
        text: format!("message {id}"),
        at: at(),
        user_title: None,
        reply_to: None,
    }
}

fn state_strategy() -> impl Strategy<Value = ConnectionState> {
    prop_oneof![
        Just(ConnectionState::Idle),
        Just(ConnectionState::Connecting),
        Just(ConnectionState::Open),
        Just(ConnectionState::Closing),
        Just(ConnectionState::Closed),
    ]
}

/// Generate random app events. Message ids and users come from small ranges
/// so duplicates and own messages show up.
fn event_strategy() -> impl Strategy<Value = AppEvent> {
    prop_oneof![
        2 => "[a-z ]{0,12}".prop_map(AppEvent::Submit),
        1 => (0i64..20).prop_map(|id| AppEvent::ReplyTo(id.to_string())),
        1 => Just(AppEvent::CancelReply),
        1 => Just(AppEvent::Shown),
        1 => Just(AppEvent::Hidden),
        1 => Just(AppEvent::Reconnect),
        1 => Just(AppEvent::Disconnect),
        2 => state_strategy().prop_map(AppEvent::ConnectionChanged),
        3 => (0i64..20, 5i64..10)
            .prop_map(|(id, user)| AppEvent::Inbound(InboundEvent::UserMessage(message(id, user)))),
        1 => prop::collection::vec((0i64..20, 5i64..10), 0..6).prop_map(|entries| {
            let messages = entries.into_iter().map(|(id, user)| message(id, user)).collect();
            AppEvent::Inbound(InboundEvent::MessageHistory { messages })
        }),
        1 => "[a-z]{1,8}".prop_map(|text| AppEvent::Inbound(InboundEvent::system(text, at()))),
    ]
}

fn chat_ids(app: &App) -> Vec<MessageId> {
    app.log().iter().filter_map(LogEntry::message).map(|m| m.message_id.clone()).collect()
}

proptest! {
    #[test]
    fn prop_input_enabled_iff_open(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut app = App::new(LOCAL_USER);
        for event in events {
            app.handle(event);
            prop_assert_eq!(app.input_enabled(), app.state() == ConnectionState::Open);
        }
    }

    #[test]
    fn prop_chat_messages_never_duplicated(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut app = App::new(LOCAL_USER);
        for event in events {
            app.handle(event);
        }

        let ids = chat_ids(&app);
        let unique: HashSet<_> = ids.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn prop_visible_widget_has_no_unread_marker(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut app = App::new(LOCAL_USER);
        for event in events {
            app.handle(event);
            if app.visible() {
                prop_assert!(!app.unread());
            }
        }
    }

    #[test]
    fn prop_send_only_when_open(events in prop::collection::vec(event_strategy(), 0..60)) {
        let mut app = App::new(LOCAL_USER);
        for event in events {
            let was_open = app.input_enabled();
            let actions = app.handle(event);
            if actions.iter().any(|a| matches!(a, AppAction::Send { .. })) {
                prop_assert!(was_open);
            }
        }
    }

    #[test]
    fn prop_send_text_is_never_blank(text in "[ \t\n]{0,6}[a-z]{0,3}[ \t\n]{0,6}") {
        let mut app = App::new(LOCAL_USER);
        app.handle(AppEvent::ConnectionChanged(ConnectionState::Open));

        let actions = app.handle(AppEvent::Submit(text.clone()));
        let sent = actions.iter().any(|a| matches!(a, AppAction::Send { .. }));
        prop_assert_eq!(sent, !text.trim().is_empty());
    }

    #[test]
    fn prop_shown_reconnects_only_when_disconnected(state in state_strategy()) {
        let mut app = App::new(LOCAL_USER);
        app.handle(AppEvent::ConnectionChanged(state));

        let actions = app.handle(AppEvent::Shown);
        let connects = actions.contains(&AppAction::Connect);
        prop_assert_eq!(connects, matches!(state, ConnectionState::Idle | ConnectionState::Closed));
    }
}
