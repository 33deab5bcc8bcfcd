//! User-facing notice text.

use std::time::Duration;

pub(crate) fn connecting(attempt: u32) -> String {
    format!("Connecting to chat... (attempt {attempt})")
}

pub(crate) const CONNECTED: &str = "Connected.";

pub(crate) const CLOSED: &str = "Connection closed.";

pub(crate) const RETRY_CANCELLED: &str = "Reconnect cancelled.";

pub(crate) fn reconnecting(attempt: u32, max_attempts: u32, delay: Duration) -> String {
    format!(
        "Connection lost. Reconnecting in {}s (attempt {attempt} of {max_attempts})...",
        delay.as_secs()
    )
}

pub(crate) const RECONNECT_EXHAUSTED: &str =
    "Unable to reconnect to chat. Please reload the page to retry.";

pub(crate) fn transport_error(reason: &str) -> String {
    format!("Connection error: {reason}")
}

pub(crate) fn connect_failed(reason: &str) -> String {
    format!("Could not connect: {reason}")
}

pub(crate) fn send_failed(reason: &str) -> String {
    format!("Failed to send message: {reason}")
}
