//! Input line parsing.
//!
//! Lines starting with `/` are commands; everything else is a message. A
//! leading `//` sends a message that starts with a slash.

use chatline_app::AppEvent;
use thiserror::Error;

/// Help text listing every command.
pub const HELP: &str = "\
commands:
  /reply <id>   reply to a message
  /cancel       cancel the reply
  /show         mark the chat as visible
  /hide         mark the chat as hidden
  /connect      reconnect now
  /close        disconnect
  /quit         exit
  //text        send a message starting with '/'";

/// Input that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Unknown command name.
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),

    /// Command needs an argument.
    #[error("/{command} needs {argument}")]
    MissingArgument {
        /// Command name.
        command: &'static str,
        /// What is missing.
        argument: &'static str,
    },

    /// The user asked for help.
    #[error("{}", HELP)]
    Help,
}

/// Turn one input line into an event.
pub fn parse_line(line: &str) -> Result<AppEvent, CommandError> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(AppEvent::Submit(line.to_string()));
    };
    if rest.starts_with('/') {
        return Ok(AppEvent::Submit(rest.to_string()));
    }

    let mut parts = rest.trim().splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match name {
        "reply" => arg
            .map(|id| AppEvent::ReplyTo(id.to_string()))
            .ok_or(CommandError::MissingArgument { command: "reply", argument: "a message id" }),
        "cancel" => Ok(AppEvent::CancelReply),
        "show" => Ok(AppEvent::Shown),
        "hide" => Ok(AppEvent::Hidden),
        "connect" => Ok(AppEvent::Reconnect),
        "close" => Ok(AppEvent::Disconnect),
        "quit" | "exit" => Ok(AppEvent::Quit),
        "help" => Err(CommandError::Help),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
