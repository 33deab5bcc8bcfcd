//! WebSocket transport for the client.
//!
//! [`open`] spawns one task per transport instance. The task connects with
//! `tokio-tungstenite`, reports everything that happens to the socket as
//! [`TransportEvent`]s tagged with the instance's [`ConnectionId`], and
//! executes commands sent through the returned [`TransportHandle`]. Protocol
//! logic stays in the Sans-IO [`crate::ChatClient`].

use chatline_core::ConnectionId;
use chatline_proto::CloseCode;
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{
    Message,
    protocol::{CloseFrame, frame::coding::CloseCode as WsCloseCode},
};
use tracing::{debug, trace, warn};

use crate::event::TransportEvent;

/// Sender half for transport events, shared by every instance.
pub type EventSender = mpsc::UnboundedSender<(ConnectionId, TransportEvent)>;

/// Receiver half for transport events.
pub type EventReceiver = mpsc::UnboundedReceiver<(ConnectionId, TransportEvent)>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket handshake failed.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Reading or writing the socket failed.
    #[error("stream error: {0}")]
    Stream(String),

    /// The transport task has already finished.
    #[error("transport stopped")]
    Stopped,
}

#[derive(Debug)]
enum Command {
    Send(String),
    Close { code: CloseCode, reason: String },
}

/// Handle to one transport instance.
///
/// Dropping the handle closes the socket with 1001 (going away).
#[derive(Debug)]
pub struct TransportHandle {
    conn: ConnectionId,
    commands: mpsc::UnboundedSender<Command>,
    abort_handle: tokio::task::AbortHandle,
}

impl TransportHandle {
    /// Instance this handle controls.
    pub fn conn(&self) -> ConnectionId {
        self.conn
    }

    /// Queue a text frame.
    ///
    /// Write failures are reported asynchronously as
    /// [`TransportEvent::SendFailed`].
    pub fn send(&self, frame: String) -> Result<(), TransportError> {
        self.commands.send(Command::Send(frame)).map_err(|_| TransportError::Stopped)
    }

    /// Start the close handshake. [`TransportEvent::Closed`] follows.
    pub fn close(&self, code: CloseCode, reason: impl Into<String>) -> Result<(), TransportError> {
        self.commands
            .send(Command::Close { code, reason: reason.into() })
            .map_err(|_| TransportError::Stopped)
    }

    /// Stop the transport task immediately. No further events are reported.
    pub fn abort(&self) {
        self.abort_handle.abort();
    }

    /// Whether the transport task has finished.
    pub fn is_finished(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Open a WebSocket to `url` as transport instance `conn`.
///
/// Returns immediately; completion is reported as [`TransportEvent::Opened`]
/// or [`TransportEvent::ConnectFailed`]. Must be called within a tokio
/// runtime.
pub fn open(conn: ConnectionId, url: String, events: EventSender) -> TransportHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_transport(conn, url, commands_rx, events));

    TransportHandle { conn, commands: commands_tx, abort_handle: task.abort_handle() }
}

async fn run_transport(
    conn: ConnectionId,
    url: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: EventSender,
) {
    let emit = |event: TransportEvent| {
        // Receiver gone means the runtime is shutting down.
        let _ = events.send((conn, event));
    };

    let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            let err = TransportError::Connect(e.to_string());
            debug!(%conn, %url, error = %err, "handshake failed");
            emit(TransportEvent::ConnectFailed { reason: err.to_string() });
            return;
        },
    };

    debug!(%conn, %url, "websocket open");
    emit(TransportEvent::Opened);

    let (mut sink, mut stream) = stream.split();
    let mut commands_open = true;

    loop {
        tokio::select! {
            command = commands.recv(), if commands_open => match command {
                Some(Command::Send(frame)) => {
                    trace!(%conn, len = frame.len(), "writing frame");
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        let err = TransportError::Stream(e.to_string());
                        emit(TransportEvent::SendFailed { reason: err.to_string() });
                    }
                },
                Some(Command::Close { code, reason }) => {
                    debug!(%conn, %code, "sending close");
                    let frame = CloseFrame { code: WsCloseCode::from(code.as_u16()), reason: reason.into() };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        warn!(%conn, error = %e, "close handshake failed");
                        emit(TransportEvent::Closed { code: CloseCode::ABNORMAL, reason: e.to_string() });
                        return;
                    }
                },
                None => {
                    commands_open = false;
                    let frame = CloseFrame { code: WsCloseCode::Away, reason: "".into() };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                },
            },

            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => emit(TransportEvent::Frame(text)),
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (CloseCode(f.code.into()), f.reason.to_string()))
                        .unwrap_or((CloseCode::NO_STATUS, String::new()));
                    debug!(%conn, %code, %reason, "peer closed");
                    // Flushes the queued close reply.
                    let _ = sink.close().await;
                    emit(TransportEvent::Closed { code, reason });
                    return;
                },
                Some(Ok(Message::Binary(data))) => {
                    warn!(%conn, len = data.len(), "ignoring binary frame");
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    let err = TransportError::Stream(e.to_string());
                    emit(TransportEvent::Errored { reason: err.to_string() });
                    emit(TransportEvent::Closed { code: CloseCode::ABNORMAL, reason: err.to_string() });
                    return;
                },
                None => {
                    debug!(%conn, "stream ended without close frame");
                    emit(TransportEvent::Closed { code: CloseCode::ABNORMAL, reason: String::new() });
                    return;
                },
            },
        }
    }
}
