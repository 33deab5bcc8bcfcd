//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: Widget state machine
//! - [`ChatClient`]: Connection and protocol state machine
//! - [`Driver`]: Platform-specific I/O
//!
//! All work goes through one FIFO queue, so actions run in the order the
//! state machines produced them.

use std::collections::VecDeque;

use chatline_client::{ChatClient, ClientAction, ClientConfig, ClientEvent, TransportEvent};
use chatline_core::Environment;
use tracing::{debug, warn};

use crate::{App, AppAction, AppEvent, Driver, DriverInput};

/// One unit of pending work.
enum Work<I> {
    /// Action from the App.
    App(AppAction),
    /// Event for the client.
    Client(ClientEvent<I>),
    /// Action from the client.
    Effect(ClientAction),
}

/// Generic runtime that orchestrates App, ChatClient, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment providing time
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    env: E,
    app: App,
    client: ChatClient<E>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Create a new runtime for the logged-in `user_id`.
    pub fn new(driver: D, env: E, config: ClientConfig, user_id: impl Into<String>) -> Self {
        let app = App::new(user_id);
        let client = ChatClient::new(env.clone(), config);
        Self { driver, env, app, client }
    }

    /// Run the main event loop.
    ///
    /// Renders, makes the first connection attempt, then processes driver
    /// input until the driver shuts down or the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render.
    pub async fn run(mut self) -> Result<(), D::Error> {
        if !self.start().await? {
            loop {
                let input = self.driver.poll_input().await?;
                if self.handle_input(input).await? {
                    break;
                }
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Render the initial state and connect.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to render.
    pub async fn start(&mut self) -> Result<bool, D::Error> {
        self.driver.render(&self.app)?;
        self.process(VecDeque::from([Work::App(AppAction::Connect)])).await
    }

    /// Process one input from the driver.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to render.
    pub async fn handle_input(&mut self, input: DriverInput) -> Result<bool, D::Error> {
        match input {
            DriverInput::App(event) => {
                let actions = self.app.handle(event);
                self.process(actions.into_iter().map(Work::App).collect()).await
            },
            DriverInput::Transport { conn, event } => {
                let event = ClientEvent::Transport { conn, event };
                self.process(VecDeque::from([Work::Client(event)])).await
            },
            DriverInput::Tick => {
                let now = self.env.now();
                self.process(VecDeque::from([Work::Client(ClientEvent::Tick { now })])).await
            },
            DriverInput::Shutdown => Ok(true),
        }
    }

    /// Drain the work queue.
    ///
    /// Returns `true` if should quit.
    async fn process(&mut self, mut queue: VecDeque<Work<E::Instant>>) -> Result<bool, D::Error> {
        while let Some(work) = queue.pop_front() {
            match work {
                Work::App(action) => {
                    let event = match action {
                        AppAction::Render => {
                            self.driver.render(&self.app)?;
                            continue;
                        },
                        AppAction::Quit => return Ok(true),
                        AppAction::Connect => ClientEvent::Connect,
                        AppAction::Close => ClientEvent::Close,
                        AppAction::Send { text } => ClientEvent::Send { text, reply_to: None },
                        AppAction::SetReplyDraft(draft) => ClientEvent::SetReplyDraft(draft),
                        AppAction::ClearReplyDraft => ClientEvent::ClearReplyDraft,
                    };
                    queue.push_back(Work::Client(event));
                },
                Work::Client(event) => {
                    queue.extend(self.client.handle(event).into_iter().map(Work::Effect));
                },
                Work::Effect(action) => match self.execute(action).await {
                    Outcome::Done => {},
                    Outcome::Client(event) => queue.push_back(Work::Client(event)),
                    Outcome::App(event) => {
                        queue.extend(self.app.handle(event).into_iter().map(Work::App));
                    },
                },
            }
        }
        Ok(false)
    }

    /// Execute one client action.
    async fn execute(&mut self, action: ClientAction) -> Outcome<E::Instant> {
        match action {
            ClientAction::OpenTransport { conn, url } => {
                debug!(%conn, %url, "opening transport");
                match self.driver.open(conn, &url).await {
                    Ok(()) => Outcome::Done,
                    Err(e) => {
                        warn!(%conn, error = %e, "failed to open transport");
                        let event = TransportEvent::ConnectFailed { reason: e.to_string() };
                        Outcome::Client(ClientEvent::Transport { conn, event })
                    },
                }
            },
            ClientAction::CloseTransport { conn, code, reason } => {
                if let Err(e) = self.driver.close(conn, code, &reason).await {
                    warn!(%conn, error = %e, "failed to close transport");
                }
                Outcome::Done
            },
            ClientAction::SendFrame { conn, frame } => match self.driver.send(conn, frame).await {
                Ok(()) => Outcome::Done,
                Err(e) => {
                    warn!(%conn, error = %e, "failed to send frame");
                    let event = TransportEvent::SendFailed { reason: e.to_string() };
                    Outcome::Client(ClientEvent::Transport { conn, event })
                },
            },
            ClientAction::Deliver(event) => Outcome::App(AppEvent::Inbound(event)),
            ClientAction::StateChanged(state) => Outcome::App(AppEvent::ConnectionChanged(state)),
            ClientAction::ReplyDraftChanged(draft) => {
                Outcome::App(AppEvent::ReplyDraftChanged(draft))
            },
        }
    }

    /// Widget state.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Client state.
    pub fn client(&self) -> &ChatClient<E> {
        &self.client
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutable access to the driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

/// Result of executing a client action.
enum Outcome<I> {
    /// Nothing further to do.
    Done,
    /// The action failed; feed this back into the client.
    Client(ClientEvent<I>),
    /// Notify the App.
    App(AppEvent),
}
