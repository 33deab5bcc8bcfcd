//! Simulated widget.
//!
//! [`Simulation`] wires a [`Runtime`] to a [`SimDriver`] and [`SimEnv`],
//! translates [`Operation`]s into driver inputs and checks the standard
//! invariants after every step.

use std::time::Duration;

use chatline_app::{AppEvent, DriverInput, Runtime};
use chatline_client::{
    ClientConfig, CloseCode, ConnectionId, Endpoint, ReconnectPolicy, TransportEvent,
};
use chatline_core::{ConnectionError, endpoint::DEFAULT_PATH};
use tracing::trace;

use crate::{
    InvariantRegistry, Operation, SimDriver, SimDriverError, SimEnv, SystemSnapshot, Violation,
    operation::{history_frame, system_frame, user_frame},
};

/// Origin every simulated widget connects to.
pub const ORIGIN: &str = "https://chat.example.com";

/// Id of the simulated logged-in user.
pub const LOCAL_USER: &str = "7";

/// One simulated widget.
pub struct Simulation {
    runtime: Runtime<SimDriver, SimEnv>,
    driver: SimDriver,
    env: SimEnv,
    invariants: InvariantRegistry,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("env", &self.env)
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Create a widget for [`LOCAL_USER`] using `policy`. Nothing connects
    /// until [`Self::start`].
    pub fn new(policy: ReconnectPolicy) -> Result<Self, ConnectionError> {
        let endpoint = Endpoint::from_origin(ORIGIN, DEFAULT_PATH)?;
        let config = ClientConfig::new(endpoint).with_policy(policy);
        let driver = SimDriver::new();
        let env = SimEnv::default();
        let runtime = Runtime::new(driver.clone(), env.clone(), config, LOCAL_USER);

        Ok(Self { runtime, driver, env, invariants: InvariantRegistry::standard() })
    }

    /// Render and make the initial connection attempt.
    pub async fn start(&mut self) -> Result<bool, SimDriverError> {
        self.runtime.start().await
    }

    /// Process one input.
    ///
    /// Returns `true` if the widget quit.
    pub async fn step(&mut self, input: DriverInput) -> Result<bool, SimDriverError> {
        trace!(?input, "sim step");
        self.runtime.handle_input(input).await
    }

    /// Process every input queued on the driver.
    pub async fn drain(&mut self) -> Result<bool, SimDriverError> {
        while let Some(input) = self.driver.pop_input() {
            if self.step(input).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Apply one operation.
    pub async fn apply(&mut self, op: &Operation) -> Result<bool, SimDriverError> {
        let Some(input) = self.input_for(op) else {
            return Ok(false);
        };
        self.step(input).await
    }

    /// Apply one operation outside an async context.
    pub fn apply_blocking(&mut self, op: &Operation) -> Result<bool, SimDriverError> {
        futures::executor::block_on(self.apply(op))
    }

    /// Start outside an async context.
    pub fn start_blocking(&mut self) -> Result<bool, SimDriverError> {
        futures::executor::block_on(self.start())
    }

    fn input_for(&self, op: &Operation) -> Option<DriverInput> {
        let transport = |event| Some(DriverInput::Transport { conn: self.target(), event });
        let frame = |value: serde_json::Value| transport(TransportEvent::Frame(value.to_string()));

        match op {
            Operation::Submit(text) => Some(DriverInput::App(AppEvent::Submit(text.text()))),
            Operation::ReplyTo(id) => Some(DriverInput::App(AppEvent::ReplyTo(id.to_string()))),
            Operation::CancelReply => Some(DriverInput::App(AppEvent::CancelReply)),
            Operation::Show => Some(DriverInput::App(AppEvent::Shown)),
            Operation::Hide => Some(DriverInput::App(AppEvent::Hidden)),
            Operation::Reconnect => Some(DriverInput::App(AppEvent::Reconnect)),
            Operation::Disconnect => Some(DriverInput::App(AppEvent::Disconnect)),
            Operation::Opened => transport(TransportEvent::Opened),
            Operation::ConnectFailed => {
                transport(TransportEvent::ConnectFailed { reason: "refused".to_string() })
            },
            Operation::Errored => transport(TransportEvent::Errored { reason: "reset".to_string() }),
            Operation::Closed(kind) => {
                transport(TransportEvent::Closed { code: kind.code(), reason: String::new() })
            },
            Operation::SendFailed => {
                transport(TransportEvent::SendFailed { reason: "broken pipe".to_string() })
            },
            Operation::ChatFrame { message_id, user_id, text } => {
                frame(user_frame(*message_id, *user_id, &text.text()))
            },
            Operation::HistoryFrame { message_ids } => frame(history_frame(message_ids)),
            Operation::SystemFrame(text) => frame(system_frame(&text.text())),
            Operation::GarbageFrame(text) => transport(TransportEvent::Frame(text.text())),
            Operation::StaleClosed => {
                let stale = self.stale()?;
                Some(DriverInput::Transport {
                    conn: stale,
                    event: TransportEvent::Closed { code: CloseCode::ABNORMAL, reason: String::new() },
                })
            },
            Operation::Advance { secs } => {
                self.env.advance(Duration::from_secs(u64::from(*secs)));
                Some(DriverInput::Tick)
            },
        }
    }

    /// Current transport, or an id that was never issued.
    fn target(&self) -> ConnectionId {
        self.runtime.client().current_connection().unwrap_or(ConnectionId::from(0))
    }

    /// Some transport other than the current one.
    fn stale(&self) -> Option<ConnectionId> {
        let current = self.runtime.client().current_connection();
        self.driver.opened().into_iter().map(|(conn, _)| conn).find(|conn| Some(*conn) != current)
    }

    /// Observable state right now.
    pub fn snapshot(&self) -> SystemSnapshot {
        SystemSnapshot::capture(&self.runtime)
    }

    /// Run the standard invariants.
    pub fn check(&self) -> Result<(), Vec<Violation>> {
        self.invariants.check_all(&self.snapshot())
    }

    /// Run the standard invariants, panicking on violation.
    pub fn assert_invariants(&self, context: &str) {
        self.invariants.assert_all(&self.snapshot(), context);
    }

    /// The runtime under test.
    pub fn runtime(&self) -> &Runtime<SimDriver, SimEnv> {
        &self.runtime
    }

    /// Handle to the driver.
    pub fn driver(&self) -> &SimDriver {
        &self.driver
    }

    /// Handle to the virtual clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }
}
