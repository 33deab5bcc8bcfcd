//! Chatline terminal client entry point.
//!
//! # Usage
//!
//! ```bash
//! # Chat on https://chat.example.com as user 42
//! chatline --origin https://chat.example.com --user-id 42
//!
//! # Custom endpoint path and a tighter retry budget
//! chatline --origin http://localhost:8000 --path /ws/lobby/ --user-id 42 --max-retries 2
//! ```

use std::time::Duration;

use chatline_app::Runtime;
use chatline_cli::TerminalDriver;
use chatline_client::{ClientConfig, Endpoint, ReconnectPolicy, SystemEnv};
use chatline_core::endpoint::DEFAULT_PATH;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Chatline terminal client
#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(about = "Terminal client for a WebSocket chat endpoint")]
#[command(version)]
struct Args {
    /// Page origin the endpoint is derived from (http, https, ws or wss)
    #[arg(short, long)]
    origin: String,

    /// Endpoint path on the origin
    #[arg(short, long, default_value = DEFAULT_PATH)]
    path: String,

    /// Id of the logged-in user. Without it the chat stays disabled.
    #[arg(short, long)]
    user_id: Option<String>,

    /// Reconnect attempts after an abnormal close
    #[arg(long, default_value = "5")]
    max_retries: u32,

    /// Seconds between reconnect attempts
    #[arg(long, default_value = "5")]
    retry_delay_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let Some(user_id) = args.user_id else {
        tracing::info!("No user id given; chat disabled");
        return Ok(());
    };

    let endpoint = Endpoint::from_origin(&args.origin, &args.path)?;
    let policy = ReconnectPolicy {
        max_attempts: args.max_retries,
        delay: Duration::from_secs(args.retry_delay_secs),
    };
    tracing::info!(%endpoint, ?policy, %user_id, "chatline starting");

    let config = ClientConfig::new(endpoint).with_policy(policy);
    let env = SystemEnv::new();
    let runtime = Runtime::new(TerminalDriver::with_env(env), env, config, user_id);

    Ok(runtime.run().await?)
}
