// MIT License - Copyright (c) 2026 Peter Wright
// Command line front end for the Homeworks client

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use homeworks::{ClientConfig, EventKind, FieldValue, HomeworksClient, HomeworksEvent};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "homeworks")]
#[command(about = "Monitor and control a Lutron Homeworks Series 4/8 controller")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "homeworks.toml")]
    config: String,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Print every controller event as a JSON line until interrupted
    Monitor,
    /// Fade a dimmer to a level
    Fade {
        /// Dimmer address, e.g. [01:01:00:02:04]
        address: String,
        /// Target level, 0-100
        intensity: f64,
        /// Fade duration in seconds
        #[arg(long, default_value_t = 0.0)]
        fade_time: f64,
        /// Delay before the fade starts, in seconds
        #[arg(long, default_value_t = 0.0)]
        delay_time: f64,
    },
    /// Ask a dimmer for its level and print the reply
    RequestLevel {
        address: String,
        /// How long to wait for the reply, in milliseconds
        #[arg(long, default_value_t = 2000)]
        wait_ms: u64,
    },
    /// Send one command line verbatim
    Raw { line: String },
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    controller: ControllerToml,
}

#[derive(Debug, Deserialize)]
struct ControllerToml {
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    /// Login string (e.g. "user,password"), if the controller asks for one
    #[serde(default)]
    credentials: Option<String>,
    #[serde(default = "default_poll_interval")]
    poll_interval_ms: u64,
    #[serde(default = "default_connect_timeout")]
    connect_timeout_ms: u64,
    #[serde(default = "default_login_timeout")]
    login_timeout_ms: u64,
    #[serde(default = "default_write_timeout")]
    write_timeout_ms: u64,
}

fn default_port() -> u16 {
    4008
}
fn default_poll_interval() -> u64 {
    1000
}
fn default_connect_timeout() -> u64 {
    10_000
}
fn default_login_timeout() -> u64 {
    2000
}
fn default_write_timeout() -> u64 {
    1000
}

fn build_client_config(toml: &ControllerToml) -> ClientConfig {
    let mut builder = ClientConfig::builder()
        .host(&toml.host)
        .port(toml.port)
        .poll_interval(Duration::from_millis(toml.poll_interval_ms))
        .connect_timeout(Duration::from_millis(toml.connect_timeout_ms))
        .login_timeout(Duration::from_millis(toml.login_timeout_ms))
        .write_timeout(Duration::from_millis(toml.write_timeout_ms));
    if let Some(credentials) = &toml.credentials {
        builder = builder.credentials(credentials.as_str());
    }
    builder.build()
}

fn load_config(path: &str) -> Result<ClientConfig> {
    let config_text = std::fs::read_to_string(path).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;
    Ok(build_client_config(&config.controller))
}

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

// One line per event: {now, event, address, values}

#[derive(Serialize)]
struct EventLine<'a> {
    now: u64,
    event: &'static str,
    address: &'a str,
    values: Vec<Value>,
}

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

fn field_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Integer(v) => Value::from(*v),
        FieldValue::Flag(v) => Value::from(*v),
        FieldValue::LedStates(states) => Value::from(states.clone()),
    }
}

fn event_json(event: &HomeworksEvent) -> Result<String> {
    let line = EventLine {
        now: now_epoch_ms(),
        event: event.name(),
        address: &event.address,
        values: event.values.iter().map(field_json).collect(),
    };
    serde_json::to_string(&line).context("Failed to serialize event")
}

fn print_event(event: &HomeworksEvent) {
    match event_json(event) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("{e:#}"),
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn run_monitor(config: ClientConfig) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;

    let client = HomeworksClient::open(config, |event: HomeworksEvent| print_event(&event))
        .await
        .context("Failed to connect to controller")?;

    info!("Monitoring. Send SIGINT/SIGTERM to stop.");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down..."),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
    }

    client.stop().await?;
    client.close().await?;
    Ok(())
}

async fn run_once(config: ClientConfig, command: CliCommand) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = HomeworksClient::open(config, move |event: HomeworksEvent| {
        let _ = tx.send(event);
    })
    .await
    .context("Failed to connect to controller")?;

    let result = match command {
        CliCommand::Fade {
            address,
            intensity,
            fade_time,
            delay_time,
        } => client
            .fade_level(intensity, fade_time, delay_time, &address)
            .await
            .context("Failed to send FADEDIM"),
        CliCommand::RequestLevel { address, wait_ms } => {
            match client.request_level(&address).await.context("Failed to send RDL") {
                Ok(()) => wait_for_level(&mut rx, &address, Duration::from_millis(wait_ms)).await,
                Err(e) => Err(e),
            }
        }
        CliCommand::Raw { line } => client.send_raw(&line).await.context("Failed to send command"),
        CliCommand::Monitor => Ok(()),
    };

    client.stop().await?;
    client.close().await?;
    result
}

async fn wait_for_level(
    rx: &mut mpsc::UnboundedReceiver<HomeworksEvent>,
    address: &str,
    wait: Duration,
) -> Result<()> {
    let reply = timeout(wait, async {
        while let Some(event) = rx.recv().await {
            if event.kind == EventKind::LightChanged && event.address == address {
                return Some(event);
            }
        }
        None
    })
    .await;

    match reply {
        Ok(Some(event)) => {
            println!("{}", event_json(&event)?);
            Ok(())
        }
        Ok(None) => anyhow::bail!("Client stopped before {address} replied"),
        Err(_) => anyhow::bail!("No level reported for {address} within {wait:?}"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=homeworks=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt()
            .without_time()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        CliCommand::Monitor => run_monitor(config).await,
        command => run_once(config, command).await,
    }
}
