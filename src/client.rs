// MIT License - Copyright (c) 2026 Peter Wright
// Connection lifecycle and reconnecting worker

//! Connection lifecycle and the background worker.
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingLoginPrompt -> [LoggingIn] -> Subscribing -> Streaming
//!       ^                                                                            |
//!       +--------------- error / peer closed / write failed, after poll_interval ---+
//! ```
//!
//! `stop()` moves any state to `Closing` and then `Closed`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::codec::FrameCodec;
use crate::config::ClientConfig;
use crate::error::{HomeworksError, Result};
use crate::event::{EventHandler, HomeworksEvent};
use crate::login::{self, Prompt};
use crate::protocol::{Command, SUBSCRIPTIONS};
use crate::transport::{CommandSender, TcpTransport};

/// Where the client is in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingLoginPrompt,
    LoggingIn,
    Subscribing,
    Streaming,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingLoginPrompt => "awaiting_login_prompt",
            Self::LoggingIn => "logging_in",
            Self::Subscribing => "subscribing",
            Self::Streaming => "streaming",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A connected, logged in and subscribed session, not yet streaming.
struct Session {
    transport: TcpTransport,
    codec: FrameCodec,
    /// Bytes read during login that belong to the event stream
    backlog: Vec<u8>,
}

/// Why streaming from a session ended.
enum StreamEnd {
    Shutdown,
    Lost,
}

/// State shared between the client handle and its worker.
struct Shared {
    config: ClientConfig,
    handler: Box<dyn EventHandler>,
    sender: CommandSender,
    state_tx: watch::Sender<ConnectionState>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Connection state: {} -> {}", previous, state);
        }
    }

    /// Connect, log in if asked to, and subscribe to monitoring.
    async fn establish(&self) -> Result<Session> {
        self.set_state(ConnectionState::Connecting);
        let mut transport = TcpTransport::connect(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout,
        )
        .await?;

        match self.set_up(&mut transport).await {
            Ok(backlog) => {
                info!("Connected to controller at {}", transport.addr());
                Ok(Session {
                    transport,
                    codec: FrameCodec::new(),
                    backlog,
                })
            }
            Err(e) => {
                transport.close().await;
                Err(e)
            }
        }
    }

    async fn set_up(&self, transport: &mut TcpTransport) -> Result<Vec<u8>> {
        self.set_state(ConnectionState::AwaitingLoginPrompt);
        let backlog = match login::read_prompt(transport, self.config.login_timeout).await? {
            Prompt::None { backlog } => backlog,
            Prompt::Login => {
                self.set_state(ConnectionState::LoggingIn);
                login::log_in(
                    transport,
                    self.config.credentials.as_ref(),
                    self.config.login_timeout,
                )
                .await?
            }
        };

        self.set_state(ConnectionState::Subscribing);
        for command in SUBSCRIPTIONS.iter() {
            transport.send(command).await?;
        }

        let writer = transport.take_writer().ok_or(HomeworksError::NotConnected)?;
        self.sender.attach(writer).await;
        Ok(backlog)
    }

    /// Read and dispatch events until the connection drops or shutdown is
    /// requested.
    async fn stream(
        &self,
        mut session: Session,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> StreamEnd {
        self.set_state(ConnectionState::Streaming);
        let backlog = std::mem::take(&mut session.backlog);
        self.dispatch(session.codec.feed(&backlog));

        loop {
            tokio::select! {
                _ = shutdown_requested(shutdown_rx) => {
                    session.transport.close().await;
                    return StreamEnd::Shutdown;
                }
                _ = self.sender.failed() => {
                    warn!("Command write failed, dropping connection to controller");
                    session.transport.close().await;
                    self.sender.detach().await;
                    return StreamEnd::Lost;
                }
                read = session.transport.read_available(self.config.poll_interval) => match read {
                    Ok(chunk) => {
                        if !chunk.is_empty() {
                            self.dispatch(session.codec.feed(&chunk));
                        }
                    }
                    Err(e) => {
                        warn!("Lost connection to controller: {}", e);
                        session.transport.close().await;
                        self.sender.detach().await;
                        return StreamEnd::Lost;
                    }
                },
            }
        }
    }

    fn dispatch(&self, events: Vec<HomeworksEvent>) {
        for event in events {
            debug!("Event: {} {} {:?}", event.name(), event.address, event.values);
            self.handler.on_event(event);
        }
    }
}

/// Resolves once shutdown has been requested, or the client handle is gone.
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Sleep for `delay` unless shutdown comes first. Returns false on shutdown.
async fn backoff(delay: tokio::time::Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = sleep(delay) => true,
        _ = shutdown_requested(shutdown_rx) => false,
    }
}

/// Background loop: keep a session streaming, reconnecting as needed.
async fn run_worker(
    shared: Arc<Shared>,
    mut session: Option<Session>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!("Worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let current = match session.take() {
            Some(current) => current,
            None => {
                let attempt = tokio::select! {
                    attempt = shared.establish() => attempt,
                    _ = shutdown_requested(&mut shutdown_rx) => break,
                };
                match attempt {
                    Ok(current) => current,
                    Err(e) if !e.is_retryable() => {
                        error!("Giving up on controller at {}: {}", shared.config.address(), e);
                        shared.sender.mark_stopped();
                        break;
                    }
                    Err(e) => {
                        if matches!(e, HomeworksError::InvalidCredentialsProvided) {
                            shared.handler.on_event(HomeworksEvent::login_incorrect());
                        } else {
                            warn!("Connection attempt failed: {}", e);
                        }
                        shared.set_state(ConnectionState::Disconnected);
                        if !backoff(shared.config.poll_interval, &mut shutdown_rx).await {
                            break;
                        }
                        continue;
                    }
                }
            }
        };

        match shared.stream(current, &mut shutdown_rx).await {
            StreamEnd::Shutdown => break,
            StreamEnd::Lost => {
                shared.set_state(ConnectionState::Disconnected);
                if !backoff(shared.config.poll_interval, &mut shutdown_rx).await {
                    break;
                }
            }
        }
    }

    shared.sender.detach().await;
    shared.set_state(ConnectionState::Closed);
    debug!("Worker finished");
}

/// Client for a Lutron Homeworks Series 4/8 controller.
///
/// Events are delivered to the handler from a background task. Commands may
/// be sent from any task; they fail with [`HomeworksError::NotConnected`]
/// while the worker is between connections.
///
/// ```no_run
/// use homeworks::{ClientConfig, HomeworksClient, HomeworksEvent};
///
/// # async fn run() -> homeworks::Result<()> {
/// let config = ClientConfig::builder()
///     .host("192.168.1.50")
///     .credentials("lutron,integration")
///     .build();
///
/// let client = HomeworksClient::open(config, |event: HomeworksEvent| {
///     println!("{} {} {:?}", event.name(), event.address, event.values);
/// })
/// .await?;
///
/// client.fade_level(50.0, 2.0, 0.0, "[01:01:00:02:04]").await?;
/// client.stop().await?;
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct HomeworksClient {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    /// Session set up by `connect()`, handed to the worker by `start()`
    pending: Mutex<Option<Session>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl HomeworksClient {
    /// Create a client. Nothing happens on the network until
    /// [`connect`](Self::connect) or [`start`](Self::start).
    pub fn new<H: EventHandler>(config: ClientConfig, handler: H) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let sender = CommandSender::new(config.write_timeout);

        Self {
            shared: Arc::new(Shared {
                config,
                handler: Box::new(handler),
                sender,
                state_tx,
            }),
            shutdown_tx,
            pending: Mutex::new(None),
            worker: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Create, connect and start a client.
    pub async fn open<H: EventHandler>(config: ClientConfig, handler: H) -> Result<Self> {
        let client = Self::new(config, handler);
        client.connect().await?;
        client.start().await?;
        Ok(client)
    }

    /// Connect, log in and subscribe, reporting failures to the caller.
    ///
    /// Optional: a started client without a session connects on its own.
    pub async fn connect(&self) -> Result<()> {
        if self.shared.sender.is_stopped() {
            return Err(HomeworksError::Stopped);
        }
        if self.started.load(Ordering::SeqCst) {
            return Err(HomeworksError::AlreadyStarted);
        }

        match self.shared.establish().await {
            Ok(session) => {
                *self.pending.lock().await = Some(session);
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    /// Spawn the background worker.
    pub async fn start(&self) -> Result<()> {
        if self.shared.sender.is_stopped() {
            return Err(HomeworksError::Stopped);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(HomeworksError::AlreadyStarted);
        }

        let session = self.pending.lock().await.take();
        let handle = tokio::spawn(run_worker(
            self.shared.clone(),
            session,
            self.shutdown_tx.subscribe(),
        ));
        *self.worker.lock().await = Some(handle);
        info!("Client started for {}", self.shared.config.address());
        Ok(())
    }

    /// Fade a dimmer to `intensity` percent over `fade_time` seconds, after
    /// `delay_time` seconds.
    pub async fn fade_level(
        &self,
        intensity: f64,
        fade_time: f64,
        delay_time: f64,
        address: &str,
    ) -> Result<()> {
        self.send(&Command::FadeDim {
            intensity,
            fade_time,
            delay_time,
            address: address.to_string(),
        })
        .await
    }

    /// Ask the controller for a dimmer level. The answer arrives as a
    /// `light_changed` event.
    pub async fn request_level(&self, address: &str) -> Result<()> {
        self.send(&Command::RequestDimmerLevel {
            address: address.to_string(),
        })
        .await
    }

    /// Send an arbitrary command line.
    pub async fn send_raw(&self, line: &str) -> Result<()> {
        self.send(&Command::Raw(line.to_string())).await
    }

    /// Send a command on the live session.
    ///
    /// Fails with [`HomeworksError::NotConnected`] between connections and
    /// [`HomeworksError::Stopped`] once the client is stopped. A failed write
    /// makes the worker drop the session and reconnect.
    pub async fn send(&self, command: &Command) -> Result<()> {
        self.shared.sender.send(command).await
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Whether a session is live and accepting commands.
    pub async fn is_connected(&self) -> bool {
        self.shared.sender.is_connected().await
    }

    /// Whether the worker is running.
    pub async fn is_running(&self) -> bool {
        self.worker
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the worker and wait for it to finish. Safe to call repeatedly.
    ///
    /// Sends fail with [`HomeworksError::Stopped`] from here on.
    pub async fn stop(&self) -> Result<()> {
        if !self.shared.sender.is_stopped() {
            info!("Stopping client");
        }
        self.shared.sender.mark_stopped();
        self.shutdown_tx.send_replace(true);
        if self.state() != ConnectionState::Closed {
            self.shared.set_state(ConnectionState::Closing);
        }

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Worker ended abnormally: {}", e);
            }
        }

        if let Some(mut session) = self.pending.lock().await.take() {
            session.transport.close().await;
        }
        self.shared.sender.detach().await;
        self.shared.set_state(ConnectionState::Closed);
        Ok(())
    }

    /// Release the connection.
    ///
    /// A started client must be stopped first. Safe to call repeatedly.
    pub async fn close(&self) -> Result<()> {
        if self.started.load(Ordering::SeqCst) && !self.shared.sender.is_stopped() {
            return Err(HomeworksError::StillRunning);
        }

        if let Some(mut session) = self.pending.lock().await.take() {
            session.transport.close().await;
        }
        self.shared.sender.detach().await;
        self.shared.set_state(ConnectionState::Closed);
        Ok(())
    }
}

impl Drop for HomeworksClient {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(handle) = self.worker.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn config_for(port: u16) -> ClientConfig {
        ClientConfig::builder()
            .host("127.0.0.1")
            .port(port)
            .poll_interval(Duration::from_millis(20))
            .login_timeout(Duration::from_millis(50))
            .build()
    }

    async fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn test_state_names() {
        assert_eq!(ConnectionState::AwaitingLoginPrompt.to_string(), "awaiting_login_prompt");
        assert_eq!(ConnectionState::Streaming.to_string(), "streaming");
    }

    #[tokio::test]
    async fn test_new_client_is_idle() {
        let client = HomeworksClient::new(config_for(4008), |_event: HomeworksEvent| {});
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_running().await);
        assert!(!client.is_connected().await);
        assert!(matches!(
            client.fade_level(50.0, 1.0, 0.0, "B2").await,
            Err(HomeworksError::NotConnected)
        ));
        client.close().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let port = unused_port().await;
        let client = HomeworksClient::new(config_for(port), |_event: HomeworksEvent| {});
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, HomeworksError::ConnectionFailed { .. }));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_lifecycle_errors() {
        let port = unused_port().await;
        let client = HomeworksClient::new(config_for(port), |_event: HomeworksEvent| {});

        client.start().await.unwrap();
        assert!(matches!(
            client.start().await,
            Err(HomeworksError::AlreadyStarted)
        ));
        assert!(matches!(
            client.connect().await,
            Err(HomeworksError::AlreadyStarted)
        ));
        assert!(matches!(
            client.close().await,
            Err(HomeworksError::StillRunning)
        ));

        client.stop().await.unwrap();
        client.stop().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(!client.is_running().await);
        assert!(matches!(
            client.request_level("B2").await,
            Err(HomeworksError::Stopped)
        ));
        assert!(matches!(client.start().await, Err(HomeworksError::Stopped)));
        client.close().await.unwrap();
        client.close().await.unwrap();
    }
}
