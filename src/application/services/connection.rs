//! Device Connection Manager
//!
//! Owns the single link to the timing device. The manager runs as one task
//! whose `select!` loop holds every resource of the connection: the pending
//! connect attempt, the open transport, its heartbeat monitor and the
//! reconnect timer. Each of those is an `Option` field that is cleared
//! before it is replaced, which is what keeps at most one link alive and at
//! most one reconnect pending.
//!
//! Every way a link can end (remote close, read/write error, heartbeat
//! timeout, local close, failed connect) goes through
//! [`ConnectionManager::close_link`], the only place a reconnect is
//! scheduled.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Sleep};
use uuid::Uuid;

use super::heartbeat::{HeartbeatAction, HeartbeatMonitor};
use crate::config::{HeartbeatSettings, Settings};
use crate::domain::{decode_status, Command, DecodedStatus};
use crate::infrastructure::{Connector, Transport};
use crate::shared::backoff::ReconnectBackoff;
use crate::shared::error::{ClientError, TransportError};

/// Upper bound on a graceful close before the link is simply dropped.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Longest prefix of a rejected frame that is logged.
const LOGGED_FRAME_LIMIT: usize = 120;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        write!(f, "{s}")
    }
}

/// Why a link ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    ConnectFailed(String),
    ClosedByRemote,
    TransportError(String),
    HeartbeatTimeout,
    ClosedLocally,
    Shutdown,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectFailed(e) => write!(f, "connect failed: {e}"),
            Self::ClosedByRemote => write!(f, "closed by device"),
            Self::TransportError(e) => write!(f, "transport error: {e}"),
            Self::HeartbeatTimeout => write!(f, "heartbeat timeout"),
            Self::ClosedLocally => write!(f, "closed locally"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Events published to the single consumer of the manager.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected { connection_id: Uuid },
    Disconnected { reason: DisconnectReason },
    HeartbeatTimeout,
    Status(DecodedStatus),
    CommandDropped(Command),
}

#[derive(Debug)]
enum ManagerCommand {
    Start,
    Send(Command),
    Close,
    Shutdown,
}

/// Cloneable control surface of a running [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<ManagerCommand>,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionHandle {
    /// Begin connecting. No-op unless disconnected.
    pub fn start(&self) -> Result<(), ClientError> {
        self.submit(ManagerCommand::Start)
    }

    /// Send a command to the device.
    ///
    /// Commands issued while the link is not open are dropped and reported
    /// as [`ConnectionEvent::CommandDropped`]; this only fails once the
    /// manager has stopped.
    pub fn send_command(&self, command: Command) -> Result<(), ClientError> {
        self.submit(ManagerCommand::Send(command))
    }

    /// Send a `{field: value}` command.
    pub fn send_field(&self, field: &str, value: serde_json::Value) -> Result<(), ClientError> {
        self.send_command(Command::from_field(field, value)?)
    }

    /// Close the current link. The manager reconnects as after any other drop.
    pub fn close(&self) -> Result<(), ClientError> {
        self.submit(ManagerCommand::Close)
    }

    /// Stop the manager for good.
    pub fn shutdown(&self) {
        let _ = self.commands.send(ManagerCommand::Shutdown);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver for awaiting state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    fn submit(&self, command: ManagerCommand) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::ManagerStopped)
    }
}

pub struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    url: String,
    connect_timeout: Duration,
    write_timeout: Duration,
    heartbeat_settings: HeartbeatSettings,
    backoff: ReconnectBackoff,
    state: watch::Sender<ConnectionState>,
    commands: mpsc::UnboundedReceiver<ManagerCommand>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    pending_connect: Option<BoxFuture<'static, Result<C::Transport, TransportError>>>,
    transport: Option<C::Transport>,
    heartbeat: Option<HeartbeatMonitor>,
    reconnect: Option<Pin<Box<Sleep>>>,
    connection_id: Option<Uuid>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager, its handle and the receiver of its events.
    ///
    /// The receiver is the sole consumer of inbound status frames.
    pub fn new(
        connector: C,
        settings: &Settings,
    ) -> (
        Self,
        ConnectionHandle,
        mpsc::UnboundedReceiver<ConnectionEvent>,
    ) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let manager = Self {
            connector: Arc::new(connector),
            url: settings.device.url.clone(),
            connect_timeout: settings.device.connect_timeout(),
            // A write stuck longer than an unanswered probe is a dead link
            write_timeout: settings.heartbeat.timeout(),
            heartbeat_settings: settings.heartbeat.clone(),
            backoff: ReconnectBackoff::from_settings(&settings.reconnect),
            state: state_tx,
            commands: command_rx,
            events: event_tx,
            pending_connect: None,
            transport: None,
            heartbeat: None,
            reconnect: None,
            connection_id: None,
        };
        let handle = ConnectionHandle {
            commands: command_tx,
            state: state_rx,
        };

        (manager, handle, event_rx)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until shut down or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::debug!(url = %self.url, "Connection manager running");

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(ManagerCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },

                frame = recv_frame(&mut self.transport) => self.handle_frame(frame).await,

                action = heartbeat_action(&mut self.heartbeat) => self.handle_heartbeat(action).await,

                result = connect_result(&mut self.pending_connect) => self.handle_connect_result(result),

                () = reconnect_due(&mut self.reconnect) => {
                    self.reconnect = None;
                    self.begin_connect();
                }
            }
        }

        self.shutdown().await;
    }

    async fn handle_command(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::Start => self.start(),
            ManagerCommand::Send(command) => self.send(command).await,
            ManagerCommand::Close => self.close_link(DisconnectReason::ClosedLocally).await,
            ManagerCommand::Shutdown => {}
        }
    }

    fn start(&mut self) {
        match self.current_state() {
            ConnectionState::Disconnected => {
                // The explicit start replaces any pending retry
                self.reconnect = None;
                self.begin_connect();
            }
            state => tracing::debug!(state = %state, "Start ignored"),
        }
    }

    fn begin_connect(&mut self) {
        if self.transport.is_some() || self.pending_connect.is_some() {
            tracing::debug!("Connect skipped, a link already exists");
            return;
        }

        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let connect_timeout = self.connect_timeout;
        self.pending_connect = Some(Box::pin(async move {
            match timeout(connect_timeout, connector.connect(&url)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::ConnectTimeout(connect_timeout)),
            }
        }));

        self.set_state(ConnectionState::Connecting);
        tracing::info!(url = %self.url, "Connecting to timing device");
    }

    fn handle_connect_result(&mut self, result: Result<C::Transport, TransportError>) {
        self.pending_connect = None;

        match result {
            Ok(transport) => {
                let connection_id = Uuid::new_v4();
                self.transport = Some(transport);
                self.heartbeat = Some(HeartbeatMonitor::new(&self.heartbeat_settings));
                self.connection_id = Some(connection_id);
                self.backoff.reset();
                self.set_state(ConnectionState::Open);

                tracing::info!(
                    connection_id = %connection_id,
                    url = %self.url,
                    "Device connection opened"
                );
                self.emit(ConnectionEvent::Connected { connection_id });
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Device connection failed");
                self.finish_close(DisconnectReason::ConnectFailed(e.to_string()));
            }
        }
    }

    async fn send(&mut self, command: Command) {
        let Some(transport) = self.transport.as_mut() else {
            tracing::warn!(
                field = command.field(),
                state = %self.current_state(),
                "Command dropped, device not connected"
            );
            self.emit(ConnectionEvent::CommandDropped(command));
            return;
        };

        let text = match command.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize command");
                return;
            }
        };

        tracing::debug!(command = %text, "Sending command");
        if let Err(e) = write_frame(transport, text, self.write_timeout).await {
            tracing::warn!(error = %e, "Command send failed");
            self.close_link(DisconnectReason::TransportError(e.to_string()))
                .await;
        }
    }

    async fn handle_frame(&mut self, frame: Option<Result<String, TransportError>>) {
        match frame {
            Some(Ok(text)) => self.handle_text(text),
            Some(Err(e)) => {
                tracing::warn!(
                    connection_id = ?self.connection_id,
                    error = %e,
                    "WebSocket receive error"
                );
                self.close_link(DisconnectReason::TransportError(e.to_string()))
                    .await;
            }
            None => self.close_link(DisconnectReason::ClosedByRemote).await,
        }
    }

    fn handle_text(&mut self, text: String) {
        if text == self.heartbeat_settings.ack {
            let expected = self
                .heartbeat
                .as_mut()
                .map(HeartbeatMonitor::acknowledge)
                .unwrap_or(false);
            tracing::trace!(expected, "Heartbeat acknowledged");
            return;
        }
        if self.heartbeat_settings.is_sentinel(&text) {
            tracing::trace!("Ignoring probe frame from device");
            return;
        }

        match decode_status(&text) {
            Ok(status) => self.emit(ConnectionEvent::Status(status)),
            Err(e) => tracing::warn!(
                error = %e,
                frame = %truncate(&text, LOGGED_FRAME_LIMIT),
                "Discarding malformed status frame"
            ),
        }
    }

    async fn handle_heartbeat(&mut self, action: HeartbeatAction) {
        match action {
            HeartbeatAction::SendProbe => {
                let Some(transport) = self.transport.as_mut() else {
                    return;
                };
                let probe = self.heartbeat_settings.probe.clone();
                match write_frame(transport, probe, self.write_timeout).await {
                    Ok(()) => {
                        if let Some(heartbeat) = self.heartbeat.as_mut() {
                            heartbeat.probe_sent();
                        }
                        tracing::trace!("Heartbeat probe sent");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Heartbeat probe send failed");
                        self.close_link(DisconnectReason::TransportError(e.to_string()))
                            .await;
                    }
                }
            }
            HeartbeatAction::TimedOut => {
                tracing::warn!(
                    connection_id = ?self.connection_id,
                    timeout_ms = self.heartbeat_settings.timeout_ms,
                    "Heartbeat timeout, closing connection"
                );
                self.emit(ConnectionEvent::HeartbeatTimeout);
                self.close_link(DisconnectReason::HeartbeatTimeout).await;
            }
        }
    }

    /// End the current link, if any, and schedule the single reconnect.
    async fn close_link(&mut self, reason: DisconnectReason) {
        if self.transport.is_none() && self.pending_connect.is_none() {
            return;
        }
        self.release_link().await;
        self.finish_close(reason);
    }

    /// Drop the heartbeat and any connect attempt, then close the transport.
    async fn release_link(&mut self) {
        self.heartbeat = None;
        self.pending_connect = None;

        if let Some(mut transport) = self.transport.take() {
            self.set_state(ConnectionState::Closing);
            match timeout(CLOSE_GRACE, transport.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "Close on a failed link"),
                Err(_) => tracing::debug!("Graceful close timed out, dropping link"),
            }
        }
    }

    fn finish_close(&mut self, reason: DisconnectReason) {
        let connection_id = self.connection_id.take();
        self.set_state(ConnectionState::Disconnected);
        tracing::info!(connection_id = ?connection_id, reason = %reason, "Device disconnected");
        self.emit(ConnectionEvent::Disconnected { reason });
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect.is_some() {
            tracing::debug!("Reconnect already scheduled");
            return;
        }
        let delay = self.backoff.next_delay();
        self.reconnect = Some(Box::pin(sleep(delay)));
        tracing::info!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
    }

    async fn shutdown(&mut self) {
        self.reconnect = None;
        let was_linked = self.transport.is_some();
        self.release_link().await;
        self.connection_id = None;
        self.set_state(ConnectionState::Disconnected);
        if was_linked {
            self.emit(ConnectionEvent::Disconnected {
                reason: DisconnectReason::Shutdown,
            });
        }
        tracing::info!("Connection manager stopped");
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::trace!(from = %current, to = %state, "Connection state change");
            *current = state;
            true
        });
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Event receiver dropped");
        }
    }
}

/// Send one frame, giving up once `limit` has passed.
async fn write_frame<T: Transport>(
    transport: &mut T,
    text: String,
    limit: Duration,
) -> Result<(), TransportError> {
    match timeout(limit, transport.send_text(text)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::WriteTimeout(limit)),
    }
}

async fn recv_frame<T: Transport>(
    transport: &mut Option<T>,
) -> Option<Result<String, TransportError>> {
    match transport.as_mut() {
        Some(transport) => transport.recv().await,
        None => pending().await,
    }
}

async fn heartbeat_action(heartbeat: &mut Option<HeartbeatMonitor>) -> HeartbeatAction {
    match heartbeat.as_mut() {
        Some(heartbeat) => heartbeat.next_action().await,
        None => pending().await,
    }
}

async fn connect_result<T>(
    pending_connect: &mut Option<BoxFuture<'static, Result<T, TransportError>>>,
) -> Result<T, TransportError> {
    match pending_connect.as_mut() {
        Some(attempt) => attempt.await,
        None => pending().await,
    }
}

async fn reconnect_due(reconnect: &mut Option<Pin<Box<Sleep>>>) {
    match reconnect.as_mut() {
        Some(delay) => delay.as_mut().await,
        None => pending().await,
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
