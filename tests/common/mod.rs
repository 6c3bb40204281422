//! Common Test Utilities
//!
//! A scripted in-memory timing device plus helpers for awaiting events.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use mgk_timer_client::application::services::{
    ConnectionEvent, ConnectionHandle, ConnectionManager, ConnectionState, DisconnectReason,
};
use mgk_timer_client::application::ClientObserver;
use mgk_timer_client::config::Settings;
use mgk_timer_client::domain::{Command, DecodedStatus, StatusKind};
use mgk_timer_client::infrastructure::{Connector, Transport};
use mgk_timer_client::shared::error::TransportError;

/// How the device answers the next connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Accept,
    Refuse,
    Hang,
}

enum Inbound {
    Text(String),
    Close,
    Error,
}

#[derive(Default)]
struct DeviceState {
    script: VecDeque<ConnectOutcome>,
    auto_pong: bool,
    stall_writes: bool,
    connects: usize,
    live: usize,
    max_live: usize,
    sent: Vec<String>,
    inbound: Option<mpsc::UnboundedSender<Inbound>>,
}

/// Test-side control of the fake device.
#[derive(Clone, Default)]
pub struct FakeDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that answers every probe.
    pub fn responsive() -> Self {
        let device = Self::new();
        device.set_auto_pong(true);
        device
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            device: self.clone(),
        }
    }

    pub fn script(&self, outcomes: &[ConnectOutcome]) {
        self.state.lock().unwrap().script.extend(outcomes);
    }

    pub fn set_auto_pong(&self, enabled: bool) {
        self.state.lock().unwrap().auto_pong = enabled;
    }

    /// Make every write on the link hang, like a peer that stopped reading.
    pub fn set_stall_writes(&self, enabled: bool) {
        self.state.lock().unwrap().stall_writes = enabled;
    }

    /// Deliver a text frame on the current link. Returns `false` without one.
    pub fn push_text(&self, text: &str) -> bool {
        self.push(Inbound::Text(text.to_string()))
    }

    pub fn close_from_device(&self) -> bool {
        self.push(Inbound::Close)
    }

    pub fn fail_link(&self) -> bool {
        self.push(Inbound::Error)
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn live(&self) -> usize {
        self.state.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.state.lock().unwrap().max_live
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Sent frames other than heartbeat probes.
    pub fn sent_commands(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|frame| frame != "__ping__")
            .collect()
    }

    pub fn probes_sent(&self) -> usize {
        self.sent()
            .iter()
            .filter(|frame| frame.as_str() == "__ping__")
            .count()
    }

    fn push(&self, frame: Inbound) -> bool {
        match self.state.lock().unwrap().inbound.as_ref() {
            Some(inbound) => inbound.send(frame).is_ok(),
            None => false,
        }
    }
}

pub struct FakeConnector {
    device: FakeDevice,
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self, _url: &str) -> Result<FakeTransport, TransportError> {
        let outcome = {
            let mut state = self.device.state.lock().unwrap();
            state.connects += 1;
            state.script.pop_front().unwrap_or(ConnectOutcome::Accept)
        };

        match outcome {
            ConnectOutcome::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                let mut state = self.device.state.lock().unwrap();
                state.inbound = Some(tx);
                state.live += 1;
                state.max_live = state.max_live.max(state.live);
                Ok(FakeTransport {
                    device: self.device.clone(),
                    inbound: rx,
                    released: false,
                })
            }
            ConnectOutcome::Refuse => Err(TransportError::Other("connection refused".into())),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }
}

pub struct FakeTransport {
    device: FakeDevice,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    released: bool,
}

impl FakeTransport {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let mut state = self.device.state.lock().unwrap();
            state.live -= 1;
            state.inbound = None;
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.released {
            return Err(TransportError::Closed);
        }
        let stalled = self.device.state.lock().unwrap().stall_writes;
        if stalled {
            return std::future::pending().await;
        }
        let mut state = self.device.state.lock().unwrap();
        if text == "__ping__" && state.auto_pong {
            if let Some(inbound) = state.inbound.as_ref() {
                let _ = inbound.send(Inbound::Text("__pong__".into()));
            }
        }
        state.sent.push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        match self.inbound.recv().await {
            Some(Inbound::Text(text)) => Some(Ok(text)),
            Some(Inbound::Error) => Some(Err(TransportError::Other("link reset".into()))),
            Some(Inbound::Close) | None => None,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.release();
        Ok(())
    }
}

impl Drop for FakeTransport {
    fn drop(&mut self) {
        self.release();
    }
}

/// Everything a front end was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Connected,
    Disconnected(DisconnectReason),
    HeartbeatTimeout,
    Status(StatusKind),
    Tick(String, u64),
    Dropped(Command),
}

#[derive(Clone, Default)]
pub struct RecordingObserver {
    log: Arc<Mutex<Vec<Observed>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observed(&self) -> Vec<Observed> {
        self.log.lock().unwrap().clone()
    }

    pub fn ticks(&self) -> Vec<(String, u64)> {
        self.observed()
            .into_iter()
            .filter_map(|entry| match entry {
                Observed::Tick(formatted, raw) => Some((formatted, raw)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, entry: Observed) {
        self.log.lock().unwrap().push(entry);
    }
}

impl ClientObserver for RecordingObserver {
    fn on_connected(&mut self) {
        self.record(Observed::Connected);
    }

    fn on_disconnected(&mut self, reason: &DisconnectReason) {
        self.record(Observed::Disconnected(reason.clone()));
    }

    fn on_heartbeat_timeout(&mut self) {
        self.record(Observed::HeartbeatTimeout);
    }

    fn on_status(&mut self, status: &DecodedStatus) {
        self.record(Observed::Status(status.kind.clone()));
    }

    fn on_display_tick(&mut self, formatted: &str, raw_micros: u64) {
        self.record(Observed::Tick(formatted.to_string(), raw_micros));
    }

    fn on_command_dropped(&mut self, command: &Command) {
        self.record(Observed::Dropped(command.clone()));
    }
}

/// Defaults: 5 s heartbeat interval and timeout, 2 s reconnect delay.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.device.url = "ws://timer.test/ws".into();
    settings
}

pub struct Harness {
    pub device: FakeDevice,
    pub handle: ConnectionHandle,
    pub events: mpsc::UnboundedReceiver<ConnectionEvent>,
    pub task: tokio::task::JoinHandle<()>,
}

/// Spawn a manager against `device` and ask it to connect.
pub fn start_client(device: &FakeDevice, settings: &Settings) -> Harness {
    let (manager, handle, events) = ConnectionManager::new(device.connector(), settings);
    let task = manager.spawn();
    handle.start().unwrap();
    Harness {
        device: device.clone(),
        handle,
        events,
        task,
    }
}

impl Harness {
    /// Next event, failing the test if none arrives within a minute.
    pub async fn next_event(&mut self) -> ConnectionEvent {
        tokio::time::timeout(Duration::from_secs(60), self.events.recv())
            .await
            .expect("no connection event within 60s")
            .expect("event stream closed")
    }

    pub async fn expect_connected(&mut self) {
        match self.next_event().await {
            ConnectionEvent::Connected { .. } => {}
            other => panic!("expected Connected, got {other:?}"),
        }
    }

    pub async fn expect_disconnected(&mut self) -> DisconnectReason {
        match self.next_event().await {
            ConnectionEvent::Disconnected { reason } => reason,
            other => panic!("expected Disconnected, got {other:?}"),
        }
    }

    pub async fn expect_status(&mut self) -> DecodedStatus {
        match self.next_event().await {
            ConnectionEvent::Status(status) => status,
            other => panic!("expected Status, got {other:?}"),
        }
    }

    /// Events already queued, without waiting.
    pub fn drain(&mut self) -> Vec<ConnectionEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub async fn wait_for_state(&self, state: ConnectionState) {
        let mut watch = self.handle.watch_state();
        tokio::time::timeout(Duration::from_secs(60), watch.wait_for(|s| *s == state))
            .await
            .expect("state not reached within 60s")
            .expect("manager stopped");
    }

    pub async fn stop(self) {
        self.handle.shutdown();
        self.task.await.unwrap();
    }
}
