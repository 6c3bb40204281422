//! Heartbeat Monitor
//!
//! Detects a silently dead link that the transport has not reported closed.
//! Every `interval` the owner sends the probe frame and calls
//! [`HeartbeatMonitor::probe_sent`], which arms a deadline. An acknowledgment
//! frame disarms it; if the deadline passes first the link is declared dead.
//!
//! The monitor only exists while a connection is open. Both timers are owned
//! fields, so dropping the monitor cancels them.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Sleep};

use crate::config::HeartbeatSettings;

/// Probe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    /// No probe outstanding
    Idle,
    /// Probe sent, deadline armed
    AwaitingPong,
}

/// What the owner must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    SendProbe,
    TimedOut,
}

#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    timeout: Duration,
    state: HeartbeatState,
    next_probe: Pin<Box<Sleep>>,
    deadline: Option<Pin<Box<Sleep>>>,
    probes_sent: u64,
}

impl HeartbeatMonitor {
    /// Start monitoring; the first probe is due one interval from now.
    pub fn new(settings: &HeartbeatSettings) -> Self {
        let interval = settings.interval();
        Self {
            interval,
            timeout: settings.timeout(),
            state: HeartbeatState::Idle,
            next_probe: Box::pin(sleep(interval)),
            deadline: None,
            probes_sent: 0,
        }
    }

    pub fn state(&self) -> HeartbeatState {
        self.state
    }

    pub fn probes_sent(&self) -> u64 {
        self.probes_sent
    }

    /// Wait for the next probe tick or for the outstanding probe to expire.
    ///
    /// Cancel-safe. A probe tick that lands while a probe is still
    /// outstanding is skipped; a deadline and a probe tick falling due
    /// together resolve as a timeout.
    pub async fn next_action(&mut self) -> HeartbeatAction {
        loop {
            tokio::select! {
                biased;

                () = wait_deadline(&mut self.deadline) => {
                    self.deadline = None;
                    return HeartbeatAction::TimedOut;
                }

                () = self.next_probe.as_mut() => {
                    self.schedule_next_probe();
                    if self.state == HeartbeatState::AwaitingPong {
                        tracing::trace!("Probe still outstanding, skipping tick");
                        continue;
                    }
                    return HeartbeatAction::SendProbe;
                }
            }
        }
    }

    /// Record that the probe frame went out and arm its deadline.
    pub fn probe_sent(&mut self) {
        self.state = HeartbeatState::AwaitingPong;
        self.deadline = Some(Box::pin(sleep(self.timeout)));
        self.probes_sent += 1;
    }

    /// Handle an acknowledgment frame. Returns `false` if none was expected.
    pub fn acknowledge(&mut self) -> bool {
        match self.state {
            HeartbeatState::AwaitingPong => {
                self.deadline = None;
                self.state = HeartbeatState::Idle;
                true
            }
            HeartbeatState::Idle => false,
        }
    }

    fn schedule_next_probe(&mut self) {
        let next = self.next_probe.deadline() + self.interval;
        self.next_probe.as_mut().reset(next);
    }
}

async fn wait_deadline(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline.as_mut() {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}
