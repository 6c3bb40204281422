//! Timer session state.

use tokio::time::Instant;

/// The device's current timing run, as seen by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerSession {
    /// Local instant the run was first reported as running
    pub start_time: Option<Instant>,
    pub running: bool,
    /// Final duration in microseconds, from device timestamps
    pub last_duration: Option<u64>,
}

impl TimerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset on a "ready" report. The last finished duration is kept.
    pub fn reset(&mut self) {
        self.start_time = None;
        self.running = false;
    }

    pub fn begin(&mut self, now: Instant) {
        self.start_time = Some(now);
        self.running = true;
    }

    pub fn finish(&mut self, duration_micros: u64) {
        self.start_time = None;
        self.running = false;
        self.last_duration = Some(duration_micros);
    }

    /// Locally measured elapsed time; `None` unless running.
    pub fn elapsed_micros(&self, now: Instant) -> Option<u64> {
        if !self.running {
            return None;
        }
        self.start_time.map(|start| {
            u64::try_from(now.saturating_duration_since(start).as_micros()).unwrap_or(u64::MAX)
        })
    }
}
