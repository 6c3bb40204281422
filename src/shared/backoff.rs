//! Reconnect Backoff
//!
//! Delay schedule between connection attempts.

use std::time::Duration;

use crate::config::ReconnectSettings;

/// Doubling reconnect delay, capped at `max`.
///
/// With `initial == max` the schedule is a constant delay.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl ReconnectBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    pub fn from_settings(settings: &ReconnectSettings) -> Self {
        Self::new(settings.delay(), settings.max_delay())
    }

    /// Delay before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Back to the initial delay after a successful connect.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
