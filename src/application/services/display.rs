//! Timing Display Driver
//!
//! Turns discrete device reports into a continuously advancing display.
//! While a run is live the elapsed time is measured on the local clock and
//! republished every tick; when the run finishes the device's own
//! timestamps replace it, so the final value matches the device exactly.

use std::future::pending;
use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::config::DisplaySettings;
use crate::domain::{format_micros, DecodedStatus, StatusKind, TimerSession};

/// One published display value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTick {
    pub formatted: String,
    pub raw_micros: u64,
    /// Set on the value computed from a finish report
    pub is_final: bool,
}

impl DisplayTick {
    fn live(raw_micros: u64) -> Self {
        Self {
            formatted: format_micros(raw_micros),
            raw_micros,
            is_final: false,
        }
    }

    fn finished(raw_micros: u64) -> Self {
        Self {
            formatted: format_micros(raw_micros),
            raw_micros,
            is_final: true,
        }
    }
}

pub struct TimingDisplayDriver {
    session: TimerSession,
    tick_period: Duration,
    ticker: Option<Interval>,
    last_published: u64,
}

impl TimingDisplayDriver {
    pub fn new(settings: &DisplaySettings) -> Self {
        Self {
            session: TimerSession::new(),
            tick_period: settings.tick(),
            ticker: None,
            last_published: 0,
        }
    }

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Apply a device report.
    ///
    /// Returns the final display value for a finish report. A ready report
    /// stops ticking and leaves the display at its last value.
    pub fn handle_status(&mut self, status: &DecodedStatus) -> Option<DisplayTick> {
        match &status.kind {
            StatusKind::Ready => {
                if self.ticker.take().is_some() {
                    tracing::debug!("Run reset while ticking");
                }
                self.session.reset();
                None
            }
            StatusKind::Running => {
                if self.ticker.is_some() {
                    return None;
                }
                let now = Instant::now();
                self.session.begin(now);
                self.last_published = 0;

                let mut ticker = interval_at(now + self.tick_period, self.tick_period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.ticker = Some(ticker);
                tracing::debug!(tick_ms = self.tick_period.as_millis() as u64, "Run started");
                None
            }
            StatusKind::Finish => {
                self.ticker = None;
                match status.elapsed_micros() {
                    Some(duration) => {
                        self.session.finish(duration);
                        tracing::info!(
                            duration_us = duration,
                            formatted = %format_micros(duration),
                            "Run finished"
                        );
                        Some(DisplayTick::finished(duration))
                    }
                    // decode_status rejects these; only hand-built statuses get here
                    None => {
                        tracing::warn!(
                            start = ?status.start,
                            finish = ?status.finish,
                            "Finish report without usable timestamps"
                        );
                        self.session.reset();
                        None
                    }
                }
            }
            StatusKind::Other(_) => None,
        }
    }

    /// Wait for the next live tick. Pending forever while no run is live.
    ///
    /// Cancel-safe.
    pub async fn next_tick(&mut self) -> DisplayTick {
        let Some(ticker) = self.ticker.as_mut() else {
            return pending().await;
        };
        ticker.tick().await;
        let elapsed = self.session.elapsed_micros(Instant::now()).unwrap_or(0);
        // Published values never go backwards within a run
        self.last_published = self.last_published.max(elapsed);
        DisplayTick::live(self.last_published)
    }
}
