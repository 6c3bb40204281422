//! Interface to the user-facing front end.

use crate::application::services::connection::DisconnectReason;
use crate::domain::{Command, DecodedStatus};

/// Receives everything a front end renders: banners, mirrored device
/// settings and the running display.
///
/// All methods default to no-ops so a front end implements only what it
/// shows.
pub trait ClientObserver: Send {
    fn on_connected(&mut self) {}

    fn on_disconnected(&mut self, _reason: &DisconnectReason) {}

    fn on_heartbeat_timeout(&mut self) {}

    /// Called for every decoded, non-sentinel status frame.
    fn on_status(&mut self, _status: &DecodedStatus) {}

    /// Called on every live tick and once with the final value of a run.
    fn on_display_tick(&mut self, _formatted: &str, _raw_micros: u64) {}

    fn on_command_dropped(&mut self, _command: &Command) {}
}
