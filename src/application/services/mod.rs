//! Application Services
//!
//! Connection lifecycle, liveness probing and display timing.

pub mod connection;
pub mod dispatcher;
pub mod display;
pub mod heartbeat;

pub use connection::{
    ConnectionEvent, ConnectionHandle, ConnectionManager, ConnectionState, DisconnectReason,
};
pub use dispatcher::EventDispatcher;
pub use display::{DisplayTick, TimingDisplayDriver};
pub use heartbeat::{HeartbeatAction, HeartbeatMonitor, HeartbeatState};
