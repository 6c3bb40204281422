//! Infrastructure Layer
//!
//! Network transport to the timing device.

pub mod transport;
pub mod websocket;

pub use transport::{Connector, Transport};
pub use websocket::{WebSocketConnector, WebSocketTransport};
