//! Transport abstraction.
//!
//! The connection manager only needs to open a link, exchange text frames and
//! close it again. Keeping that behind traits lets the manager run against a
//! scripted in-memory device in tests.

use async_trait::async_trait;

use crate::shared::error::TransportError;

/// An open, bidirectional text-frame link.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next inbound text frame; `None` once the peer has closed the link.
    ///
    /// Must be cancel-safe: the manager polls it inside `select!`.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the link. Errors from an already closed link are expected.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens new links to a fixed kind of endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, url: &str) -> Result<Self::Transport, TransportError>;
}
