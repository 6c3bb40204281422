//! WebSocket transport backed by tokio-tungstenite.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::transport::{Connector, Transport};
use crate::shared::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector for plain `ws://` device endpoints.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &str) -> Result<Self::Transport, TransportError> {
        tracing::debug!(url = %url, "Connecting to WebSocket URL");
        let (ws_stream, response) = connect_async(url).await?;
        tracing::debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(WebSocketTransport { ws_stream })
    }
}

/// An open WebSocket link to the device.
pub struct WebSocketTransport {
    ws_stream: WsStream,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.ws_stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(map_ws_error)
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.ws_stream.next().await? {
                Ok(WsMessage::Text(text)) => return Some(Ok(text.to_string())),
                Ok(WsMessage::Binary(bin)) => match String::from_utf8(bin.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::debug!(len = bin.len(), "Ignoring non-UTF-8 binary frame");
                    }
                },
                Ok(WsMessage::Close(frame)) => {
                    tracing::debug!(frame = ?frame, "WebSocket closed by device");
                    return None;
                }
                // Control frames are answered by tungstenite itself
                Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) | Ok(WsMessage::Frame(_)) => {}
                Err(e) => return Some(Err(map_ws_error(e))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.ws_stream.close(None).await.map_err(map_ws_error)
    }
}

/// A link that is already gone is reported as [`TransportError::Closed`].
fn map_ws_error(error: WsError) -> TransportError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        other => TransportError::WebSocket(other),
    }
}
