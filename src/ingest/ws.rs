//! WebSocket transport built on tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::connection::{Connection, Connector};
use super::error::ConnectionError;

/// Opens WebSocket connections to a fixed URL (`ws://` or `wss://`)
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        let (stream, response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ConnectionError::Connect(e.to_string()))?;
        debug!(url = %self.url, status = %response.status(), "websocket handshake complete");

        Ok(Box::new(WsConnection { stream }))
    }
}

/// An open WebSocket
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn recv(&mut self) -> Option<Result<String, ConnectionError>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(ConnectionError::Transport(e.to_string()))),
            };

            match message {
                Message::Text(text) => return Some(Ok(text)),
                Message::Binary(bytes) => {
                    return Some(
                        String::from_utf8(bytes)
                            .map_err(|e| ConnectionError::Transport(e.to_string())),
                    )
                }
                Message::Close(frame) => {
                    debug!(?frame, "close frame received");
                    return None;
                }
                // Pings are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn send(&mut self, text: &str) -> Result<(), ConnectionError> {
        self.stream
            .send(Message::Text(text.to_owned()))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }
}
