use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use quakesaver_rs_protocol::StreamCommand;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use crate::error::{ClientError, Result};

/// One WebSocket connection to a sensor's `/ws` endpoint.
///
/// Dropping the connection tears the underlying socket down; this is
/// what makes consumer cancellation release the sensor connection on
/// every exit path.
pub(crate) struct Connection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection {
    pub async fn open(host: &str, connect_timeout: Duration) -> Result<Self> {
        let url = format!("ws://{host}/ws");
        debug!(%url, "websocket connecting");
        let (ws, _response) = tokio::time::timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| ClientError::Timeout(connect_timeout))??;
        Ok(Self { ws })
    }

    pub async fn send_command(&mut self, command: StreamCommand) -> Result<()> {
        trace!(action = command.as_str(), "sending");
        self.ws.send(Message::Text(command.to_json().into())).await?;
        Ok(())
    }

    /// Receive the next text payload.
    ///
    /// Control frames and binary payloads are skipped; `Ok(None)` means
    /// the peer closed the connection. This is the session's only
    /// suspension point while streaming.
    pub async fn next_text(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.ws.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text.to_string())),
                Message::Binary(payload) => {
                    warn!(len = payload.len(), "ignoring unexpected binary message");
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                Message::Close(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.ws.send(Message::Ping(Vec::new().into())).await?;
        Ok(())
    }

    /// Close the connection, swallowing closing errors.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
