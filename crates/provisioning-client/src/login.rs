//! Client side of the WebSocket login ceremony.

use crate::error::{ClientError, ClientResult};
use futures_util::{SinkExt, StreamExt};
use provisioning_core::{subprotocol_offer, ErrorBody, LoginMessage};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// An open login handshake.
///
/// The server closes the socket after the terminal frame, so
/// [`next_message`](Self::next_message) returning `None` means the
/// handshake is over.
pub struct LoginSession {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl LoginSession {
    pub(crate) async fn connect(
        url: reqwest::Url,
        protocol: &str,
        secret: &str,
    ) -> ClientResult<Self> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ClientError::Url(e.to_string()))?;
        let offer = HeaderValue::from_str(&subprotocol_offer(protocol, secret))
            .map_err(|e| ClientError::Transport(format!("bad subprotocol header: {e}")))?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", offer);

        match connect_async(request).await {
            Ok((ws, _resp)) => Ok(Self { ws }),
            Err(WsError::Http(resp)) => {
                let status = resp.status().as_u16();
                let body = resp
                    .body()
                    .as_deref()
                    .and_then(|bytes| serde_json::from_slice::<ErrorBody>(bytes).ok());
                Err(match body {
                    Some(body) => ClientError::Api { status, body },
                    None => ClientError::Status(status),
                })
            }
            Err(e) => Err(ClientError::Transport(format!("WS connect failed: {e}"))),
        }
    }

    /// Next frame from the server; `None` once the socket is closed.
    pub async fn next_message(&mut self) -> ClientResult<Option<LoginMessage>> {
        while let Some(frame) = self.ws.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(Some(serde_json::from_str(&text)?)),
                Ok(Message::Close(_)) => return Ok(None),
                Ok(_) => {}
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return Ok(None),
                Err(e) => return Err(ClientError::Transport(format!("WS read failed: {e}"))),
            }
        }
        Ok(None)
    }

    /// Read every frame until the server closes the socket.
    pub async fn collect(mut self) -> ClientResult<Vec<LoginMessage>> {
        let mut messages = Vec::new();
        while let Some(msg) = self.next_message().await? {
            messages.push(msg);
        }
        Ok(messages)
    }

    /// Abandon the handshake.
    pub async fn close(mut self) -> ClientResult<()> {
        match self.ws.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {}
            Err(e) => return Err(ClientError::Transport(format!("WS close failed: {e}"))),
        }
        // Drain until the server acknowledges the close.
        while let Some(frame) = self.ws.next().await {
            if frame.is_err() {
                break;
            }
        }
        if let Err(e) = self.ws.flush().await {
            debug!(error = %e, "flush after close failed");
        }
        debug!("login socket closed");
        Ok(())
    }
}
