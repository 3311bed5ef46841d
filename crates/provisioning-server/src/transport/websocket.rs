//! Login socket adapter over axum's WebSocket.
//!
//! The orchestrator owns the write half. A background reader drains the read
//! half so that a peer close is observed; inbound payloads are ignored.

use crate::login::LoginPeer;
use async_trait::async_trait;
use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use provisioning_core::{LoginMessage, ProvResult, ProvisioningError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct DuplexChannel {
    sink: SplitSink<WebSocket, Message>,
    reader: JoinHandle<()>,
}

impl DuplexChannel {
    /// Split `socket` and start the reader. `cancel` fires once the peer
    /// closes, the stream ends, or a read fails.
    pub fn open(socket: WebSocket, cancel: CancellationToken) -> Self {
        let (sink, stream) = socket.split();
        let reader = tokio::spawn(drain(stream, cancel));
        Self { sink, reader }
    }

    /// Write one JSON text frame.
    pub async fn send(&mut self, msg: &LoginMessage) -> ProvResult<()> {
        let text = serde_json::to_string(msg)?;
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ProvisioningError::Transport(format!("WS send failed: {e}")))
    }

    /// Send a close frame and stop the reader. Errors are logged, not returned.
    pub async fn close(mut self) {
        let frame = CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::from_static("login finished"),
        };
        if let Err(e) = self.sink.send(Message::Close(Some(frame))).await {
            debug!(error = %e, "close frame not sent");
        }
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "login socket sink not closed cleanly");
        }
        self.reader.abort();
    }
}

#[async_trait]
impl LoginPeer for DuplexChannel {
    async fn send(&mut self, msg: &LoginMessage) -> ProvResult<()> {
        DuplexChannel::send(self, msg).await
    }
}

async fn drain(mut stream: SplitStream<WebSocket>, cancel: CancellationToken) {
    loop {
        match stream.next().await {
            Some(Ok(Message::Close(frame))) => {
                debug!(code = ?frame.map(|f| f.code), "login socket closed by peer, cancelling login");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(error = %e, "login socket read failed");
                break;
            }
            None => break,
        }
    }
    cancel.cancel();
}
