//! The connection seen by a session: ordered text and binary frames.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::SinkExt;
use thiserror::Error;
use tts_core::ChunkSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Bytes),
    Close,
}

#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Ordered, message-framed, bidirectional connection.
#[async_trait]
pub trait Transport: Send {
    /// Next frame from the peer, `None` once the connection is gone.
    async fn recv(&mut self) -> Option<Result<InboundFrame, TransportError>>;
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    async fn send_binary(&mut self, data: Bytes) -> Result<(), TransportError>;
    async fn close(&mut self);
}

/// [`Transport`] over an upgraded axum WebSocket.
pub struct WsTransport {
    socket: WebSocket,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Option<Result<InboundFrame, TransportError>> {
        loop {
            let frame = match self.socket.recv().await? {
                Ok(Message::Text(text)) => InboundFrame::Text(text.as_str().to_owned()),
                Ok(Message::Binary(data)) => InboundFrame::Binary(data),
                Ok(Message::Close(_)) => InboundFrame::Close,
                // Pings are answered by axum itself.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Err(e) => return Some(Err(TransportError(e.to_string()))),
            };
            return Some(Ok(frame));
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError(e.to_string()))
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), TransportError> {
        self.socket
            .send(Message::Binary(data))
            .await
            .map_err(|e| TransportError(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = SinkExt::close(&mut self.socket).await;
    }
}

/// Adapts a [`Transport`] into the binary sink the synthesis streamer writes to.
pub struct BinaryFrames<'a, T: Transport + ?Sized>(pub &'a mut T);

#[async_trait]
impl<'a, T: Transport + ?Sized> ChunkSink for BinaryFrames<'a, T> {
    async fn send_chunk(&mut self, chunk: Bytes) -> anyhow::Result<()> {
        self.0.send_binary(chunk).await?;
        Ok(())
    }
}
