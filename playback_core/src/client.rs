//! WebSocket connection to the relay.

use futures_util::{SinkExt, StreamExt};
use protocol_core::ClientMessage;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info};

use crate::controller::ClientEvent;

pub struct RelayConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RelayConnection {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to {url}: {e}"))?;
        info!("Connected to {url}");
        Ok(Self { stream })
    }

    pub async fn send(&mut self, message: &ClientMessage) -> anyhow::Result<()> {
        self.stream.send(Message::text(message.to_json())).await?;
        Ok(())
    }

    /// Next event from the relay. Returns [`ClientEvent::Disconnected`] once
    /// the connection is closed; callers stop reading after that.
    pub async fn next_event(&mut self) -> ClientEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return ClientEvent::Text(text.as_str().to_owned()),
                Some(Ok(Message::Binary(data))) => return ClientEvent::Binary(data),
                Some(Ok(Message::Close(_))) | None => return ClientEvent::Disconnected,
                Some(Ok(other)) => debug!("Ignoring control frame: {other:?}"),
                Some(Err(e)) => return ClientEvent::Error(e.to_string()),
            }
        }
    }

    pub async fn close(&mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
