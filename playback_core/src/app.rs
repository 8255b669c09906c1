//! Client application context.

use protocol_core::ClientMessage;
use tracing::{info, warn};

use crate::buffer::BufferState;
use crate::client::RelayConnection;
use crate::config::ClientConfig;
use crate::controller::{ClientEvent, Played, PlaybackController};
use crate::error::PlaybackError;
use crate::sink::AudioSink;

/// Lifecycle of the single relay connection a client owns.
pub enum ConnectionState {
    /// Nothing has been connected yet.
    Uninitialized,
    Connected(RelayConnection),
    /// The connection was established once and is gone. It is never rebuilt.
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }
}

pub struct ClientApp<S: AudioSink> {
    config: ClientConfig,
    connection: ConnectionState,
    controller: PlaybackController<S>,
}

impl<S: AudioSink> ClientApp<S> {
    pub fn new(config: ClientConfig, sink: S) -> Self {
        let controller = PlaybackController::new(config.expected, config.format, sink);
        Self {
            config,
            connection: ConnectionState::Uninitialized,
            controller,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn controller(&self) -> &PlaybackController<S> {
        &self.controller
    }

    /// Connect on first use. Later calls reuse the connection; once it has
    /// closed, no new one is made.
    pub async fn ensure_connected(&mut self) -> anyhow::Result<&mut RelayConnection> {
        if let ConnectionState::Uninitialized = self.connection {
            let connection = RelayConnection::connect(&self.config.relay_url).await?;
            self.connection = ConnectionState::Connected(connection);
            self.controller.handle(ClientEvent::Connected);
        }

        match &mut self.connection {
            ConnectionState::Connected(connection) => Ok(connection),
            ConnectionState::Closed => Err(anyhow::anyhow!("connection to relay is closed")),
            ConnectionState::Uninitialized => {
                Err(anyhow::anyhow!("connection was not initialized"))
            }
        }
    }

    pub async fn send(&mut self, text: &str) -> anyhow::Result<()> {
        let message = ClientMessage::new(text, self.config.conversation_id.clone());
        self.ensure_connected().await?.send(&message).await
    }

    /// Wait for the next relay event and apply it. `None` when there is no
    /// live connection to read from.
    pub async fn next_event(&mut self) -> Option<(ClientEvent, BufferState)> {
        let ConnectionState::Connected(connection) = &mut self.connection else {
            return None;
        };
        let event = connection.next_event().await;
        if matches!(event, ClientEvent::Disconnected | ClientEvent::Error(_)) {
            self.connection = ConnectionState::Closed;
        }
        let state = self.controller.handle(event.clone());
        Some((event, state))
    }

    /// Whether auto-play should fire after `event`. A reply is played once,
    /// when its turn has ended and the buffer is playable, never mid-stream.
    pub fn auto_play_due(&self, event: &ClientEvent, state: BufferState) -> bool {
        self.config.auto_play && state == BufferState::Ready && event.ends_turn()
    }

    pub fn status(&self) -> &str {
        self.controller.status()
    }

    pub fn play(&mut self) -> Result<Played, PlaybackError> {
        let played = self.controller.play()?;
        info!(chunks = played.chunks, bytes = played.bytes, "Played reply audio");
        Ok(played)
    }

    pub async fn shutdown(&mut self) {
        if let ConnectionState::Connected(connection) = &mut self.connection {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection: {e}");
            }
        }
        self.connection = ConnectionState::Closed;
    }
}
