//! Playback controller: status display plus the Play control.

use bytes::Bytes;
use protocol_core::ServerEvent;
use tracing::{debug, warn};
use tts_core::{pcm16_to_wav, AudioFormat, PCM_SAMPLE_RATE};

use crate::buffer::{BufferState, ChunkBuffer, ExpectedCount};
use crate::error::PlaybackError;
use crate::sink::AudioSink;

/// Something the connection reported to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected,
    Text(String),
    Binary(Bytes),
    Disconnected,
    Error(String),
}

impl ClientEvent {
    /// True for the server's end-of-stream frame, which closes a turn.
    pub fn ends_turn(&self) -> bool {
        match self {
            ClientEvent::Text(text) => {
                matches!(ServerEvent::parse(text), Some(ServerEvent::AudioEnd { .. }))
            }
            _ => false,
        }
    }
}

/// Result of a successful Play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Played {
    pub chunks: usize,
    pub bytes: usize,
}

pub struct PlaybackController<S: AudioSink> {
    buffer: ChunkBuffer,
    format: AudioFormat,
    sink: S,
    status: String,
}

impl<S: AudioSink> PlaybackController<S> {
    pub fn new(expected: ExpectedCount, format: AudioFormat, sink: S) -> Self {
        Self {
            buffer: ChunkBuffer::new(expected),
            format,
            sink,
            status: String::new(),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn buffer(&self) -> &ChunkBuffer {
        &self.buffer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn play_enabled(&self) -> bool {
        self.buffer.play_enabled()
    }

    pub fn handle(&mut self, event: ClientEvent) -> BufferState {
        match event {
            ClientEvent::Connected => self.status = "WebSocket connected".to_string(),
            ClientEvent::Disconnected => self.status = "WebSocket disconnected".to_string(),
            ClientEvent::Error(e) => {
                warn!("WebSocket error: {e}");
                self.status = "WebSocket error".to_string();
            }
            ClientEvent::Binary(chunk) => {
                let state = self.buffer.push(chunk);
                debug!(received = self.buffer.received(), ?state, "Audio chunk buffered");
                return state;
            }
            ClientEvent::Text(text) => match ServerEvent::parse(&text) {
                Some(event) => {
                    self.status = event.status_line();
                    if let ServerEvent::AudioEnd { chunks, complete, .. } = event {
                        return self.buffer.end_of_stream(chunks, complete);
                    }
                }
                None => self.status = format!("Received message: {text}"),
            },
        }
        self.buffer.state()
    }

    /// Concatenate everything buffered and hand it to the sink.
    ///
    /// The buffer is cleared once play is accepted, even if the sink fails.
    pub fn play(&mut self) -> Result<Played, PlaybackError> {
        let audio = self.buffer.take_audio()?;

        let bytes = match self.format {
            AudioFormat::Pcm => {
                pcm16_to_wav(&audio.data, PCM_SAMPLE_RATE).map_err(PlaybackError::Encode)?
            }
            _ => audio.data.to_vec(),
        };

        self.sink
            .play(&bytes, self.format)
            .map_err(PlaybackError::Sink)?;

        Ok(Played {
            chunks: audio.chunks,
            bytes: audio.data.len(),
        })
    }
}
