//! Session protocol engine.
//!
//! One [`Session`] per connection. The engine reads text frames, decodes each
//! into an [`InboundMessage`], asks the completion adapter for a reply and
//! streams the reply's speech back as binary frames, strictly in production
//! order. Only a broken transport ends the loop; every other failure is
//! logged and the session waits for the next frame.

use std::sync::Arc;
use std::time::Instant;

use llm_core::{CompletionAdapter, CompletionOutcome};
use protocol_core::{ServerEvent, StreamFraming};
use tracing::{error, info, info_span, warn, Instrument};
use tts_core::{SynthesisOutcome, SynthesisStreamer};
use uuid::Uuid;

use crate::error::SessionError;
use crate::metrics::RelayMetrics;
use crate::protocol::{decode_inbound, DecodeSource, InboundMessage};
use crate::transport::{BinaryFrames, InboundFrame, Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    state: SessionState,
    turns: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Connecting,
            turns: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    fn open(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Open;
        }
    }

    fn begin_close(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Closing;
        }
    }

    fn finish_close(&mut self) {
        self.state = SessionState::Closed;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub framing: StreamFraming,
    /// Send the reply as a text event before its audio.
    pub send_reply_text: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            framing: StreamFraming::Terminated,
            send_reply_text: true,
        }
    }
}

/// Everything that happened for one inbound message.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub inbound: InboundMessage,
    pub completion: CompletionOutcome,
    pub synthesis: SynthesisOutcome,
}

/// Final state of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub turns: u64,
    pub state: SessionState,
}

pub struct SessionEngine {
    completion: CompletionAdapter,
    streamer: SynthesisStreamer,
    options: SessionOptions,
    metrics: Arc<RelayMetrics>,
}

impl SessionEngine {
    pub fn new(
        completion: CompletionAdapter,
        streamer: SynthesisStreamer,
        options: SessionOptions,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            completion,
            streamer,
            options,
            metrics,
        }
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Drive one connection until the peer disconnects or the transport breaks.
    pub async fn run<T>(&self, transport: &mut T) -> SessionSummary
    where
        T: Transport + ?Sized,
    {
        let session = Session::new();
        let span = info_span!("session", session_id = %session.id());
        self.drive(session, transport).instrument(span).await
    }

    async fn drive<T>(&self, mut session: Session, transport: &mut T) -> SessionSummary
    where
        T: Transport + ?Sized,
    {
        session.open();
        self.metrics.session_opened();
        info!("WebSocket connection accepted");

        loop {
            let raw = match transport.recv().await {
                None | Some(Ok(InboundFrame::Close)) => {
                    info!("Client disconnected");
                    break;
                }
                Some(Err(e)) => {
                    warn!("Connection lost: {e}");
                    break;
                }
                Some(Ok(InboundFrame::Text(text))) => text,
                Some(Ok(InboundFrame::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!(len = data.len(), "Ignoring non-UTF-8 binary frame");
                        continue;
                    }
                },
            };

            match self.handle_message(&mut session, transport, &raw).await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    warn!("Ending session: {e}");
                    break;
                }
                Err(e) => error!("Unhandled error: {e}"),
            }
        }

        session.begin_close();
        transport.close().await;
        session.finish_close();
        self.metrics.session_closed();
        info!(turns = session.turns(), "Session closed");

        SessionSummary {
            id: session.id(),
            turns: session.turns(),
            state: session.state(),
        }
    }

    /// One request/response cycle: decode, complete, speak.
    pub async fn handle_message<T>(
        &self,
        session: &mut Session,
        transport: &mut T,
        raw: &str,
    ) -> Result<TurnReport, SessionError>
    where
        T: Transport + ?Sized,
    {
        let started = Instant::now();
        let inbound = decode_inbound(raw);
        session.turns += 1;
        info!(
            conversation_id = %inbound.conversation_id,
            "User message: {}",
            inbound.message
        );

        let completion = self.completion.complete(&inbound.message).await;
        self.metrics.record_message(
            inbound.source == DecodeSource::RawFallback,
            completion.is_fallback(),
        );

        if self.options.send_reply_text {
            let event = ServerEvent::Reply {
                conversation_id: inbound.conversation_id.clone(),
                text: completion.text().to_string(),
                fallback: completion.is_fallback(),
            };
            transport.send_text(serde_json::to_string(&event)?).await?;
        }

        let synthesis = self
            .streamer
            .synthesize(completion.text(), &mut BinaryFrames(&mut *transport))
            .await;
        self.metrics
            .record_stream(synthesis.chunks(), synthesis.bytes(), synthesis.is_complete());

        if let SynthesisOutcome::SinkClosed { error, .. } = &synthesis {
            return Err(TransportError(error.clone()).into());
        }

        if self.options.framing == StreamFraming::Terminated {
            let event = ServerEvent::AudioEnd {
                chunks: synthesis.chunks(),
                bytes: synthesis.bytes(),
                complete: synthesis.is_complete(),
            };
            transport.send_text(serde_json::to_string(&event)?).await?;
        }

        self.metrics
            .turn_latency
            .record(started.elapsed().as_millis() as u64);

        Ok(TurnReport {
            inbound,
            completion,
            synthesis,
        })
    }
}
