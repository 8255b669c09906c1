//! Shared fixtures: scripted upstreams and a relay bound to an ephemeral port.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use llm_core::{CompletionAdapter, CompletionError, CompletionService};
use protocol_core::ServerEvent;
use server::metrics::RelayMetrics;
use server::{build_router, AppState, ServerConfig, SessionEngine};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tts_core::{AudioByteStream, SpeechSynthesisService, SynthesisStreamer};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Replies "echo: <message>", or fails every call.
pub struct FakeCompletion {
    pub fail: bool,
    pub seen: Mutex<Vec<String>>,
}

impl FakeCompletion {
    pub fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, user_message: &str) -> Result<String, CompletionError> {
        self.seen.lock().unwrap().push(user_message.to_string());
        if self.fail {
            return Err(CompletionError::Status {
                status: 503,
                body: "upstream unavailable".into(),
            });
        }
        Ok(format!("echo: {user_message}"))
    }
}

/// The audio a [`FakeSpeech`] produces for `len` bytes.
pub fn fake_audio(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

/// Speaks `total` bytes in uneven 700-byte pieces, optionally breaking off
/// after `fail_after` bytes.
pub struct FakeSpeech {
    pub total: usize,
    pub fail_after: Option<usize>,
    pub seen: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn new(total: usize, fail_after: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            total,
            fail_after,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SpeechSynthesisService for FakeSpeech {
    async fn stream_speech(&self, text: &str) -> anyhow::Result<AudioByteStream> {
        self.seen.lock().unwrap().push(text.to_string());
        let audio = fake_audio(self.total);
        let limit = self.fail_after.unwrap_or(self.total);
        let mut pieces: Vec<anyhow::Result<Bytes>> = audio[..limit]
            .chunks(700)
            .map(|piece| Ok(Bytes::copy_from_slice(piece)))
            .collect();
        if self.fail_after.is_some() {
            pieces.push(Err(anyhow::anyhow!("speech stream reset")));
        }
        Ok(Box::pin(futures_util::stream::iter(pieces)))
    }
}

pub struct Relay {
    pub addr: SocketAddr,
    pub metrics: Arc<RelayMetrics>,
}

impl Relay {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn connect(&self) -> Client {
        let (client, _) = connect_async(self.ws_url()).await.unwrap();
        client
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        chunk_delay_ms: 1,
        rate_limit_per_minute: 6000,
        ..ServerConfig::default()
    }
}

pub async fn spawn_relay(
    config: ServerConfig,
    completion: Arc<FakeCompletion>,
    speech: Arc<FakeSpeech>,
) -> Relay {
    let metrics = Arc::new(RelayMetrics::new());
    let engine = SessionEngine::new(
        CompletionAdapter::new(completion),
        SynthesisStreamer::new(speech, config.stream_settings()),
        config.session_options(),
        metrics.clone(),
    );
    let app = build_router(AppState {
        engine: Arc::new(engine),
        metrics: metrics.clone(),
        config,
    })
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Relay { addr, metrics }
}

pub async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::text(text.to_string())).await.unwrap();
}

/// One turn as seen by a client.
#[derive(Debug, Default)]
pub struct Turn {
    pub events: Vec<ServerEvent>,
    pub chunks: Vec<Bytes>,
}

impl Turn {
    pub fn reply(&self) -> Option<&ServerEvent> {
        self.events
            .iter()
            .find(|e| matches!(e, ServerEvent::Reply { .. }))
    }

    pub fn audio_end(&self) -> Option<&ServerEvent> {
        self.events
            .iter()
            .find(|e| matches!(e, ServerEvent::AudioEnd { .. }))
    }

    pub fn audio(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }
}

/// Read frames until the turn's `audio_end` event.
pub async fn read_terminated_turn(client: &mut Client) -> Turn {
    let mut turn = Turn::default();
    while let Some(frame) = client.next().await {
        match frame.unwrap() {
            Message::Text(text) => {
                let event = ServerEvent::parse(text.as_str()).expect("server sent unknown event");
                let done = matches!(event, ServerEvent::AudioEnd { .. });
                turn.events.push(event);
                if done {
                    break;
                }
            }
            Message::Binary(data) => turn.chunks.push(data),
            _ => {}
        }
    }
    turn
}

/// Router over scripted upstreams, for requests sent without a socket.
pub fn relay_router(config: ServerConfig) -> (axum::Router, Arc<RelayMetrics>) {
    let metrics = Arc::new(RelayMetrics::new());
    let engine = SessionEngine::new(
        CompletionAdapter::new(FakeCompletion::new(false)),
        SynthesisStreamer::new(FakeSpeech::new(1048, None), config.stream_settings()),
        config.session_options(),
        metrics.clone(),
    );
    let app = build_router(AppState {
        engine: Arc::new(engine),
        metrics: metrics.clone(),
        config,
    })
    .unwrap();
    (app, metrics)
}
