//! Streaming synthesis helpers.
//!
//! The speech upstream hands back audio as a byte stream whose pieces have
//! whatever size the network produced. [`rechunk`] regroups those pieces into
//! fixed-size chunks without reordering, and [`SynthesisStreamer`] forwards the
//! chunks to a sink one at a time with a pacing delay between writes.
use std::{pin::Pin, sync::Arc};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::config::StreamSettings;

/// Ordered audio bytes as produced by a speech upstream.
pub type AudioByteStream = Pin<Box<dyn Stream<Item = anyhow::Result<Bytes>> + Send>>;

/// Text in, ordered byte stream out.
#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    async fn stream_speech(&self, text: &str) -> anyhow::Result<AudioByteStream>;
}

/// Destination for outbound audio chunks, typically a live connection.
#[async_trait]
pub trait ChunkSink: Send {
    async fn send_chunk(&mut self, chunk: Bytes) -> anyhow::Result<()>;
}

#[async_trait]
impl ChunkSink for Vec<Bytes> {
    async fn send_chunk(&mut self, chunk: Bytes) -> anyhow::Result<()> {
        self.push(chunk);
        Ok(())
    }
}

/// Result of streaming one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// The upstream stream ended normally and every chunk was written.
    Complete { chunks: usize, bytes: usize },
    /// The upstream failed to open or broke mid-stream. `chunks` may be zero.
    UpstreamFailed {
        chunks: usize,
        bytes: usize,
        error: String,
    },
    /// Writing to the sink failed; the connection should be considered gone.
    SinkClosed {
        chunks: usize,
        bytes: usize,
        error: String,
    },
}

impl SynthesisOutcome {
    pub fn chunks(&self) -> usize {
        match self {
            SynthesisOutcome::Complete { chunks, .. }
            | SynthesisOutcome::UpstreamFailed { chunks, .. }
            | SynthesisOutcome::SinkClosed { chunks, .. } => *chunks,
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            SynthesisOutcome::Complete { bytes, .. }
            | SynthesisOutcome::UpstreamFailed { bytes, .. }
            | SynthesisOutcome::SinkClosed { bytes, .. } => *bytes,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SynthesisOutcome::Complete { .. })
    }

    pub fn sink_closed(&self) -> bool {
        matches!(self, SynthesisOutcome::SinkClosed { .. })
    }
}

/// Regroup an ordered byte stream into chunks of exactly `chunk_size` bytes,
/// except for a shorter final chunk. An upstream error ends the stream; bytes
/// still waiting for a full chunk at that point are dropped.
pub fn rechunk<S>(source: S, chunk_size: usize) -> impl Stream<Item = anyhow::Result<Bytes>>
where
    S: Stream<Item = anyhow::Result<Bytes>>,
{
    let chunk_size = chunk_size.max(1);
    async_stream::try_stream! {
        futures::pin_mut!(source);
        let mut pending = BytesMut::with_capacity(chunk_size);
        while let Some(piece) = source.next().await {
            let mut piece = piece?;
            while !piece.is_empty() {
                let take = (chunk_size - pending.len()).min(piece.len());
                pending.extend_from_slice(&piece.split_to(take));
                if pending.len() == chunk_size {
                    yield pending.split().freeze();
                }
            }
        }
        if !pending.is_empty() {
            yield pending.split().freeze();
        }
    }
}

pub struct SynthesisStreamer {
    service: Arc<dyn SpeechSynthesisService>,
    settings: StreamSettings,
}

impl SynthesisStreamer {
    pub fn new(service: Arc<dyn SpeechSynthesisService>, settings: StreamSettings) -> Self {
        Self { service, settings }
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Stream speech for `text` into `sink`.
    ///
    /// Never returns an error: upstream failures and sink failures are
    /// reported through [`SynthesisOutcome`] together with how much audio made
    /// it out before the stop. Chunks already written are not retracted.
    pub async fn synthesize<S>(&self, text: &str, sink: &mut S) -> SynthesisOutcome
    where
        S: ChunkSink + ?Sized,
    {
        let source = match self.bounded(self.service.stream_speech(text)).await {
            Ok(source) => source,
            Err(e) => {
                error!("TTS conversion error: {e:#}");
                return SynthesisOutcome::UpstreamFailed {
                    chunks: 0,
                    bytes: 0,
                    error: format!("{e:#}"),
                };
            }
        };

        let chunks = rechunk(source, self.settings.chunk_size);
        futures::pin_mut!(chunks);

        let mut sent = 0usize;
        let mut bytes = 0usize;
        loop {
            let next = match self.settings.read_timeout {
                Some(limit) => match tokio::time::timeout(limit, chunks.next()).await {
                    Ok(next) => next,
                    Err(_) => Some(Err(anyhow::anyhow!(
                        "no audio from upstream within {}ms",
                        limit.as_millis()
                    ))),
                },
                None => chunks.next().await,
            };

            let chunk = match next {
                None => break,
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    error!(chunks = sent, bytes, "TTS conversion error: {e:#}");
                    return SynthesisOutcome::UpstreamFailed {
                        chunks: sent,
                        bytes,
                        error: format!("{e:#}"),
                    };
                }
            };

            if sent > 0 && !self.settings.pacing.is_zero() {
                tokio::time::sleep(self.settings.pacing).await;
            }

            let len = chunk.len();
            if let Err(e) = sink.send_chunk(chunk).await {
                warn!(chunks = sent, bytes, "Failed to send audio chunk: {e:#}");
                return SynthesisOutcome::SinkClosed {
                    chunks: sent,
                    bytes,
                    error: format!("{e:#}"),
                };
            }
            sent += 1;
            bytes += len;
            debug!(chunk = sent, len, "Sent audio chunk");
        }

        info!(chunks = sent, bytes, "Converted text to speech successfully");
        SynthesisOutcome::Complete { chunks: sent, bytes }
    }

    async fn bounded<F, T>(&self, fut: F) -> anyhow::Result<T>
    where
        F: std::future::Future<Output = anyhow::Result<T>>,
    {
        match self.settings.read_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                anyhow::anyhow!("speech upstream did not respond within {}ms", limit.as_millis())
            })?,
            None => fut.await,
        }
    }
}
