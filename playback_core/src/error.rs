use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback not ready: {received} chunk(s) buffered")]
    NotReady { received: usize },

    #[error("failed to prepare audio: {0}")]
    Encode(anyhow::Error),

    #[error("audio sink failed: {0}")]
    Sink(anyhow::Error),
}
