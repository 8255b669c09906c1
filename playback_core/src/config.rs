// Client configuration, read from the environment

use std::path::PathBuf;
use std::time::Duration;

use protocol_core::WS_PATH;
use tts_core::AudioFormat;

use crate::buffer::ExpectedCount;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    pub expected: ExpectedCount,
    pub conversation_id: String,
    pub format: AudioFormat,
    pub playback_dir: PathBuf,
    pub auto_play: bool,
    /// Quiet period after which a playable reply is auto-played when the
    /// relay sends no end-of-stream frames.
    pub auto_play_idle: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: format!("ws://localhost:8000{WS_PATH}"),
            expected: ExpectedCount::default(),
            conversation_id: uuid::Uuid::new_v4().to_string(),
            format: AudioFormat::default(),
            playback_dir: PathBuf::from("playback"),
            auto_play: false,
            auto_play_idle: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let relay_url = std::env::var("RELAY_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.relay_url);

        // A positive number, or "declared" to follow the server's end-of-stream frames
        let expected = std::env::var("EXPECTED_CHUNKS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.expected);

        let conversation_id = std::env::var("CONVERSATION_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.conversation_id);

        let format = std::env::var("TTS_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.format);

        let playback_dir = std::env::var("PLAYBACK_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.playback_dir);

        let auto_play = std::env::var("AUTO_PLAY")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.auto_play);

        let auto_play_idle = std::env::var("AUTO_PLAY_IDLE_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.auto_play_idle);

        Self {
            relay_url,
            expected,
            conversation_id,
            format,
            playback_dir,
            auto_play,
            auto_play_idle,
        }
    }
}
