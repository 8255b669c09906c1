// Configuration for the speech upstream and the chunked stream

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// Sample rate of the raw `pcm` output format (16-bit mono, little endian).
pub const PCM_SAMPLE_RATE: u32 = 24_000;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    Aac,
    Flac,
    Wav,
    Pcm,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Opus => "opus",
            AudioFormat::Aac => "aac",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "pcm",
        }
    }

    /// MIME type of the assembled audio. Raw PCM is wrapped in a WAV
    /// container before playback, so it reports `audio/wav`.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Opus => "audio/ogg",
            AudioFormat::Aac => "audio/aac",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Wav | AudioFormat::Pcm => "audio/wav",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            AudioFormat::Opus => "ogg",
            AudioFormat::Pcm => "wav",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(AudioFormat::Mp3),
            "opus" => Ok(AudioFormat::Opus),
            "aac" => Ok(AudioFormat::Aac),
            "flac" => Ok(AudioFormat::Flac),
            "wav" => Ok(AudioFormat::Wav),
            "pcm" => Ok(AudioFormat::Pcm),
            other => Err(anyhow::anyhow!(
                "unsupported audio format '{other}' (expected mp3, opus, aac, flac, wav or pcm)"
            )),
        }
    }
}

/// Speech upstream settings: credentials, model, voice and output format.
#[derive(Clone)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub voice: String,
    pub format: AudioFormat,
    /// Speaking speed, 0.25 to 4.0. `None` leaves the upstream default.
    pub speed: Option<f32>,
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("format", &self.format)
            .field("speed", &self.speed)
            .finish()
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "tts-1".to_string(),
            voice: "nova".to_string(),
            format: AudioFormat::Mp3,
            speed: None,
        }
    }
}

impl SpeechConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let base_url = std::env::var("TTS_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let model = std::env::var("TTS_MODEL").unwrap_or(defaults.model);
        let voice = std::env::var("TTS_VOICE").unwrap_or(defaults.voice);

        let format = std::env::var("TTS_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.format);

        let speed = std::env::var("TTS_SPEED")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .map(|s| s.clamp(0.25, 4.0));

        Self {
            api_key,
            base_url,
            model,
            voice,
            format,
            speed,
        }
    }
}

/// Shape of the outbound chunk stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Maximum bytes per chunk; every chunk but the last is exactly this size.
    pub chunk_size: usize,
    /// Delay inserted between consecutive chunk writes.
    pub pacing: Duration,
    /// Upper bound on waiting for the upstream to open or yield more bytes.
    pub read_timeout: Option<Duration>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1048,
            pacing: Duration::from_millis(10),
            read_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_format_parsing() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!(" pcm ".parse::<AudioFormat>().unwrap(), AudioFormat::Pcm);
        assert!("ogg".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn test_pcm_is_played_as_wav() {
        assert_eq!(AudioFormat::Pcm.mime_type(), "audio/wav");
        assert_eq!(AudioFormat::Pcm.file_extension(), "wav");
        assert_eq!(AudioFormat::Opus.file_extension(), "ogg");
        assert_eq!(AudioFormat::Mp3.mime_type(), "audio/mpeg");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = SpeechConfig {
            api_key: Some("sk-secret".into()),
            ..SpeechConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("redacted"));
    }
}
