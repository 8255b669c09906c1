// Configuration constants for the server

use std::time::Duration;

use protocol_core::{StreamFraming, DEFAULT_CHUNK_SIZE};
use tts_core::StreamSettings;

use crate::session::SessionOptions;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub upstream_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub framing: StreamFraming,
    pub send_reply_text: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            rate_limit_per_minute: 60,
            request_timeout_secs: 60,
            upstream_timeout_secs: 120,
            cors_allowed_origins: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay_ms: 10,
            framing: StreamFraming::Terminated,
            send_reply_text: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let rate_limit_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_per_minute);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let upstream_timeout_secs = std::env::var("UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.upstream_timeout_secs);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            });

        let chunk_size = std::env::var("CHUNK_SIZE_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.chunk_size);

        let chunk_delay_ms = std::env::var("CHUNK_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.chunk_delay_ms);

        let framing = std::env::var("STREAM_FRAMING")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.framing);

        let send_reply_text = std::env::var("SEND_REPLY_TEXT")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(defaults.send_reply_text);

        Self {
            port,
            rate_limit_per_minute,
            request_timeout_secs,
            upstream_timeout_secs,
            cors_allowed_origins,
            chunk_size,
            chunk_delay_ms,
            framing,
            send_reply_text,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            chunk_size: self.chunk_size,
            pacing: Duration::from_millis(self.chunk_delay_ms),
            read_timeout: Some(self.upstream_timeout()),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            framing: self.framing,
            send_reply_text: self.send_reply_text,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
