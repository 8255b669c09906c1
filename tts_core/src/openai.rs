use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::{AudioFormat, SpeechConfig};
use crate::stream::{AudioByteStream, SpeechSynthesisService};

/// Structure for the OpenAI speech API request
#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
}

/// Speech upstream backed by `POST {base_url}/audio/speech`.
pub struct OpenAiSpeechClient {
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
    voice: String,
    format: AudioFormat,
    speed: Option<f32>,
}

impl OpenAiSpeechClient {
    /// Create a new client. Fails when no API key is configured.
    pub fn new(config: SpeechConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY must be set for speech synthesis"))?;
        Ok(Self {
            api_key,
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model,
            voice: config.voice,
            format: config.format,
            speed: config.speed,
        })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.base_url)
    }
}

#[async_trait]
impl SpeechSynthesisService for OpenAiSpeechClient {
    async fn stream_speech(&self, text: &str) -> anyhow::Result<AudioByteStream> {
        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: self.format.as_str(),
            speed: self.speed,
        };

        debug!(
            voice = %self.voice,
            model = %self.model,
            text_len = text.len(),
            "Starting TTS stream"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("speech API error {status}: {body}");
        }

        Ok(Box::pin(
            response.bytes_stream().map(|piece| piece.map_err(anyhow::Error::from)),
        ))
    }
}
