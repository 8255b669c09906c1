use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LlmConfig;
use crate::error::CompletionError;
use crate::CompletionService;

/// Structure for the OpenAI Chat API request
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    n: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u16>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Structure for the OpenAI Chat API response
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI and OpenAI-compatible servers.
pub struct LlmClient {
    api_key: Option<String>,
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u16>,
    system_prompt: Option<String>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, CompletionError> {
        if config.provider.requires_api_key() && config.api_key.is_none() {
            return Err(CompletionError::Config(
                "OPENAI_API_KEY must be set in the environment".into(),
            ));
        }
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            api_key: config.api_key,
            client: builder.build()?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    /// Send a chat prompt and return the first response
    async fn complete(&self, user_message: &str) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message { role: "system", content: prompt });
        }
        messages.push(Message { role: "user", content: user_message });

        let req_body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            n: 1,
            max_tokens: self.max_tokens,
        };

        let mut request = self.client.post(&self.endpoint).json(&req_body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response = response.json::<ChatResponse>().await?;
        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)?;

        info!(reply_len = reply.len(), "LLM response received");
        Ok(reply)
    }
}
