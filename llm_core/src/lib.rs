//! Completion side of the relay: one user message in, one reply out.

mod client;
mod config;
mod error;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{error, info};

pub use client::LlmClient;
pub use config::{LlmConfig, LlmProvider};
pub use error::CompletionError;

/// Reply used whenever the completion upstream cannot produce one.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process your request at the moment.";

/// Text in, text out language-model endpoint.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, user_message: &str) -> Result<String, CompletionError>;
}

/// What the adapter produced for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Reply(String),
    /// The upstream failed; `reply` is [`FALLBACK_REPLY`].
    Fallback { reply: String, cause: String },
}

impl CompletionOutcome {
    /// The text to speak, whichever way it was obtained.
    pub fn text(&self) -> &str {
        match self {
            CompletionOutcome::Reply(reply) => reply,
            CompletionOutcome::Fallback { reply, .. } => reply,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CompletionOutcome::Fallback { .. })
    }

    pub fn into_text(self) -> String {
        match self {
            CompletionOutcome::Reply(reply) => reply,
            CompletionOutcome::Fallback { reply, .. } => reply,
        }
    }
}

/// Total wrapper around a [`CompletionService`]: never returns an error.
#[derive(Clone)]
pub struct CompletionAdapter {
    service: Arc<dyn CompletionService>,
    timeout: Option<Duration>,
}

impl CompletionAdapter {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn complete(&self, user_message: &str) -> CompletionOutcome {
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.service.complete(user_message))
                .await
                .unwrap_or(Err(CompletionError::Timeout(limit.as_secs()))),
            None => self.service.complete(user_message).await,
        };

        match result {
            Ok(reply) => {
                info!("LLM response: {reply}");
                CompletionOutcome::Reply(reply)
            }
            Err(e) => {
                error!("LLM API error: {e}");
                CompletionOutcome::Fallback {
                    reply: FALLBACK_REPLY.to_string(),
                    cause: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        async fn complete(&self, user_message: &str) -> Result<String, CompletionError> {
            Ok(format!("echo: {user_message}"))
        }
    }

    struct Failing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionService for Failing {
        async fn complete(&self, _user_message: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CompletionError::Status {
                status: 503,
                body: "overloaded".into(),
            })
        }
    }

    struct Slow;

    #[async_trait]
    impl CompletionService for Slow {
        async fn complete(&self, _user_message: &str) -> Result<String, CompletionError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("too late".into())
        }
    }

    #[tokio::test]
    async fn test_reply_passes_through() {
        let adapter = CompletionAdapter::new(Arc::new(Echo));
        let outcome = adapter.complete("hello").await;
        assert_eq!(outcome, CompletionOutcome::Reply("echo: hello".into()));
        assert!(!outcome.is_fallback());
    }

    #[tokio::test]
    async fn test_failure_becomes_apology_without_retry() {
        let service = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let adapter = CompletionAdapter::new(service.clone());

        let outcome = adapter.complete("hello").await;

        assert!(outcome.is_fallback());
        assert_eq!(outcome.text(), FALLBACK_REPLY);
        if let CompletionOutcome::Fallback { cause, .. } = &outcome {
            assert!(cause.contains("503"));
        }
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_apology() {
        let adapter = CompletionAdapter::new(Arc::new(Slow)).with_timeout(Duration::from_secs(2));
        let outcome = adapter.complete("hello").await;
        assert_eq!(outcome.into_text(), FALLBACK_REPLY);
    }
}
