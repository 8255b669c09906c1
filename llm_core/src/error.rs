use thiserror::Error;

/// Why a completion request produced no usable reply.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("LLM response contained no reply")]
    EmptyResponse,

    #[error("LLM request timed out after {0} seconds")]
    Timeout(u64),

    #[error("LLM misconfigured: {0}")]
    Config(String),
}
