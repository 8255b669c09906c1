use crate::config::ServerConfig;
use crate::error::ApiError;

/// Maximum conversation id length
const MAX_CONVERSATION_ID_LENGTH: usize = 128;
/// Largest chunk a client is expected to buffer in one frame
const MAX_CHUNK_SIZE: usize = 1024 * 1024;
/// Upper bound on the inter-chunk pacing delay
const MAX_CHUNK_DELAY_MS: u64 = 1000;

/// Validate a client supplied conversation id
pub fn validate_conversation_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() {
        return Err(ApiError::InvalidInput(
            "Conversation id cannot be empty".to_string(),
        ));
    }
    if id.len() > MAX_CONVERSATION_ID_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Conversation id too long (max {} characters)",
            MAX_CONVERSATION_ID_LENGTH
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::InvalidInput(format!(
            "Invalid conversation id: {}. Allowed characters: A-Z, a-z, 0-9, '-', '_'",
            id
        )));
    }
    Ok(())
}

/// Validate stream and limit settings before the server starts
pub fn validate_server_config(config: &ServerConfig) -> Result<(), ApiError> {
    if config.chunk_size == 0 || config.chunk_size > MAX_CHUNK_SIZE {
        return Err(ApiError::InvalidConfig(format!(
            "CHUNK_SIZE_BYTES must be between 1 and {} (got {})",
            MAX_CHUNK_SIZE, config.chunk_size
        )));
    }
    if config.chunk_delay_ms > MAX_CHUNK_DELAY_MS {
        return Err(ApiError::InvalidConfig(format!(
            "CHUNK_DELAY_MS must be at most {} (got {})",
            MAX_CHUNK_DELAY_MS, config.chunk_delay_ms
        )));
    }
    if config.rate_limit_per_minute == 0 {
        return Err(ApiError::InvalidConfig(
            "RATE_LIMIT_PER_MINUTE must be positive".to_string(),
        ));
    }
    if config.upstream_timeout_secs == 0 {
        return Err(ApiError::InvalidConfig(
            "UPSTREAM_TIMEOUT_SECS must be positive".to_string(),
        ));
    }
    Ok(())
}
