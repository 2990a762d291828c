//! Error types for completion calls

/// Completion failure
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// Request could not be sent or the connection failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Request exceeded the configured timeout
    #[error("completion timed out after {secs}s")]
    Timeout {
        /// Configured timeout
        secs: u64,
    },

    /// Response body could not be decoded
    #[error("invalid response: {0}")]
    Decode(String),

    /// Response carried no text
    #[error("completion returned no content")]
    EmptyResponse,

    /// Client could not be configured
    #[error("configuration error: {0}")]
    Config(String),
}

impl CompletionError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) | Self::EmptyResponse | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(CompletionError::Timeout { secs: 60 }.is_retryable());
        assert!(CompletionError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(CompletionError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!CompletionError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!CompletionError::EmptyResponse.is_retryable());
    }
}
