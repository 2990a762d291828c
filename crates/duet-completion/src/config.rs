//! Completion client configuration

use std::time::Duration;

/// Environment variable read for the API key unless configured otherwise
pub const DEFAULT_API_KEY_ENV: &str = "DUET_API_KEY";

/// Settings for [`HttpCompletionService`](crate::HttpCompletionService)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended)
    pub endpoint: String,
    /// Model name sent with every request
    pub model: String,
    /// Environment variable holding the bearer token
    pub api_key_env: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum tokens per completion
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl CompletionConfig {
    /// Create with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set API key variable
    #[must_use]
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }

    /// Set timeout
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full chat-completions URL
    #[must_use]
    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 60,
            max_tokens: 2048,
            temperature: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CompletionConfig::default();
        assert_eq!(config.api_key_env, "DUET_API_KEY");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.max_tokens, 2048);
        assert!(config.temperature.is_none());
    }

    #[test]
    fn chat_url_trims_trailing_slash() {
        let config = CompletionConfig::new().with_endpoint("http://localhost:11434/v1/");
        assert_eq!(config.chat_url(), "http://localhost:11434/v1/chat/completions");
    }
}
