//! OpenAI-compatible chat-completion client

use crate::config::CompletionConfig;
use crate::error::CompletionError;
use crate::prompt::{render, PromptInputs};
use crate::role::RoleTemplate;
use crate::service::CompletionService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Completion service speaking the `/chat/completions` wire format
#[derive(Debug, Clone)]
pub struct HttpCompletionService {
    client: Client,
    config: CompletionConfig,
    api_key: Option<String>,
}

impl HttpCompletionService {
    /// Build a client, reading the API key from `config.api_key_env`
    ///
    /// A missing key is allowed so local endpoints work without one.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: CompletionConfig) -> Result<Self, CompletionError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::debug!(var = %config.api_key_env, "no API key set, sending unauthenticated requests");
        }
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit key
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn with_api_key(
        config: CompletionConfig,
        api_key: Option<String>,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CompletionError::Config(e.to_string()))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    fn build_request(&self, role: RoleTemplate, inputs: &PromptInputs) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: render(role.template(), inputs),
            }],
            max_tokens: Some(self.config.max_tokens),
            temperature: self.config.temperature,
        }
    }

    fn map_send_error(&self, e: &reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout {
                secs: self.config.timeout_secs,
            }
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn invoke(
        &self,
        role: RoleTemplate,
        inputs: &PromptInputs,
    ) -> Result<String, CompletionError> {
        let request = self.build_request(role, inputs);
        let url = self.config.chat_url();
        tracing::debug!(%role, %url, prompt_bytes = request.messages[0].content.len(), "sending completion");

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;
        let text = extract_text(body)?;
        tracing::debug!(%role, response_bytes = text.len(), "completion received");
        Ok(text)
    }
}

fn extract_text(response: ChatResponse) -> Result<String, CompletionError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(CompletionError::EmptyResponse)
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::keys;
    use pretty_assertions::assert_eq;

    fn service() -> HttpCompletionService {
        let config = CompletionConfig::new()
            .with_model("test-model")
            .with_max_tokens(128)
            .with_temperature(0.5);
        HttpCompletionService::with_api_key(config, None).unwrap()
    }

    #[test]
    fn request_body_shape() {
        let inputs = PromptInputs::new().with(keys::INSTRUCTIONS, "write hello world");
        let request = service().build_request(RoleTemplate::Generate, &inputs);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "test-model");
        assert_eq!(json["max_tokens"], 128);
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["messages"][0]["role"], "user");
        let content = json["messages"][0]["content"].as_str().unwrap();
        assert!(content.contains("Instructions: write hello world"));
        assert!(!content.contains("{instructions}"));
    }

    #[test]
    fn temperature_omitted_when_unset() {
        let svc = HttpCompletionService::with_api_key(CompletionConfig::default(), None).unwrap();
        let json = serde_json::to_value(svc.build_request(RoleTemplate::Review, &PromptInputs::new())).unwrap();
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn extract_first_choice() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"FILE: a.py"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "FILE: a.py");
    }

    #[test]
    fn extract_rejects_empty() {
        let none: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_text(none), Err(CompletionError::EmptyResponse)));

        let blank: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        assert!(matches!(extract_text(blank), Err(CompletionError::EmptyResponse)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let config = CompletionConfig::new()
            .with_endpoint("http://127.0.0.1:9")
            .with_timeout_secs(2);
        let svc = HttpCompletionService::with_api_key(config, Some("k".into())).unwrap();
        let err = svc
            .invoke(RoleTemplate::Design, &PromptInputs::new())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
