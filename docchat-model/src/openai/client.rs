//! OpenAI client implementation.

use async_openai::{
    Client, config::OpenAIConfig as AsyncOpenAIConfig, types::CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, error};

use super::config::OpenAIConfig;
use super::convert;
use crate::error::{ModelError, Result};
use crate::model::{ChatModel, ChatRequest, ChatResponse};

/// Chat client for the OpenAI API and OpenAI-compatible APIs.
pub struct OpenAIClient {
    client: Client<AsyncOpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAIClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelError::Config("API key must not be empty".into()));
        }

        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(org_id) = &config.organization_id {
            openai_config = openai_config.with_org_id(org_id);
        }

        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            http = http.timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Client::with_config(openai_config).with_http_client(http),
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Create a client for an OpenAI-compatible API.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Self::new(OpenAIConfig::compatible(api_key, base_url, model))
    }

    fn request_error(&self, message: String) -> ModelError {
        ModelError::Request { model: self.model.clone(), message }
    }
}

#[async_trait]
impl ChatModel for OpenAIClient {
    fn name(&self) -> &str {
        &self.model
    }

    #[allow(deprecated)] // `max_tokens` is what non-OpenAI providers accept
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let messages = request
            .messages
            .iter()
            .map(convert::to_openai_message)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| self.request_error(format!("invalid message: {e}")))?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model).messages(messages);

        if let Some(temp) = request.temperature.or(self.temperature) {
            request_builder.temperature(temp);
        }
        if let Some(max_tokens) = request.max_tokens.or(self.max_tokens) {
            request_builder.max_tokens(max_tokens);
        }

        let openai_request = request_builder
            .build()
            .map_err(|e| self.request_error(format!("failed to build request: {e}")))?;

        debug!(model = %self.model, message_count = request.messages.len(), "sending chat completion");

        let response = self.client.chat().create(openai_request).await.map_err(|e| {
            error!(model = %self.model, error = %e, "chat completion failed");
            self.request_error(format!("API error: {e}"))
        })?;

        let usage = response.usage.as_ref().map(convert::from_openai_usage);
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ModelError::EmptyResponse { model: self.model.clone() })?;

        if let Some(usage) = usage {
            debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion finished"
            );
        }

        Ok(ChatResponse { content, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let result = OpenAIClient::new(OpenAIConfig::mistral("  "));
        assert!(matches!(result, Err(ModelError::Config(_))));
    }

    #[test]
    fn reports_configured_model_name() {
        let client = OpenAIClient::new(OpenAIConfig::mistral("key").with_model("mistral-small"))
            .expect("client");
        assert_eq!(client.name(), "mistral-small");
    }
}
