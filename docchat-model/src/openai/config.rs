//! Configuration for [`OpenAIClient`](super::OpenAIClient).

use std::time::Duration;

/// Base URL of Mistral's OpenAI-compatible API.
pub const MISTRAL_API_BASE: &str = "https://api.mistral.ai/v1";

/// Model used when none is configured.
pub const MISTRAL_DEFAULT_MODEL: &str = "open-mistral-7b";

/// Sampling temperature applied when a request does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Connection settings for an OpenAI-compatible chat completions API.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub model: String,
    /// Overrides the OpenAI base URL. `None` targets `api.openai.com`.
    pub base_url: Option<String>,
    pub organization_id: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Whole-request timeout for each HTTP call. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl OpenAIConfig {
    /// Configuration for the OpenAI API.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            organization_id: None,
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: None,
            timeout: None,
        }
    }

    /// Configuration for an OpenAI-compatible API at `base_url`.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self { base_url: Some(base_url.into()), ..Self::new(api_key, model) }
    }

    /// Configuration for Mistral's hosted API with `open-mistral-7b`.
    pub fn mistral(api_key: impl Into<String>) -> Self {
        Self::compatible(api_key, MISTRAL_API_BASE, MISTRAL_DEFAULT_MODEL)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mistral_preset_targets_mistral_api() {
        let config = OpenAIConfig::mistral("key");
        assert_eq!(config.base_url.as_deref(), Some(MISTRAL_API_BASE));
        assert_eq!(config.model, MISTRAL_DEFAULT_MODEL);
        assert_eq!(config.temperature, Some(DEFAULT_TEMPERATURE));
        assert!(config.timeout.is_none());
    }

    #[test]
    fn builder_methods_override_preset() {
        let config = OpenAIConfig::mistral("key")
            .with_model("mistral-large")
            .with_temperature(0.0)
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.model, "mistral-large");
        assert_eq!(config.temperature, Some(0.0));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
