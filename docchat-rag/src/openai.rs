//! Embedding provider for OpenAI-compatible `/embeddings` APIs.
//!
//! This module is only available when the `openai` feature is enabled.
//! Besides OpenAI itself it targets any service exposing the same contract,
//! such as Mistral's `mistral-embed`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "openai-compatible";

/// Per-request timeout for embedding calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Mistral's API, embedding model and its dimensionality.
const MISTRAL_API_BASE: &str = "https://api.mistral.ai/v1";
const MISTRAL_EMBED_MODEL: &str = "mistral-embed";
const MISTRAL_EMBED_DIMENSIONS: usize = 1024;

fn embedding_error(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
}

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings API.
///
/// Uses `reqwest` to call the `{base_url}/embeddings` endpoint directly.
///
/// # Configuration
///
/// - `base_url` – defaults to `https://api.mistral.ai/v1`.
/// - `model` – defaults to `mistral-embed`.
/// - `dimensions` – vector size `model` returns; 1024 for `mistral-embed`.
///
/// All three change together through [`with_endpoint`](Self::with_endpoint).
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new(std::env::var("MISTRAL_API_KEY")?)?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for Mistral's `mistral-embed` model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(embedding_error("API key must not be empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| embedding_error(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: MISTRAL_API_BASE.into(),
            model: MISTRAL_EMBED_MODEL.into(),
            dimensions: MISTRAL_EMBED_DIMENSIONS,
        })
    }

    /// Point the provider at another OpenAI-compatible API.
    ///
    /// `dimensions` must match what `model` returns.
    pub fn with_endpoint(
        mut self,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull the human-readable message out of an error body, if it has one.
fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

/// Put embeddings back in input order; the API tags each with its index.
fn into_ordered(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(embedding_error(format!("expected {expected} embeddings, got {}", data.len())));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| embedding_error("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let request_body = EmbeddingRequest { model: &self.model, input: texts };

        let response = self
            .client
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                embedding_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(provider = PROVIDER, %status, "API error");
            return Err(embedding_error(format!("API returned {status}: {detail}")));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            embedding_error(format!("failed to parse response: {e}"))
        })?;

        into_ordered(body.data, texts.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        assert!(OpenAIEmbeddingProvider::new("").is_err());
    }

    #[test]
    fn defaults_to_mistral_embed() {
        let provider = OpenAIEmbeddingProvider::new("key").unwrap();
        assert_eq!(provider.embeddings_url(), "https://api.mistral.ai/v1/embeddings");
        assert_eq!(provider.dimensions(), 1024);
    }

    #[test]
    fn error_detail_prefers_the_api_message() {
        let body = r#"{"error":{"message":"invalid model","type":"invalid_request_error"}}"#;
        assert_eq!(error_detail(body.to_string()), "invalid model");
        assert_eq!(error_detail("Bad Gateway".to_string()), "Bad Gateway");
    }

    #[test]
    fn embeddings_are_returned_in_input_order() {
        let data = vec![
            EmbeddingData { index: 1, embedding: vec![1.0] },
            EmbeddingData { index: 0, embedding: vec![0.0] },
        ];
        assert_eq!(into_ordered(data, 2).unwrap(), vec![vec![0.0], vec![1.0]]);
        assert!(into_ordered(Vec::new(), 1).is_err());
    }

    #[test]
    fn custom_endpoint_strips_trailing_slash() {
        let provider = OpenAIEmbeddingProvider::new("key")
            .unwrap()
            .with_endpoint("http://localhost:8080/v1/", "bge-small", 384);
        assert_eq!(provider.embeddings_url(), "http://localhost:8080/v1/embeddings");
        assert_eq!(provider.dimensions(), 384);
    }
}
