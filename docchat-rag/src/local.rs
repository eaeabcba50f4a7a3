//! Local embedding provider backed by `fastembed` (ONNX Runtime).
//!
//! This module is only available when the `fastembed` feature is enabled.
//! The model files are downloaded from Hugging Face on first use and cached
//! on disk; the loaded model is shared by every subsequent call.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default model: `sentence-transformers/all-MiniLM-L6-v2`.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

const PROVIDER: &str = "fastembed";

/// Names accepted by [`FastEmbedProvider::with_model`].
const KNOWN_MODELS: &[&str] = &[
    "sentence-transformers/all-MiniLM-L6-v2",
    "sentence-transformers/all-MiniLM-L12-v2",
    "BAAI/bge-small-en-v1.5",
    "BAAI/bge-base-en-v1.5",
];

fn resolve_model(name: &str) -> Option<(EmbeddingModel, usize)> {
    let resolved = match name {
        "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
            (EmbeddingModel::AllMiniLML6V2, 384)
        }
        "sentence-transformers/all-MiniLM-L12-v2" | "all-MiniLM-L12-v2" => {
            (EmbeddingModel::AllMiniLML12V2, 384)
        }
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
        _ => return None,
    };
    Some(resolved)
}

fn embedding_error(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: PROVIDER.into(), message: message.into() }
}

/// An [`EmbeddingProvider`] running a sentence-transformer model in-process.
///
/// Inference is CPU-bound and runs on tokio's blocking thread pool. The model
/// is loaded lazily by the first call to [`embed`](EmbeddingProvider::embed)
/// or [`embed_batch`](EmbeddingProvider::embed_batch).
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::FastEmbedProvider;
///
/// let provider = FastEmbedProvider::new();
/// let vectors = provider.embed_batch(&["first", "second"]).await?;
/// assert_eq!(vectors[0].len(), 384);
/// ```
pub struct FastEmbedProvider {
    model_name: String,
    model: EmbeddingModel,
    dimensions: usize,
    cache_dir: Option<PathBuf>,
    engine: OnceCell<Arc<Mutex<TextEmbedding>>>,
}

impl FastEmbedProvider {
    /// Create a provider for `sentence-transformers/all-MiniLM-L6-v2`.
    pub fn new() -> Self {
        Self {
            model_name: DEFAULT_EMBEDDING_MODEL.to_string(),
            model: EmbeddingModel::AllMiniLML6V2,
            dimensions: 384,
            cache_dir: None,
            engine: OnceCell::new(),
        }
    }

    /// Create a provider for a named model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the model is not supported.
    pub fn with_model(name: &str) -> Result<Self> {
        let (model, dimensions) = resolve_model(name).ok_or_else(|| {
            RagError::ConfigError(format!(
                "unsupported embedding model '{name}' (supported: {})",
                KNOWN_MODELS.join(", ")
            ))
        })?;
        Ok(Self { model_name: name.to_string(), model, dimensions, ..Self::new() })
    }

    /// Store downloaded model files under `dir` instead of the default cache.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// The configured model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn engine(&self) -> Result<Arc<Mutex<TextEmbedding>>> {
        self.engine
            .get_or_try_init(|| async {
                info!(provider = PROVIDER, model = %self.model_name, "loading embedding model");
                let model = self.model.clone();
                let cache_dir = self.cache_dir.clone();

                let loaded = tokio::task::spawn_blocking(move || {
                    let mut options = InitOptions::new(model).with_show_download_progress(false);
                    if let Some(dir) = cache_dir {
                        options = options.with_cache_dir(dir);
                    }
                    TextEmbedding::try_new(options)
                })
                .await
                .map_err(|e| embedding_error(format!("model loading task failed: {e}")))?
                .map_err(|e| {
                    error!(provider = PROVIDER, error = %e, "failed to load embedding model");
                    embedding_error(format!("failed to load model '{}': {e}", self.model_name))
                })?;

                Ok::<_, RagError>(Arc::new(Mutex::new(loaded)))
            })
            .await
            .cloned()
    }
}

impl Default for FastEmbedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| embedding_error("model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model_name,
            "embedding batch"
        );

        let engine = self.engine().await?;
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();

        let embeddings = tokio::task::spawn_blocking(move || {
            let mut engine =
                engine.lock().map_err(|_| "embedding model lock poisoned".to_string())?;
            engine.embed(owned, None).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| embedding_error(format!("embedding task failed: {e}")))?
        .map_err(|message| {
            error!(provider = PROVIDER, error = %message, "embedding failed");
            embedding_error(message)
        })?;

        if embeddings.len() != texts.len() {
            return Err(embedding_error(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn resolves_short_and_full_model_names() {
        assert_eq!(resolve_model("all-MiniLM-L6-v2").map(|(_, d)| d), Some(384));
        assert_eq!(
            resolve_model("sentence-transformers/all-MiniLM-L6-v2").map(|(_, d)| d),
            Some(384)
        );
        assert_eq!(resolve_model("BAAI/bge-base-en-v1.5").map(|(_, d)| d), Some(768));
        assert!(resolve_model("text-embedding-3-small").is_none());
    }

    #[test]
    fn unknown_model_is_a_config_error() {
        let err = FastEmbedProvider::with_model("nomic-embed").err().expect("error");
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn default_provider_reports_minilm_dimensions() {
        let provider = FastEmbedProvider::default();
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.model_name(), DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn cache_dir_survives_model_selection() {
        let provider = FastEmbedProvider::with_model("bge-small-en-v1.5")
            .unwrap()
            .with_cache_dir("/tmp/docchat-models");
        assert_eq!(provider.cache_dir.as_deref(), Some(Path::new("/tmp/docchat-models")));
        assert_eq!(provider.dimensions(), 384);
    }

    #[tokio::test]
    async fn empty_batch_skips_model_loading() {
        let provider = FastEmbedProvider::new();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
        assert!(provider.engine.get().is_none());
    }
}
