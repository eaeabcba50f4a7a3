//! Shared state: the services used to index uploads and the currently
//! loaded document.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use docchat_model::ChatModel;
use docchat_model::openai::{OpenAIClient, OpenAIConfig};
use docchat_rag::{
    DocumentLoader, EmbeddingProvider, FastEmbedProvider, OpenAIEmbeddingProvider, PdfLoader,
    RagConfig, RetrievalChain,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, warn};

use crate::config::{
    API_KEY_VAR, AppConfig, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_REMOTE_EMBEDDING_DIMENSIONS,
    DEFAULT_REMOTE_EMBEDDING_MODEL, EmbedderKind,
};
use crate::protocol::DocumentInfo;

/// An indexed upload ready to answer questions.
#[derive(Debug)]
pub struct LoadedDocument {
    pub name: String,
    pub pages: usize,
    pub chain: RetrievalChain,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedDocument {
    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            name: self.name.clone(),
            pages: self.pages,
            chunks: self.chain.chunk_count(),
            loaded_at: self.loaded_at,
        }
    }
}

/// Holds at most one [`LoadedDocument`].
///
/// Uploads are serialised through [`begin_upload`](DocumentSlot::begin_upload).
/// Readers clone the current `Arc`, so a chat started before a swap finishes
/// against the document it started with.
#[derive(Debug, Default, Clone)]
pub struct DocumentSlot {
    current: Arc<RwLock<Option<Arc<LoadedDocument>>>>,
    upload: Arc<Mutex<()>>,
}

impl DocumentSlot {
    pub async fn current(&self) -> Option<Arc<LoadedDocument>> {
        self.current.read().await.clone()
    }

    /// Wait for any other upload to finish. Hold the guard until the new
    /// document is installed.
    pub async fn begin_upload(&self) -> OwnedMutexGuard<()> {
        self.upload.clone().lock_owned().await
    }

    /// Replace the current document, returning the previous one.
    pub async fn install(&self, document: LoadedDocument) -> Option<Arc<LoadedDocument>> {
        let document = Arc::new(document);
        self.current.write().await.replace(document)
    }
}

/// Everything an upload needs to build a [`RetrievalChain`].
pub struct Services {
    pub loader: Arc<dyn DocumentLoader>,
    /// `None` when remote embeddings are selected without an API key.
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    /// `None` when no API key is configured; uploads then fail.
    pub chat_model: Option<Arc<dyn ChatModel>>,
    pub rag: RagConfig,
}

impl Services {
    /// Build the production services described by `config`.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let embedder: Option<Arc<dyn EmbeddingProvider>> = match config.embedder.kind {
            EmbedderKind::FastEmbed => {
                let mut provider = match &config.embedder.model {
                    Some(model) => FastEmbedProvider::with_model(model)?,
                    None => FastEmbedProvider::new(),
                };
                if let Some(dir) = &config.embedder.cache_dir {
                    provider = provider.with_cache_dir(dir);
                }
                info!(
                    model = provider.model_name(),
                    cache_dir = ?config.embedder.cache_dir,
                    "using local embeddings"
                );
                Some(Arc::new(provider))
            }
            EmbedderKind::OpenAI => match &config.chat.api_key {
                Some(api_key) => Some(remote_embedder(config, api_key)?),
                None => {
                    warn!("{API_KEY_VAR} is not set; remote embeddings are unavailable");
                    None
                }
            },
        };

        let chat_model: Option<Arc<dyn ChatModel>> = match &config.chat.api_key {
            Some(api_key) => {
                let client = OpenAIClient::new(
                    OpenAIConfig::compatible(
                        api_key.clone(),
                        config.chat.api_base.clone(),
                        config.chat.model.clone(),
                    )
                    .with_temperature(config.chat.temperature)
                    .with_timeout(config.chat.request_timeout),
                )?;
                Some(Arc::new(client))
            }
            None => {
                warn!("{API_KEY_VAR} is not set; uploads will fail until it is configured");
                None
            }
        };

        Ok(Self {
            loader: Arc::new(PdfLoader::new()),
            embedder,
            chat_model,
            rag: config.rag.clone(),
        })
    }
}

fn remote_embedder(
    config: &AppConfig,
    api_key: &str,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let model = config
        .embedder
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_REMOTE_EMBEDDING_MODEL.to_string());
    let dimensions = if config.embedder.model.is_some() {
        config.embedder.dimensions
    } else {
        DEFAULT_REMOTE_EMBEDDING_DIMENSIONS
    };
    info!(%model, api_base = %config.chat.api_base, "using remote embeddings");
    Ok(Arc::new(OpenAIEmbeddingProvider::new(api_key)?.with_endpoint(
        config.chat.api_base.clone(),
        model,
        dimensions,
    )))
}

#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentSlot,
    pub services: Arc<Services>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            documents: DocumentSlot::default(),
            services: Arc::new(services),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}
