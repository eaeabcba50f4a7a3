//! Retrieval-augmented question answering over one indexed document.
//!
//! A [`RetrievalChain`] binds a populated [`RagPipeline`] collection to a
//! [`ChatModel`]. Each question retrieves the closest chunks, "stuffs" them
//! into a single prompt and asks the model once.

use std::sync::Arc;

use docchat_model::{ChatModel, ChatRequest, Message};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::chunking::chunker_for;
use crate::config::RagConfig;
use crate::document::{Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;
use crate::pipeline::RagPipeline;

const QA_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Render the question-answering prompt for `question` over `context`.
pub fn stuff_prompt(context: &[SearchResult], question: &str) -> String {
    let context =
        context.iter().map(|result| result.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("{QA_PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchResult>,
}

/// Question answering bound to one collection and one chat model.
pub struct RetrievalChain {
    pipeline: RagPipeline,
    collection: String,
    model: Arc<dyn ChatModel>,
    chunk_count: usize,
}

impl std::fmt::Debug for RetrievalChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalChain")
            .field("collection", &self.collection)
            .field("model", &self.model.name())
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

impl RetrievalChain {
    /// Wrap a pipeline whose `collection` is already populated.
    pub fn new(
        pipeline: RagPipeline,
        collection: impl Into<String>,
        model: Arc<dyn ChatModel>,
        chunk_count: usize,
    ) -> Self {
        Self { pipeline, collection: collection.into(), model, chunk_count }
    }

    /// Index `documents` into a fresh in-memory store and bind the result to
    /// `model`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if no chunk could be produced or if
    /// embedding or indexing fails.
    pub async fn from_documents(
        documents: &[Document],
        collection: &str,
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        let chunker = chunker_for(config.chunking, config.chunk_size, config.chunk_overlap);
        let pipeline = RagPipeline::builder()
            .config(config)
            .embedding_provider(embedder)
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .chunker(chunker)
            .build()?;

        pipeline.create_collection(collection).await?;
        let chunks = pipeline.ingest_batch(collection, documents).await?;
        if chunks.is_empty() {
            return Err(RagError::PipelineError(format!(
                "document '{collection}' produced no chunks"
            )));
        }

        info!(collection, chunk_count = chunks.len(), model = model.name(), "retrieval chain ready");
        Ok(Self::new(pipeline, collection, model, chunks.len()))
    }

    /// Number of chunks in the index.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Answer `question` from the indexed document.
    #[instrument(skip_all, fields(collection = %self.collection))]
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let sources = self.pipeline.query(&self.collection, question).await?;
        let prompt = stuff_prompt(&sources, question);

        let response = self
            .model
            .complete(ChatRequest::new(vec![Message::user(prompt)]))
            .await
            .map_err(|e| {
                error!(model = self.model.name(), error = %e, "chat model call failed");
                RagError::from(e)
            })?;

        info!(source_count = sources.len(), answer_len = response.content.len(), "answered question");
        Ok(Answer { text: response.content, sources })
    }
}
