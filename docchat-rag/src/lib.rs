//! # docchat-rag
//!
//! Retrieval-augmented generation over uploaded PDF documents.
//!
//! ## Overview
//!
//! The crate covers the whole ingest-and-answer path:
//!
//! - [`PdfLoader`] - page-by-page text extraction with `pdf-extract`
//! - [`RecursiveChunker`] / [`FixedSizeChunker`] - character-based splitting
//! - [`EmbeddingProvider`] - local `fastembed` models or OpenAI-compatible APIs
//! - [`InMemoryVectorStore`] - cosine similarity search
//! - [`RagPipeline`] - chunk → embed → store, embed → search
//! - [`RetrievalChain`] - "stuff" prompt answering with a [`ChatModel`](docchat_model::ChatModel)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docchat_rag::{DocumentLoader, FastEmbedProvider, PdfLoader, RagConfig, RetrievalChain};
//!
//! let pages = PdfLoader::new().load(path, "report.pdf")?;
//! let chain = RetrievalChain::from_documents(
//!     &pages,
//!     "report.pdf",
//!     RagConfig::default(),
//!     Arc::new(FastEmbedProvider::new()),
//!     model,
//! )
//! .await?;
//! let answer = chain.ask("What is the deadline?").await?;
//! ```
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `fastembed` | Local ONNX embeddings (default) |
//! | `openai` | OpenAI-compatible embeddings API |
//! | `full` | Everything |

pub mod chain;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod inmemory;
pub mod loader;
#[cfg(feature = "fastembed")]
pub mod local;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod vectorstore;

pub use chain::{Answer, RetrievalChain, stuff_prompt};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, chunker_for};
pub use config::{ChunkingStrategy, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, PdfLoader, pages_to_documents};
#[cfg(feature = "fastembed")]
pub use local::{DEFAULT_EMBEDDING_MODEL, FastEmbedProvider};
pub use mock::MockEmbeddingProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use vectorstore::VectorStore;
