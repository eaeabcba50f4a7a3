//! # docchat-model
//!
//! Chat model integrations for docchat.
//!
//! ## Overview
//!
//! This crate defines the [`ChatModel`] trait used by the retrieval chain and
//! ships two implementations:
//!
//! - [`OpenAIClient`] - any OpenAI-compatible chat completions API
//!   (Mistral, OpenAI, vLLM, Ollama, ...)
//! - [`MockChatModel`] - scripted model for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docchat_model::openai::{OpenAIClient, OpenAIConfig};
//!
//! let model = OpenAIClient::new(OpenAIConfig::mistral(
//!     std::env::var("MISTRAL_API_KEY").unwrap(),
//! ))?;
//! let answer = model.complete(ChatRequest::new(vec![Message::user("Hello")])).await?;
//! ```
//!
//! ## Supported Models
//!
//! ### Mistral
//! | Model | Description |
//! |-------|-------------|
//! | `open-mistral-7b` | Small open-weight model (default) |
//! | `mistral-medium` | Balanced speed/capability |
//! | `mistral-large` | Most capable model |

pub mod error;
pub mod mock;
pub mod model;
#[cfg(feature = "openai")]
pub mod openai;

pub use error::{ModelError, Result};
pub use mock::MockChatModel;
pub use model::{ChatModel, ChatRequest, ChatResponse, Message, Role, Usage};
#[cfg(feature = "openai")]
pub use openai::{OpenAIClient, OpenAIConfig};
