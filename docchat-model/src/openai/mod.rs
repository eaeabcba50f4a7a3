//! OpenAI-compatible chat completions client.
//!
//! Works with the OpenAI API itself and with any service exposing the same
//! `/chat/completions` contract. Mistral is the default target:
//!
//! ```rust,ignore
//! use docchat_model::openai::{OpenAIClient, OpenAIConfig};
//!
//! // Mistral's hosted API with the default `open-mistral-7b` model
//! let model = OpenAIClient::new(OpenAIConfig::mistral(api_key))?;
//!
//! // Any other compatible endpoint
//! let local = OpenAIClient::new(OpenAIConfig::compatible(
//!     "unused",
//!     "http://localhost:11434/v1",
//!     "llama3.2",
//! ))?;
//! ```

mod client;
mod config;
mod convert;

pub use client::OpenAIClient;
pub use config::{DEFAULT_TEMPERATURE, MISTRAL_API_BASE, MISTRAL_DEFAULT_MODEL, OpenAIConfig};
