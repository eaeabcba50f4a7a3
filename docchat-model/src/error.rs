//! Error types for the `docchat-model` crate.

use thiserror::Error;

/// Errors that can occur when talking to a chat model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The client could not be configured.
    #[error("Model configuration error: {0}")]
    Config(String),

    /// The request could not be built or sent, or the API rejected it.
    #[error("Model request failed ({model}): {message}")]
    Request {
        /// The model the request was addressed to.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// The API answered without any generated content.
    #[error("Model returned an empty response ({model})")]
    EmptyResponse {
        /// The model that produced the empty response.
        model: String,
    },
}

/// A convenience result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
