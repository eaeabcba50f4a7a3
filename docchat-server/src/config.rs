//! Environment-driven configuration for the docchat service.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use docchat_model::openai::{DEFAULT_TEMPERATURE, MISTRAL_API_BASE, MISTRAL_DEFAULT_MODEL};
use docchat_rag::{ChunkingStrategy, RagConfig, RagError};
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const API_KEY_VAR: &str = "MISTRAL_API_KEY";

/// Embedding model used with the OpenAI-compatible embedder.
pub const DEFAULT_REMOTE_EMBEDDING_MODEL: &str = "mistral-embed";
pub const DEFAULT_REMOTE_EMBEDDING_DIMENSIONS: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },

    #[error(transparent)]
    Rag(#[from] RagError),
}

/// Which embedding backend indexes uploaded documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmbedderKind {
    /// In-process `fastembed` model.
    #[default]
    FastEmbed,
    /// OpenAI-compatible `/embeddings` endpoint at the configured API base.
    OpenAI,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmbedderConfig {
    pub kind: EmbedderKind,
    /// Model name; `None` selects the backend default.
    pub model: Option<String>,
    /// Vector size for custom remote models.
    pub dimensions: usize,
    /// Where `fastembed` keeps downloaded model files; `None` uses its default.
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::FastEmbed,
            model: None,
            dimensions: DEFAULT_REMOTE_EMBEDDING_DIMENSIONS,
            cache_dir: None,
        }
    }
}

#[derive(Clone)]
pub struct ChatModelConfig {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub api_key: Option<String>,
}

impl Default for ChatModelConfig {
    fn default() -> Self {
        Self {
            api_base: MISTRAL_API_BASE.to_string(),
            model: MISTRAL_DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            api_key: None,
        }
    }
}

impl fmt::Debug for ChatModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatModelConfig")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Complete service configuration.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rag: RagConfig,
    pub embedder: EmbedderConfig,
    pub chat: ChatModelConfig,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps variable names to
    /// values. Unset and blank variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let server = ServerConfig {
            host: get("DOCCHAT_HOST").unwrap_or(defaults.server.host),
            port: parse(&get, "DOCCHAT_PORT")?.unwrap_or(defaults.server.port),
            max_upload_bytes: parse(&get, "DOCCHAT_MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.server.max_upload_bytes),
        };

        let chunking = match get("DOCCHAT_CHUNKER") {
            Some(value) => value.parse::<ChunkingStrategy>()?,
            None => ChunkingStrategy::default(),
        };
        let rag = RagConfig::builder()
            .chunk_size(parse(&get, "DOCCHAT_CHUNK_SIZE")?.unwrap_or(defaults.rag.chunk_size))
            .chunk_overlap(
                parse(&get, "DOCCHAT_CHUNK_OVERLAP")?.unwrap_or(defaults.rag.chunk_overlap),
            )
            .top_k(parse(&get, "DOCCHAT_TOP_K")?.unwrap_or(defaults.rag.top_k))
            .chunking(chunking)
            .build()?;

        let kind = match get("DOCCHAT_EMBEDDER").map(|v| v.to_ascii_lowercase()) {
            None => EmbedderKind::FastEmbed,
            Some(v) if v == "fastembed" || v == "local" => EmbedderKind::FastEmbed,
            Some(v) if v == "openai" || v == "remote" => EmbedderKind::OpenAI,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    key: "DOCCHAT_EMBEDDER",
                    value: v,
                    reason: "expected 'fastembed' or 'openai'".to_string(),
                });
            }
        };
        let embedder = EmbedderConfig {
            kind,
            model: get("DOCCHAT_EMBEDDING_MODEL"),
            dimensions: parse(&get, "DOCCHAT_EMBEDDING_DIMENSIONS")?
                .unwrap_or(defaults.embedder.dimensions),
            cache_dir: get("DOCCHAT_EMBEDDING_CACHE_DIR").map(PathBuf::from),
        };

        let temperature: f32 =
            parse(&get, "DOCCHAT_TEMPERATURE")?.unwrap_or(defaults.chat.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid {
                key: "DOCCHAT_TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be within [0.0, 2.0]".to_string(),
            });
        }
        let chat = ChatModelConfig {
            api_base: get("DOCCHAT_API_BASE").unwrap_or(defaults.chat.api_base),
            model: get("DOCCHAT_MODEL").unwrap_or(defaults.chat.model),
            temperature,
            request_timeout: parse(&get, "DOCCHAT_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.chat.request_timeout),
            api_key: get(API_KEY_VAR),
        };

        Ok(Self { server, rag, embedder, chat })
    }
}

fn parse<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    get(key)
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_hosted_setup() {
        let config = config(&[]).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.chunk_overlap, 200);
        assert_eq!(config.rag.top_k, 4);
        assert_eq!(config.embedder.kind, EmbedderKind::FastEmbed);
        assert!(config.embedder.cache_dir.is_none());
        assert_eq!(config.chat.api_base, "https://api.mistral.ai/v1");
        assert_eq!(config.chat.model, "open-mistral-7b");
        assert!((config.chat.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.chat.api_key.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config(&[
            ("DOCCHAT_PORT", "9100"),
            ("DOCCHAT_CHUNK_SIZE", "500"),
            ("DOCCHAT_CHUNK_OVERLAP", "50"),
            ("DOCCHAT_CHUNKER", "fixed"),
            ("DOCCHAT_EMBEDDER", "openai"),
            ("DOCCHAT_EMBEDDING_CACHE_DIR", "/var/cache/docchat"),
            ("DOCCHAT_REQUEST_TIMEOUT_SECS", "5"),
            ("MISTRAL_API_KEY", " secret "),
        ])
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunking, ChunkingStrategy::FixedSize);
        assert_eq!(config.embedder.kind, EmbedderKind::OpenAI);
        assert_eq!(config.embedder.cache_dir, Some(PathBuf::from("/var/cache/docchat")));
        assert_eq!(config.chat.request_timeout, Duration::from_secs(5));
        assert_eq!(config.chat.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config(&[("DOCCHAT_PORT", "  "), ("MISTRAL_API_KEY", "")]).unwrap();
        assert_eq!(config.server.port, 8000);
        assert!(config.chat.api_key.is_none());
    }

    #[test]
    fn invalid_values_are_reported_with_their_key() {
        let err = config(&[("DOCCHAT_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("DOCCHAT_PORT"));
        assert!(config(&[("DOCCHAT_EMBEDDER", "word2vec")]).is_err());
        assert!(config(&[("DOCCHAT_TEMPERATURE", "3.5")]).is_err());
    }

    #[test]
    fn inconsistent_chunking_is_rejected() {
        let err = config(&[("DOCCHAT_CHUNK_SIZE", "100"), ("DOCCHAT_CHUNK_OVERLAP", "100")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Rag(_)));
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let config = config(&[("MISTRAL_API_KEY", "sk-very-secret")]).unwrap();
        assert!(!format!("{config:?}").contains("sk-very-secret"));
    }
}
