use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    #[error("cache I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to encode config snapshot: {0}")]
    Encode(#[source] toml::ser::Error),

    #[error("cache entry '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    #[error("invalid cache key '{0}' (allowed: [A-Za-z0-9_])")]
    InvalidKey(String),

    #[error("unknown cache backend '{0}'")]
    UnknownBackend(String),

    #[error("invalid options for {backend} cache backend: {message}")]
    InvalidOptions {
        backend: &'static str,
        message: String,
    },

    #[error("automatic serialization is disabled; config tables cannot be stored")]
    SerializationDisabled,
}
