use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use thiserror::Error;

/// Top-level error type for the dragon-cfgcache library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("config discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("config cache error: {0}")]
    Cache(#[from] CacheError),
}
