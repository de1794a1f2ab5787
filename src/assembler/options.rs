use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml::{Table, Value};

use crate::cache::{BackendKind, MasterFilesMode};
use crate::config::ConfigError;
use crate::discovery::DEFAULT_FILE_PATTERN;

pub const DEFAULT_CACHE_KEY: &str = "config";

/// Settings for a [`ConfigAssembler`](super::ConfigAssembler).
///
/// Every field has a default, so an options document only needs the keys it
/// changes:
///
/// ```toml
/// root_path = "config"
/// file_pattern = '^.*\.ini$'
/// cache_key = "app_config"
/// cache_backend = "file"
///
/// [cache_backend_options]
/// cache_dir = "/var/cache/app"
///
/// # Anything else is kept as a property.
/// deployment = "eu-west"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Directory scanned for config files.
    pub root_path: PathBuf,
    /// Regex matched against each file name.
    pub file_pattern: String,
    /// Key the merged snapshot is cached under.
    pub cache_key: String,
    pub cache_backend: BackendKind,
    pub cache_backend_options: Table,
    pub master_files_mode: MasterFilesMode,
    /// Fail construction when `root_path` cannot be read instead of
    /// continuing with no files.
    pub require_root: bool,
    /// Free-form metadata, separate from the fields above.
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl Default for Options {
    fn default() -> Self {
        let mut cache_backend_options = Table::new();
        cache_backend_options.insert(
            "cache_dir".to_string(),
            Value::String(std::env::temp_dir().display().to_string()),
        );

        Self {
            root_path: PathBuf::from("./"),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            cache_backend: BackendKind::default(),
            cache_backend_options,
            master_files_mode: MasterFilesMode::default(),
            require_root: false,
            properties: BTreeMap::new(),
        }
    }
}

impl Options {
    /// Parses options from a TOML document, filling in defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::DeserializeError)
    }

    /// Loads options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
