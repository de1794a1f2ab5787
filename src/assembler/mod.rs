//! Discovering, merging and caching config files as one snapshot.

mod builder;
mod options;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::PoisonError;
use std::time::SystemTime;

use toml::{Table, Value};

use crate::cache::{rebuild_lock, ConfigCache};
use crate::config::{deep_merge, ConfigError, ConfigParser};
use crate::Error;

pub use builder::AssemblerBuilder;
pub use options::{Options, DEFAULT_CACHE_KEY};

/// Assembles one config table out of every file found under a root directory.
///
/// Files are discovered once, when the assembler is built. Each call to
/// [`get`](Self::get) returns the cached snapshot while no discovered file has
/// been modified since it was written; otherwise all files are parsed again,
/// merged in discovery order (later files win, nested tables merge key by
/// key) and the result replaces the cached snapshot.
///
/// ## Example
///
/// ```no_run
/// use dragon_cfgcache::{ConfigAssembler, Options};
///
/// let assembler = ConfigAssembler::new(Options {
///     root_path: "config".into(),
///     ..Options::default()
/// })?;
///
/// let config = assembler.get()?;
/// let host = config["db"]["host"].as_str();
/// # Ok::<(), dragon_cfgcache::Error>(())
/// ```
#[derive(Debug)]
pub struct ConfigAssembler {
    options: Options,
    files: Vec<PathBuf>,
    parser: Box<dyn ConfigParser>,
    cache: ConfigCache,
}

impl ConfigAssembler {
    /// Builds an assembler from a complete options record.
    pub fn new(options: Options) -> Result<Self, Error> {
        AssemblerBuilder::from_options(options).build()
    }

    /// Creates a new builder starting from default options.
    pub fn builder() -> AssemblerBuilder {
        AssemblerBuilder::default()
    }

    /// Returns the merged configuration.
    ///
    /// Nothing is written to the cache when a file fails to parse.
    pub fn get(&self) -> Result<Table, Error> {
        let key = &self.options.cache_key;
        if let Some(config) = self.cache.load(key)? {
            tracing::debug!("config '{}' served from cache", key);
            return Ok(config);
        }

        let lock = rebuild_lock(&self.cache.backend().location(), key);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Another caller may have rebuilt it while we waited.
        if let Some(config) = self.cache.load(key)? {
            tracing::debug!("config '{}' rebuilt concurrently", key);
            return Ok(config);
        }

        let started = SystemTime::now();
        let merged = self.merge_files()?;
        self.cache.save_as_of(key, &merged, started)?;

        tracing::info!(
            "config '{}' rebuilt from {} file(s)",
            key,
            self.files.len()
        );
        Ok(merged)
    }

    fn merge_files(&self) -> Result<Table, ConfigError> {
        let mut merged = Table::new();
        for path in &self.files {
            let parsed = self.parser.parse(path)?;
            deep_merge(&mut merged, parsed);
        }
        Ok(merged)
    }

    /// Drops the cached snapshot so the next [`get`](Self::get) rebuilds it.
    pub fn invalidate(&self) -> Result<bool, Error> {
        Ok(self.cache.remove(&self.options.cache_key)?)
    }

    /// Returns the options the assembler was built with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Discovered files, in merge order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Returns the cache holding the merged snapshot.
    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    /// Returns a metadata property, if set.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.options.properties.get(name)
    }

    /// Sets a metadata property, returning the previous value.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.options.properties.insert(name.into(), value.into())
    }

    /// Returns all metadata properties.
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.options.properties
    }
}
