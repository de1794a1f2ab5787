use std::path::{Path, PathBuf};

use toml::Value;

use super::{ConfigAssembler, Options};
use crate::cache::{
    open_backend, validate_key, BackendKind, CacheBackend, CachePolicy, ConfigCache,
    MasterFilesMode,
};
use crate::config::{ConfigParser, FormatParser};
use crate::discovery::{compile_pattern, FileDiscovery, RegexFileScanner};
use crate::Error;

/// Builder for a [`ConfigAssembler`].
///
/// Starts from [`Options::default()`]; every setter overrides one field.
/// File discovery runs once, in [`build`](Self::build).
///
/// ## Example
///
/// ```no_run
/// use dragon_cfgcache::ConfigAssembler;
///
/// let assembler = ConfigAssembler::builder()
///     .root_path("config")
///     .file_pattern(r"^.*\.ini$")
///     .cache_key("app_config")
///     .cache_backend_option("cache_dir", "/var/cache/app")
///     .property("deployment", "eu-west")
///     .build()?;
///
/// let config = assembler.get()?;
/// # Ok::<(), dragon_cfgcache::Error>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct AssemblerBuilder {
    options: Options,
    discovery: Option<Box<dyn FileDiscovery>>,
    parser: Option<Box<dyn ConfigParser>>,
    backend: Option<Box<dyn CacheBackend>>,
}

impl AssemblerBuilder {
    /// Starts from a complete options record.
    pub fn from_options(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Sets the directory scanned for config files.
    pub fn root_path(mut self, path: impl AsRef<Path>) -> Self {
        self.options.root_path = path.as_ref().to_path_buf();
        self
    }

    /// Regex matched against file names (not full paths).
    pub fn file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.options.file_pattern = pattern.into();
        self
    }

    /// Sets the key the merged snapshot is cached under.
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.options.cache_key = key.into();
        self
    }

    /// Selects the backend; its options are reset to empty.
    pub fn cache_backend(mut self, kind: BackendKind) -> Self {
        self.options.cache_backend = kind;
        self.options.cache_backend_options.clear();
        self
    }

    /// Sets one option of the selected backend (e.g. `cache_dir`).
    pub fn cache_backend_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options
            .cache_backend_options
            .insert(name.into(), value.into());
        self
    }

    /// Shortcut for the file backend in `dir`.
    pub fn cache_dir(self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.cache_backend(BackendKind::File)
            .cache_backend_option("cache_dir", dir.display().to_string())
    }

    /// Sets whether any or every modified file invalidates the snapshot.
    pub fn master_files_mode(mut self, mode: MasterFilesMode) -> Self {
        self.options.master_files_mode = mode;
        self
    }

    /// Fails the build when the root directory cannot be read.
    pub fn require_root(mut self, yes: bool) -> Self {
        self.options.require_root = yes;
        self
    }

    /// Attaches free-form metadata, readable later through
    /// [`ConfigAssembler::property`].
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.properties.insert(name.into(), value.into());
        self
    }

    /// Replaces the default [`RegexFileScanner`].
    pub fn discovery(mut self, discovery: impl FileDiscovery + 'static) -> Self {
        self.discovery = Some(Box::new(discovery));
        self
    }

    /// Replaces the default [`FormatParser`].
    pub fn parser(mut self, parser: impl ConfigParser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Uses an already opened backend instead of building one from the options.
    pub fn backend(mut self, backend: impl CacheBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Discovers the config files and opens the cache.
    ///
    /// An unreadable root yields an assembler with no files unless
    /// [`require_root`](Self::require_root) is set.
    pub fn build(self) -> Result<ConfigAssembler, Error> {
        let options = self.options;
        validate_key(&options.cache_key)?;
        let pattern = compile_pattern(&options.file_pattern)?;

        let discovery = self
            .discovery
            .unwrap_or_else(|| Box::new(RegexFileScanner::new()));
        let files = match discovery.search(&options.root_path, &pattern) {
            Ok(files) => files,
            Err(e) if !options.require_root => {
                tracing::warn!("{}; continuing without config files", e);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let backend = match self.backend {
            Some(backend) => backend,
            None => open_backend(options.cache_backend, &options.cache_backend_options)?,
        };
        let cache = ConfigCache::new(
            backend,
            CachePolicy {
                master_files: files.clone(),
                master_files_mode: options.master_files_mode,
                automatic_serialization: true,
                lifetime: None,
            },
        );

        tracing::debug!(
            "config assembler ready: {} file(s), cache '{}' at {}",
            files.len(),
            options.cache_key,
            cache.backend().location()
        );

        Ok(ConfigAssembler {
            options,
            files,
            parser: self.parser.unwrap_or_else(|| Box::new(FormatParser)),
            cache,
        })
    }
}
