//! Config file parsers.

use std::path::Path;

use toml::Table;

use super::ini::parse_ini;
use super::ConfigError;

/// Turns one config file into a (possibly nested) table.
pub trait ConfigParser: Send + Sync + std::fmt::Debug {
    fn parse(&self, path: &Path) -> Result<Table, ConfigError>;
}

/// Parser for sectioned `key = value` files. See [`crate::config::parse_ini`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IniParser;

impl ConfigParser for IniParser {
    fn parse(&self, path: &Path) -> Result<Table, ConfigError> {
        let contents = read_config_file(path)?;
        parse_ini(&contents, path)
    }
}

/// Parser for TOML files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn parse(&self, path: &Path) -> Result<Table, ConfigError> {
        let contents = read_config_file(path)?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Picks a parser from the file extension (`.ini`, `.toml`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatParser;

impl ConfigParser for FormatParser {
    fn parse(&self, path: &Path) -> Result<Table, ConfigError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "ini" => IniParser.parse(path),
            "toml" => TomlParser.parse(path),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}
