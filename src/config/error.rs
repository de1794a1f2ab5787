use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("syntax error in '{path}' at line {line}: {message}")]
    IniSyntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("section '{section}' in '{path}' extends unknown section '{parent}'")]
    UnknownParentSection {
        path: PathBuf,
        section: String,
        parent: String,
    },

    #[error("failed to deserialize options: {0}")]
    DeserializeError(#[source] toml::de::Error),

    #[error("no parser registered for config file '{0}'")]
    UnsupportedFormat(PathBuf),
}
