//! Config file parsing and merging.

mod error;
mod ini;
mod merge;
mod parser;

pub use error::ConfigError;
pub use ini::parse_ini;
pub use merge::deep_merge;
pub use parser::{ConfigParser, FormatParser, IniParser, TomlParser};
