pub mod assembler;
pub mod cache;
pub mod config;
pub mod discovery;
mod error;

pub use assembler::{AssemblerBuilder, ConfigAssembler, Options};
pub use error::Error;
