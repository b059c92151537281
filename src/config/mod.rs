//! Run configuration: loading, duration parsing, and validation.
mod loader;
mod parse;
pub mod types;


pub use loader::load_config;
pub use types::{ConfigFile, DurationValue, SearchConfig};

#[cfg(test)]
pub(crate) use loader::load_config_file;
pub(crate) use parse::parse_duration_value;
