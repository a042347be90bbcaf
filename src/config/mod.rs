// Configuration management module
// TOML settings for the model service, chunking and retrieval

pub mod settings;


pub use settings::{Config, ConfigError, Provider, RetrievalConfig, ServiceConfig};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
