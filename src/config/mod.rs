// Configuration management module
// TOML settings plus the interactive editor used by `support-qa config`

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, HostedIndexConfig, IndexBackend, IndexConfig, LlmConfig, OllamaConfig,
    RetrievalConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}

/// Read an API key from the environment. Unset and blank values are both treated as missing.
#[inline]
pub fn get_api_key(var: &str) -> crate::Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(crate::QaError::MissingApiKey {
            var: var.to_string(),
        }),
    }
}
