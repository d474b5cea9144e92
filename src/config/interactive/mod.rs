
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{
    Config, ConfigError, IndexBackend, IndexConfig, LlmConfig, OllamaConfig, get_api_key,
};
use crate::embeddings::OllamaClient;

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Support QA Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used to embed questions.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Language Model Configuration").bold().yellow());
    eprintln!("The API key itself is read from the environment, only its variable name is stored.");
    eprintln!();

    configure_llm(&mut config.llm)?;

    eprintln!();
    eprintln!("{}", style("Index Configuration").bold().yellow());
    eprintln!();

    configure_index(&mut config.index)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before asking questions.");
    }

    if !api_key_is_set(&config.llm.api_key_env) {
        eprintln!(
            "{}",
            style(format!(
                "⚠ Warning: {} is not set in the environment",
                config.llm.api_key_env
            ))
            .yellow()
        );
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());

        let config_path = config
            .config_file_path()
            .context("Failed to get config file path")?;
        eprintln!(
            "Configuration saved to: {}",
            style(config_path.display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Language Model:").bold().yellow());
    eprintln!("  Endpoint: {}", style(&config.llm.api_url).cyan());
    eprintln!("  Model: {}", style(&config.llm.model).cyan());
    eprintln!("  Temperature: {}", style(config.llm.temperature).cyan());
    eprintln!("  Max Tokens: {}", style(config.llm.max_tokens).cyan());
    let key_state = if api_key_is_set(&config.llm.api_key_env) {
        style("set").green()
    } else {
        style("not set").red()
    };
    eprintln!("  API Key: ${} ({})", config.llm.api_key_env, key_state);

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Max Context: {} characters",
        style(config.retrieval.max_context_chars).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Index:").bold().yellow());
    eprintln!("  Backend: {}", style(config.index.backend).cyan());
    eprintln!(
        "  Documents: {}",
        style(config.index.documents_path.display()).cyan()
    );
    match config.index.backend {
        IndexBackend::Flat => eprintln!(
            "  Index File: {}",
            style(config.index.index_path.display()).cyan()
        ),
        IndexBackend::Hosted => {
            eprintln!("  Host: {}", style(&config.index.hosted.host).cyan());
            if let Some(namespace) = &config.index.hosted.namespace {
                eprintln!("  Namespace: {}", style(namespace).cyan());
            }
            let key_state = if api_key_is_set(&config.index.hosted.api_key_env) {
                style("set").green()
            } else {
                style("not set").red()
            };
            eprintln!(
                "  API Key: ${} ({})",
                config.index.hosted.api_key_env, key_state
            );
        }
    }

    let config_path = config
        .config_file_path()
        .context("Failed to get config file path")?;
    eprintln!();
    eprintln!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    let config_dir = Config::config_dir().context("Failed to determine config directory")?;
    load_existing_config_from(&config_dir)
}

/// An existing file that fails to load is reported instead of being replaced with defaults
fn load_existing_config_from(config_dir: &Path) -> Result<Config> {
    let config_path = config_dir.join("config.toml");

    if !config_path.exists() {
        eprintln!(
            "{}",
            style("No existing configuration found. Using defaults.").yellow()
        );
        return Config::load_from(config_dir);
    }

    let config = Config::load_from(config_dir).with_context(|| {
        format!(
            "Existing configuration at {} could not be loaded. Fix or remove it, then run the setup again",
            config_path.display()
        )
    })?;
    eprintln!("{}", style("Found existing configuration.").green());
    Ok(config)
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension (must match the index)")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_llm(llm: &mut LlmConfig) -> Result<()> {
    let api_url: String = Input::new()
        .with_prompt("Chat completion endpoint")
        .default(llm.api_url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            LlmConfig {
                api_url: input.clone(),
                ..LlmConfig::default()
            }
            .validate()
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Model")
        .default(llm.model.clone())
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt("API key environment variable")
        .default(llm.api_key_env.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Variable name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let temperature: f32 = Input::new()
        .with_prompt("Temperature")
        .default(llm.temperature)
        .validate_with(|input: &f32| validate_temperature(*input))
        .interact_text()?;

    let max_tokens: u32 = Input::new()
        .with_prompt("Max tokens")
        .default(llm.max_tokens)
        .validate_with(|input: &u32| validate_max_tokens(*input))
        .interact_text()?;

    llm.set_api_url(api_url)?;
    llm.set_model(model)?;
    llm.api_key_env = api_key_env;
    llm.set_temperature(temperature)?;
    llm.set_max_tokens(max_tokens)?;

    Ok(())
}

fn validate_temperature(input: f32) -> Result<(), ConfigError> {
    LlmConfig::default().set_temperature(input)
}

fn validate_max_tokens(input: u32) -> Result<(), ConfigError> {
    LlmConfig::default().set_max_tokens(input)
}

fn configure_index(index: &mut IndexConfig) -> Result<()> {
    let backends = &["flat", "hosted"];
    let default_index = match index.backend {
        IndexBackend::Flat => 0,
        IndexBackend::Hosted => 1,
    };

    let backend_index = Select::new()
        .with_prompt("Vector index backend")
        .default(default_index)
        .items(backends)
        .interact()?;

    let documents_path: String = Input::new()
        .with_prompt("Documents file (JSON array of strings)")
        .default(index.documents_path.display().to_string())
        .interact_text()?;
    index.documents_path = documents_path.into();

    if backend_index == 0 {
        index.backend = IndexBackend::Flat;
        let index_path: String = Input::new()
            .with_prompt("Flat index file")
            .default(index.index_path.display().to_string())
            .interact_text()?;
        index.index_path = index_path.into();
    } else {
        index.backend = IndexBackend::Hosted;
        let host: String = Input::new()
            .with_prompt("Index host")
            .default(index.hosted.host.clone())
            .interact_text()?;
        let namespace: String = Input::new()
            .with_prompt("Namespace (blank for default)")
            .default(index.hosted.namespace.clone().unwrap_or_default())
            .allow_empty(true)
            .interact_text()?;
        let api_key_env: String = Input::new()
            .with_prompt("API key environment variable")
            .default(index.hosted.api_key_env.clone())
            .interact_text()?;

        index.hosted.host = host;
        index.hosted.namespace = (!namespace.trim().is_empty()).then_some(namespace);
        index.hosted.api_key_env = api_key_env;
    }

    index.validate()?;
    Ok(())
}

fn test_ollama_connection(config: &Config) -> bool {
    match OllamaClient::new(&config.ollama) {
        Ok(client) => client.ping().is_ok(),
        Err(_) => false,
    }
}

/// Blank values count as unset, matching what the question pipeline accepts
fn api_key_is_set(var: &str) -> bool {
    get_api_key(var).is_ok()
}
