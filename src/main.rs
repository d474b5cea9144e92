use anyhow::Context;
use clap::{Parser, Subcommand};
use support_qa::config::{Config, run_interactive_config, show_config};
use support_qa::embeddings::OllamaClient;
use support_qa::pipeline::ask;
use support_qa::web;

#[derive(Parser)]
#[command(name = "support-qa")]
#[command(about = "Answer support questions from your documents with retrieval-augmented generation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding model, language model and index
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Answer a single question and print the result
    Ask {
        /// The question to answer
        question: String,
    },
    /// Serve the question form over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8501")]
        bind: String,
    },
    /// Check that Ollama is reachable and the embedding model is available
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ask { question } => {
            if question.trim().is_empty() {
                println!("{}", web::INVALID_QUESTION);
                return Ok(());
            }
            let config = Config::load()?;
            let answer = tokio::task::spawn_blocking(move || ask(&config, &question))
                .await
                .context("Question answering task failed")?;
            println!("{}", answer);
        }
        Commands::Serve { bind } => {
            let config = Config::load()?;
            web::serve(config, &bind).await?;
        }
        Commands::Check => {
            let config = Config::load()?;
            let client = OllamaClient::new(&config.ollama)?;
            tokio::task::spawn_blocking(move || client.health_check())
                .await
                .context("Health check task failed")??;
            println!("Ollama is reachable and {} is available", config.ollama.model);
        }
    }

    Ok(())
}
