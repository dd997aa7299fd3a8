#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    dead_code
)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod agent;
mod config;
mod hooks;
mod identity;
mod providers;
mod store;
mod transcript;

use config::Config;

// Re-export so binary modules share a single source of truth with the library.
pub use engram::ResourceCommands;

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

/// `Engram` - conversation memory for AI agents.
#[derive(Parser, Debug)]
#[command(name = "engram")]
#[command(version)]
#[command(about = "An AI chat agent that remembers across sessions.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a chat session backed by conversation memory
    #[command(long_about = "\
Start a chat session backed by conversation memory.

Recent turns are reloaded when the conversation starts, and each \
completed exchange is persisted so future sessions with the same \
actor and memory resource pick up where this one left off. With a \
semantic resource, relevant long-term memories are injected into \
each outgoing message.

Examples:
  engram chat                          # interactive session
  engram chat -m \"What did we cover?\"  # single message
  engram chat --actor s1 --model gpt-4o-mini")]
    Chat {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Actor identity (stable across sessions); defaults to config
        #[arg(long)]
        actor: Option<String>,

        /// Provider to use (openai or compatible)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Temperature (0.0 - 2.0); defaults to config
        #[arg(short, long, value_parser = parse_temperature)]
        temperature: Option<f64>,
    },

    /// Manage memory resources (list, create)
    #[command(long_about = "\
Manage memory resources.

List the memory resources available on the configured store, or \
create one with a retention window and an optional semantic strategy.

Examples:
  engram resources list
  engram resources create --name tutor --retention-days 30 --semantic")]
    Resources {
        #[command(subcommand)]
        resource_command: ResourceCommands,
    },

    /// Show effective configuration and memory status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("ENGRAM_CONFIG_DIR", config_dir);
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = Config::load_or_init().await?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Chat {
            message,
            actor,
            provider,
            model,
            temperature,
        } => agent::run(config, message, actor, provider, model, temperature).await,

        Commands::Resources { resource_command } => {
            store::handle_resource_command(resource_command, &config).await
        }

        Commands::Status => {
            println!("engram status");
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!();
            println!(
                "Provider:    {}",
                config.default_provider.as_deref().unwrap_or("openai")
            );
            println!(
                "Model:       {}",
                config.default_model.as_deref().unwrap_or("(default)")
            );
            println!();
            println!("Store:       {}", config.store.backend);
            if let Some(url) = &config.store.base_url {
                println!("Store URL:   {url}");
            }
            println!("Actor:       {}", config.actor_id);
            println!("Resource:    {}", config.memory.resource_name);
            println!("Recall:      last {} turns", config.memory.recall_turns);
            println!("Retention:   {} days", config.memory.retention_days);
            println!(
                "Semantic:    {}",
                if config.memory.semantic {
                    format!("on ({})", config.memory.namespace_template)
                } else {
                    "off".to_string()
                }
            );
            Ok(())
        }
    }
}
