//! Configuration schema and loading.
//!
//! Config lives in a TOML file under the engram directory (default
//! `~/.engram`, overridable with `ENGRAM_CONFIG_DIR`). Missing keys fall back
//! to serde defaults, so old config files keep working as fields are added.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_temperature() -> f64 {
    0.7
}

fn default_actor_id() -> String {
    "local_user".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant with memory. Use prior context when it is relevant.".to_string()
}

fn default_store_backend() -> String {
    "local".to_string()
}

fn default_resource_name() -> String {
    "engram".to_string()
}

fn default_recall_turns() -> usize {
    5
}

fn default_retention_days() -> u32 {
    30
}

fn default_namespace_template() -> String {
    "/actors/{actorId}".to_string()
}

fn default_strategy_name() -> String {
    "conversation-semantic".to_string()
}

/// Memory store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "http" (remote memory service) | "local" (in-process, per-run)
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Base URL of the memory service (http backend only)
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key; `ENGRAM_STORE_API_KEY` overrides
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Conversation memory behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Memory resource to use; reused by name, created when missing
    #[serde(default = "default_resource_name")]
    pub resource_name: String,
    /// How many recent turns to reload at conversation start
    #[serde(default = "default_recall_turns")]
    pub recall_turns: usize,
    /// Retention window (days) when creating a resource
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Enable long-term semantic retrieval (requires a semantic strategy on
    /// the resource; without it the conversation is short-term only)
    #[serde(default)]
    pub semantic: bool,
    /// Namespace template partitioning semantic retrieval per actor
    #[serde(default = "default_namespace_template")]
    pub namespace_template: String,
    /// Strategy name used when creating a semantic resource
    #[serde(default = "default_strategy_name")]
    pub strategy_name: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            resource_name: default_resource_name(),
            recall_turns: default_recall_turns(),
            retention_days: default_retention_days(),
            semantic: false,
            namespace_template: default_namespace_template(),
            strategy_name: default_strategy_name(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was loaded from (not serialized)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Inference provider ("openai" or compatible)
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Model name passed to the provider
    #[serde(default)]
    pub default_model: Option<String>,
    /// Custom provider base URL (any OpenAI-compatible endpoint)
    #[serde(default)]
    pub provider_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Default actor identity; `ENGRAM_ACTOR_ID` overrides
    #[serde(default = "default_actor_id")]
    pub actor_id: String,

    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            default_provider: Some("openai".to_string()),
            default_model: Some("gpt-4o-mini".to_string()),
            provider_url: None,
            default_temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            actor_id: default_actor_id(),
            store: StoreConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Resolve the engram config directory: `ENGRAM_CONFIG_DIR` wins, else
/// `~/.engram`.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ENGRAM_CONFIG_DIR") {
        let dir = dir.trim();
        if !dir.is_empty() {
            return Ok(PathBuf::from(shellexpand::tilde(dir).into_owned()));
        }
    }
    let base = directories::BaseDirs::new().context("could not determine home directory")?;
    Ok(base.home_dir().join(".engram"))
}

impl Config {
    /// Load config from disk, writing a default file on first run.
    pub async fn load_or_init() -> Result<Self> {
        let dir = config_dir()?;
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create config dir {}", dir.display()))?;
        let path = dir.join("config.toml");

        let mut config: Config = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => toml::from_str(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Config::default();
                let serialized =
                    toml::to_string_pretty(&config).context("failed to serialize default config")?;
                tokio::fs::write(&path, serialized)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                config
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };

        config.config_path = path;
        Ok(config)
    }

    /// Apply environment overrides on top of the file config.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ENGRAM_STORE_URL") {
            let url = url.trim();
            if !url.is_empty() {
                self.store.backend = "http".to_string();
                self.store.base_url = Some(url.to_string());
            }
        }
        if let Ok(actor) = std::env::var("ENGRAM_ACTOR_ID") {
            let actor = actor.trim();
            if !actor.is_empty() {
                self.actor_id = actor.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_constructible() {
        let config = Config::default();
        assert!(config.default_provider.is_some());
        assert!(config.default_model.is_some());
        assert!(config.default_temperature > 0.0);
        assert_eq!(config.memory.recall_turns, 5);
        assert_eq!(config.store.backend, "local");
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.actor_id, config.actor_id);
        assert_eq!(parsed.memory.namespace_template, "/actors/{actorId}");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            actor_id = "s1"

            [memory]
            semantic = true
            "#,
        )
        .unwrap();
        assert_eq!(parsed.actor_id, "s1");
        assert!(parsed.memory.semantic);
        assert_eq!(parsed.memory.recall_turns, 5);
        assert_eq!(parsed.store.backend, "local");
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.memory.retention_days, 30);
        assert!(!parsed.memory.semantic);
    }

    #[tokio::test]
    async fn load_or_init_writes_default_file_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("ENGRAM_CONFIG_DIR", dir.path());
        let config = Config::load_or_init().await.unwrap();
        std::env::remove_var("ENGRAM_CONFIG_DIR");

        assert!(config.config_path.ends_with("config.toml"));
        assert!(config.config_path.exists());
        assert_eq!(config.store.backend, "local");
    }
}
