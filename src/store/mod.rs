//! Memory store subsystem — the client seam for the external memory service.
//!
//! The service itself is opaque; this module only carries the narrow
//! operation set the hooks need, behind the [`MemoryStore`] trait. Backends
//! are selected by the factory [`create_store`].

pub mod http;
pub mod local;
pub mod traits;

pub use http::HttpMemoryStore;
pub use local::LocalMemoryStore;
pub use traits::{
    MemoryResource, MemorySnippet, MemoryStore, RecordedTurn, SemanticStrategy, StoreError,
    StoreResult,
};

use anyhow::Result;

use crate::config::{Config, StoreConfig};

/// Factory: create the right store backend from config
pub fn create_store(config: &StoreConfig) -> anyhow::Result<Box<dyn MemoryStore>> {
    match config.backend.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(Box::new(LocalMemoryStore::new())),
        "http" => {
            let base_url = config
                .base_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!("store.base_url is required for the http backend")
                })?;
            let api_key = resolve_store_credential(config);
            Ok(Box::new(HttpMemoryStore::new(base_url, api_key.as_deref())))
        }
        other if other.is_empty() => {
            anyhow::bail!("store.backend cannot be empty. Supported values: http, local")
        }
        other => anyhow::bail!("Unknown store backend '{other}'. Supported values: http, local"),
    }
}

/// Resolve the store credential from config, then from the environment.
fn resolve_store_credential(config: &StoreConfig) -> Option<String> {
    if let Some(key) = config.api_key.as_deref() {
        let key = key.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }
    std::env::var("ENGRAM_STORE_API_KEY")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reuse an existing resource by name before creating a new one.
///
/// Resource creation is not idempotent on the service side; calling it on
/// every run would pile up duplicates.
pub async fn find_or_create_resource(
    store: &dyn MemoryStore,
    name: &str,
    retention_days: u32,
    strategy: Option<SemanticStrategy>,
) -> StoreResult<MemoryResource> {
    let existing = store.list_resources().await?;
    if let Some(found) = existing.into_iter().find(|r| r.name == name) {
        return Ok(found);
    }
    store.create_resource(name, retention_days, strategy).await
}

// ── CLI handler ──

/// Handle `engram resources <subcommand>` CLI commands.
pub async fn handle_resource_command(
    command: crate::ResourceCommands,
    config: &Config,
) -> Result<()> {
    let store = create_store(&config.store)?;
    match command {
        crate::ResourceCommands::List => {
            let resources = store.list_resources().await?;
            if resources.is_empty() {
                println!("No memory resources found.");
                return Ok(());
            }
            println!("Memory resources ({} total):\n", resources.len());
            for resource in &resources {
                let mode = match &resource.strategy {
                    Some(strategy) => format!("semantic ({})", strategy.namespace_template),
                    None => "short-term".to_string(),
                };
                println!(
                    "- {} [{}]  retention: {}d  mode: {}",
                    resource.name, resource.id, resource.retention_days, mode
                );
            }
        }
        crate::ResourceCommands::Create {
            name,
            retention_days,
            semantic,
        } => {
            let strategy = semantic.then(|| SemanticStrategy {
                name: config.memory.strategy_name.clone(),
                namespace_template: config.memory.namespace_template.clone(),
            });
            let resource =
                find_or_create_resource(store.as_ref(), &name, retention_days, strategy).await?;
            println!("✓ Resource ready: {} [{}]", resource.name, resource.id);
        }
    }
    Ok(())
}
