#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::map_unwrap_or,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_wraps,
    clippy::unused_self,
    dead_code
)]

use clap::Subcommand;
use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod hooks;
pub mod identity;
pub mod providers;
pub mod store;
pub mod transcript;

pub use config::Config;

/// Memory resource management subcommands
#[derive(Subcommand, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ResourceCommands {
    /// List available memory resources
    List,
    /// Create a memory resource (reuses an existing one with the same name)
    #[command(long_about = "\
Create a memory resource.

A resource is a named, retention-scoped store of conversation history. \
With --semantic it also carries a long-term retrieval strategy scoped \
per actor, enabling pre-inference memory injection.

If a resource with the same name already exists it is reused; creation \
is never repeated blindly.

Examples:
  engram resources create --name tutor
  engram resources create --name tutor --retention-days 30 --semantic")]
    Create {
        /// Resource name
        #[arg(long)]
        name: String,
        /// Retention window in days
        #[arg(long, default_value = "30")]
        retention_days: u32,
        /// Attach a semantic long-term strategy
        #[arg(long)]
        semantic: bool,
    },
}
