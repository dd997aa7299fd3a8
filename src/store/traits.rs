//! Memory store client trait and wire types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transcript::{Role, Turn};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure from the memory service.
///
/// Always recoverable at the hook layer: retrieval degrades to no-context and
/// persistence is report-and-continue. Nothing here may abort an inference
/// step.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure: the service could not be reached at all.
    #[error("memory store unreachable: {0}")]
    Unreachable(String),
    /// The service answered with an application-level error.
    #[error("memory store error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Semantic long-term strategy attached to a memory resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticStrategy {
    pub name: String,
    /// Namespace template partitioning retrieval, e.g. `/actors/{actorId}`.
    pub namespace_template: String,
}

impl SemanticStrategy {
    /// Render the per-actor namespace this strategy scopes queries to.
    pub fn namespace_for(&self, actor_id: &str) -> String {
        self.namespace_template.replace("{actorId}", actor_id)
    }
}

/// Descriptor for one memory resource: a named, retention-scoped store of
/// conversation history, optionally with a semantic strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryResource {
    pub id: String,
    pub name: String,
    pub retention_days: u32,
    pub strategy: Option<SemanticStrategy>,
}

/// One stored turn as the service records it.
///
/// Role labels use the service's vocabulary (`USER` / `ASSISTANT`) and are
/// mapped back to [`Role`] when history is reloaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedTurn {
    pub role: String,
    pub text: String,
    /// When the turn happened; recorded on append, restored on reload.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "USER",
        Role::Assistant => "ASSISTANT",
    }
}

impl RecordedTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role: role_label(role).to_string(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Record a transcript turn, preserving its timestamp.
    pub fn from_turn(turn: &Turn) -> Self {
        Self {
            role: role_label(turn.role).to_string(),
            text: turn.text.clone(),
            timestamp: turn.timestamp,
        }
    }

    /// Map the stored label to the runtime's role vocabulary. Unknown labels
    /// fall back to user, matching how history was recorded upstream.
    pub fn runtime_role(&self) -> Role {
        if self.role.eq_ignore_ascii_case("ASSISTANT") {
            Role::Assistant
        } else {
            Role::User
        }
    }
}

/// A retrieved long-term memory snippet.
///
/// `text` may be missing on malformed entries; injection skips those silently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnippet {
    pub text: Option<String>,
    pub score: Option<f64>,
}

/// Narrow client surface over the external memory service.
///
/// All operations are networked and may fail; none are assumed idempotent by
/// the service, so callers must not blindly retry resource creation (see
/// [`super::find_or_create_resource`]).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// List available memory resources.
    async fn list_resources(&self) -> StoreResult<Vec<MemoryResource>>;

    /// Create a memory resource with a retention window and optional
    /// semantic strategy.
    async fn create_resource(
        &self,
        name: &str,
        retention_days: u32,
        strategy: Option<SemanticStrategy>,
    ) -> StoreResult<MemoryResource>;

    /// Fetch the last `k` completed exchanges for a session as individual
    /// turn entries (up to `2k`), oldest first.
    async fn get_recent_turns(
        &self,
        memory_id: &str,
        actor_id: &str,
        session_id: &str,
        k: usize,
    ) -> StoreResult<Vec<RecordedTurn>>;

    /// Query semantically relevant snippets, scoped to a namespace.
    async fn query_semantic(
        &self,
        memory_id: &str,
        namespace: &str,
        query: &str,
    ) -> StoreResult<Vec<MemorySnippet>>;

    /// Append a completed exchange as ordered entries (user then assistant)
    /// tagged with (memory, actor, session).
    async fn append_exchange(
        &self,
        memory_id: &str,
        actor_id: &str,
        session_id: &str,
        turns: &[RecordedTurn],
    ) -> StoreResult<()>;

    /// The name of this store backend.
    fn name(&self) -> &str;
}
