//! Session identity — stable (actor, session, memory) naming for conversations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected identity configuration.
///
/// Fatal at conversation start: no store call may be attempted with an empty
/// actor or memory id, or persisted history would land in a garbage session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("actor id cannot be empty")]
    EmptyActor,
    #[error("memory id cannot be empty")]
    EmptyMemory,
}

/// Identity of one conversation: who is talking, which memory resource backs
/// it, and the derived session grouping key.
///
/// Computed once per conversation start and held read-only for its duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub actor_id: String,
    pub memory_id: String,
    pub session_id: String,
}

impl SessionIdentity {
    pub fn new(actor_id: &str, memory_id: &str) -> Result<Self, IdentityError> {
        let actor_id = actor_id.trim();
        if actor_id.is_empty() {
            return Err(IdentityError::EmptyActor);
        }
        let memory_id = memory_id.trim();
        if memory_id.is_empty() {
            return Err(IdentityError::EmptyMemory);
        }
        Ok(Self {
            actor_id: actor_id.to_string(),
            memory_id: memory_id.to_string(),
            session_id: resolve_session_id(actor_id, memory_id),
        })
    }
}

/// Derive the session grouping key for (actor, memory).
///
/// Pure structural concatenation: identical inputs yield an identical session
/// id in any process, so a reconnecting client lands back in its stored
/// session instead of fragmenting history. The full memory id is used;
/// truncated prefixes can collide across resources.
pub fn resolve_session_id(actor_id: &str, memory_id: &str) -> String {
    format!("{actor_id}_{memory_id}_session")
}
