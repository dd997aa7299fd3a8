//! In-process memory store backed by mutex-protected hash maps.
//!
//! Used for offline runs and tests. Semantic retrieval is naive term overlap
//! over previously recorded user turns; ranking quality is out of scope here.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::traits::{
    MemoryResource, MemorySnippet, MemoryStore, RecordedTurn, SemanticStrategy, StoreError,
    StoreResult,
};

/// Composite key identifying one stored session stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EventKey {
    memory_id: String,
    actor_id: String,
    session_id: String,
}

/// An in-process memory store. Durable only for the process lifetime.
pub struct LocalMemoryStore {
    resources: Mutex<Vec<MemoryResource>>,
    events: Mutex<HashMap<EventKey, Vec<RecordedTurn>>>,
    next_resource: AtomicUsize,
    semantic_queries: AtomicUsize,
}

impl LocalMemoryStore {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(Vec::new()),
            events: Mutex::new(HashMap::new()),
            next_resource: AtomicUsize::new(1),
            semantic_queries: AtomicUsize::new(0),
        }
    }

    /// Number of semantic queries issued so far. Test hook for the
    /// "tool results never trigger retrieval" guarantee.
    pub fn semantic_query_count(&self) -> usize {
        self.semantic_queries.load(Ordering::SeqCst)
    }
}

impl Default for LocalMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_ascii_lowercase)
        .collect()
}

fn overlaps(query: &str, candidate: &str) -> bool {
    let candidate_terms = terms(candidate);
    terms(query).iter().any(|t| candidate_terms.contains(t))
}

#[async_trait]
impl MemoryStore for LocalMemoryStore {
    async fn list_resources(&self) -> StoreResult<Vec<MemoryResource>> {
        Ok(self.resources.lock().clone())
    }

    async fn create_resource(
        &self,
        name: &str,
        retention_days: u32,
        strategy: Option<SemanticStrategy>,
    ) -> StoreResult<MemoryResource> {
        if name.trim().is_empty() {
            return Err(StoreError::Api {
                status: 400,
                message: "resource name cannot be empty".into(),
            });
        }
        let n = self.next_resource.fetch_add(1, Ordering::SeqCst);
        let resource = MemoryResource {
            id: format!("mem-{n:08}"),
            name: name.trim().to_string(),
            retention_days,
            strategy,
        };
        self.resources.lock().push(resource.clone());
        Ok(resource)
    }

    async fn get_recent_turns(
        &self,
        memory_id: &str,
        actor_id: &str,
        session_id: &str,
        k: usize,
    ) -> StoreResult<Vec<RecordedTurn>> {
        let key = EventKey {
            memory_id: memory_id.to_string(),
            actor_id: actor_id.to_string(),
            session_id: session_id.to_string(),
        };
        let events = self.events.lock();
        let turns = match events.get(&key) {
            Some(turns) => turns,
            None => return Ok(Vec::new()),
        };
        // Last k turn pairs, oldest first.
        let start = turns.len().saturating_sub(k * 2);
        Ok(turns[start..].to_vec())
    }

    async fn query_semantic(
        &self,
        memory_id: &str,
        namespace: &str,
        query: &str,
    ) -> StoreResult<Vec<MemorySnippet>> {
        self.semantic_queries.fetch_add(1, Ordering::SeqCst);
        // The namespace's trailing segment names the actor partition. Exact
        // comparison only: substring matching leaks memories across actors
        // whose ids share a prefix.
        let scoped_actor = namespace.rsplit('/').next().unwrap_or(namespace);
        let events = self.events.lock();
        let mut snippets = Vec::new();
        for (key, turns) in events.iter() {
            if key.memory_id != memory_id || key.actor_id != scoped_actor {
                continue;
            }
            for turn in turns {
                if turn.role.eq_ignore_ascii_case("USER") && overlaps(query, &turn.text) {
                    snippets.push(MemorySnippet {
                        text: Some(turn.text.clone()),
                        score: None,
                    });
                }
            }
        }
        Ok(snippets)
    }

    async fn append_exchange(
        &self,
        memory_id: &str,
        actor_id: &str,
        session_id: &str,
        turns: &[RecordedTurn],
    ) -> StoreResult<()> {
        let key = EventKey {
            memory_id: memory_id.to_string(),
            actor_id: actor_id.to_string(),
            session_id: session_id.to_string(),
        };
        self.events
            .lock()
            .entry(key)
            .or_default()
            .extend_from_slice(turns);
        Ok(())
    }

    fn name(&self) -> &str {
        "local"
    }
}
