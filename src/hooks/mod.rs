//! Memory hooks — retrieval before inference, persistence after.
//!
//! [`MemoryHookProvider`] is the listener the agent control loop calls around
//! each inference step: `initialize` seeds the message log from persisted
//! history, `before_inference` injects semantically relevant memories into the
//! pending user turn, `after_inference` persists the completed exchange.
//!
//! Memory is an enhancement, not a guarantee: every store failure inside a
//! trigger is caught, reported through tracing, and turned into a degraded
//! outcome. No error escapes to abort the conversation turn.

use std::sync::Arc;

use crate::identity::SessionIdentity;
use crate::store::{MemoryStore, RecordedTurn};
use crate::transcript::{extract_latest_exchange, MessageLog, Role, Turn};

/// How many recent turns to reload when a conversation starts.
pub const DEFAULT_RECALL_TURNS: usize = 5;

/// Binds a conversation's identity to the memory store and performs the
/// retrieve-inject-persist cycle around inference.
pub struct MemoryHookProvider {
    store: Arc<dyn MemoryStore>,
    identity: SessionIdentity,
    recall_turns: usize,
    /// Namespace for semantic retrieval; `None` disables pre-inference
    /// retrieval entirely (short-term mode).
    namespace: Option<String>,
    initialized: bool,
}

impl MemoryHookProvider {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        identity: SessionIdentity,
        recall_turns: usize,
        namespace: Option<String>,
    ) -> Self {
        Self {
            store,
            identity,
            recall_turns,
            namespace,
            initialized: false,
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Seed the message log from persisted history, oldest first.
    ///
    /// Idempotent per conversation: a second call is a no-op, so loaded
    /// context is never duplicated. Returns the number of turns loaded; a
    /// store failure degrades to an empty log.
    pub async fn initialize(&mut self, log: &mut MessageLog) -> usize {
        if self.initialized {
            return 0;
        }
        self.initialized = true;

        let recent = self
            .store
            .get_recent_turns(
                &self.identity.memory_id,
                &self.identity.actor_id,
                &self.identity.session_id,
                self.recall_turns,
            )
            .await;

        match recent {
            Ok(turns) => {
                if turns.is_empty() {
                    return 0;
                }
                let restored: Vec<Turn> = turns
                    .iter()
                    .map(|turn| Turn {
                        role: turn.runtime_role(),
                        text: turn.text.clone(),
                        tool_result: false,
                        timestamp: turn.timestamp,
                    })
                    .collect();
                let loaded = restored.len();
                log.replace(restored);
                tracing::info!(
                    session = %self.identity.session_id,
                    count = loaded,
                    "loaded conversation history from memory"
                );
                loaded
            }
            Err(err) => {
                tracing::warn!(
                    session = %self.identity.session_id,
                    error = %err,
                    "memory load failed; starting with an empty log"
                );
                0
            }
        }
    }

    /// Inject relevant long-term memories into the pending user turn.
    ///
    /// No-op when semantic retrieval is not configured, when the latest turn
    /// is not a user turn, or when it is a tool-result artifact (no store
    /// call is made in those cases). Returns the number of snippets injected.
    pub async fn before_inference(&self, log: &mut MessageLog) -> usize {
        let Some(namespace) = self.namespace.as_deref() else {
            return 0;
        };
        let Some(last) = log.last() else {
            return 0;
        };
        if last.role != Role::User || last.is_tool_result() {
            return 0;
        }
        let query = last.text.clone();

        let snippets = match self
            .store
            .query_semantic(&self.identity.memory_id, namespace, &query)
            .await
        {
            Ok(snippets) => snippets,
            Err(err) => {
                tracing::warn!(
                    namespace,
                    error = %err,
                    "memory retrieval failed; continuing without context"
                );
                return 0;
            }
        };

        // Malformed or empty snippets are skipped silently.
        let context: Vec<String> = snippets
            .into_iter()
            .filter_map(|snippet| snippet.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();
        if context.is_empty() {
            return 0;
        }

        let injected = context.len();
        if let Some(turn) = log.last_mut() {
            let context_text = context.join("\n");
            turn.text = format!("{}\n\nPrevious context: {context_text}", turn.text);
        }
        tracing::info!(namespace, count = injected, "retrieved memories");
        injected
    }

    /// Persist the latest completed exchange, if there is one.
    ///
    /// Returns true when the exchange was durably appended. A store failure
    /// is reported and the in-memory conversation continues.
    pub async fn after_inference(&self, log: &MessageLog) -> bool {
        let Some(exchange) = extract_latest_exchange(log) else {
            return false;
        };

        let turns = [
            RecordedTurn::from_turn(&exchange.request),
            RecordedTurn::from_turn(&exchange.response),
        ];

        let result = self
            .store
            .append_exchange(
                &self.identity.memory_id,
                &self.identity.actor_id,
                &self.identity.session_id,
                &turns,
            )
            .await;

        match result {
            Ok(()) => {
                tracing::info!(session = %self.identity.session_id, "saved exchange to memory");
                true
            }
            Err(err) => {
                tracing::warn!(
                    session = %self.identity.session_id,
                    error = %err,
                    "memory save failed; conversation continues"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        LocalMemoryStore, MemoryResource, MemorySnippet, SemanticStrategy, StoreError, StoreResult,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn identity() -> SessionIdentity {
        SessionIdentity::new("s1", "m1").unwrap()
    }

    /// Store stub with scripted snippet responses and optional hard failure.
    #[derive(Default)]
    struct StubStore {
        snippets: Vec<MemorySnippet>,
        fail: bool,
        semantic_queries: AtomicUsize,
        appends: AtomicUsize,
    }

    impl StubStore {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn with_snippets(snippets: Vec<MemorySnippet>) -> Self {
            Self {
                snippets,
                ..Self::default()
            }
        }

        fn err() -> StoreError {
            StoreError::Unreachable("connection refused".into())
        }
    }

    #[async_trait]
    impl MemoryStore for StubStore {
        async fn list_resources(&self) -> StoreResult<Vec<MemoryResource>> {
            Ok(Vec::new())
        }

        async fn create_resource(
            &self,
            _name: &str,
            _retention_days: u32,
            _strategy: Option<SemanticStrategy>,
        ) -> StoreResult<MemoryResource> {
            Err(Self::err())
        }

        async fn get_recent_turns(
            &self,
            _memory_id: &str,
            _actor_id: &str,
            _session_id: &str,
            _k: usize,
        ) -> StoreResult<Vec<RecordedTurn>> {
            if self.fail {
                return Err(Self::err());
            }
            Ok(Vec::new())
        }

        async fn query_semantic(
            &self,
            _memory_id: &str,
            _namespace: &str,
            _query: &str,
        ) -> StoreResult<Vec<MemorySnippet>> {
            self.semantic_queries.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Self::err());
            }
            Ok(self.snippets.clone())
        }

        async fn append_exchange(
            &self,
            _memory_id: &str,
            _actor_id: &str,
            _session_id: &str,
            _turns: &[RecordedTurn],
        ) -> StoreResult<()> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Self::err());
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn snippet(text: &str) -> MemorySnippet {
        MemorySnippet {
            text: Some(text.to_string()),
            score: Some(0.9),
        }
    }

    // ── Trigger A ────────────────────────────────────────────

    #[tokio::test]
    async fn initialize_seeds_log_oldest_first() {
        let store = Arc::new(LocalMemoryStore::new());
        store
            .append_exchange(
                "m1",
                "s1",
                "s1_m1_session",
                &[
                    RecordedTurn::new(Role::User, "2+2?"),
                    RecordedTurn::new(Role::Assistant, "4"),
                ],
            )
            .await
            .unwrap();

        let mut hooks = MemoryHookProvider::new(store, identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();
        let loaded = hooks.initialize(&mut log).await;

        assert_eq!(loaded, 2);
        assert_eq!(log.turns()[0].role, Role::User);
        assert_eq!(log.turns()[0].text, "2+2?");
        assert_eq!(log.turns()[1].role, Role::Assistant);
        assert_eq!(log.turns()[1].text, "4");
    }

    #[tokio::test]
    async fn initialize_is_idempotent_per_conversation() {
        let store = Arc::new(LocalMemoryStore::new());
        store
            .append_exchange(
                "m1",
                "s1",
                "s1_m1_session",
                &[
                    RecordedTurn::new(Role::User, "hi"),
                    RecordedTurn::new(Role::Assistant, "hello"),
                ],
            )
            .await
            .unwrap();

        let mut hooks = MemoryHookProvider::new(store, identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();
        assert_eq!(hooks.initialize(&mut log).await, 2);
        assert_eq!(hooks.initialize(&mut log).await, 0);
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn initialize_restores_recorded_timestamps() {
        use chrono::TimeZone;

        let when = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut request = Turn::user("2+2?");
        request.timestamp = when;

        let store = Arc::new(LocalMemoryStore::new());
        store
            .append_exchange(
                "m1",
                "s1",
                "s1_m1_session",
                &[
                    RecordedTurn::from_turn(&request),
                    RecordedTurn::from_turn(&Turn::assistant("4")),
                ],
            )
            .await
            .unwrap();

        let mut hooks = MemoryHookProvider::new(store, identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();
        hooks.initialize(&mut log).await;

        assert_eq!(log.turns()[0].timestamp, when);
    }

    #[tokio::test]
    async fn initialize_degrades_to_empty_log_on_store_failure() {
        let store = Arc::new(StubStore::failing());
        let mut hooks = MemoryHookProvider::new(store, identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();

        let loaded = hooks.initialize(&mut log).await;

        assert_eq!(loaded, 0);
        assert!(log.is_empty());
        // The conversation still accepts input.
        log.push(Turn::user("still works"));
        assert_eq!(log.len(), 1);
    }

    // ── Trigger B ────────────────────────────────────────────

    #[tokio::test]
    async fn tool_result_turn_never_issues_a_query() {
        let store = Arc::new(StubStore::with_snippets(vec![snippet("irrelevant")]));
        let hooks = MemoryHookProvider::new(
            store.clone(),
            identity(),
            DEFAULT_RECALL_TURNS,
            Some("/actors/s1".into()),
        );
        let mut log = MessageLog::new();
        log.push(Turn::user("what is 2+2?"));
        log.push(Turn::assistant("let me check"));
        log.push(Turn::tool_result("{\"result\": 4}"));

        assert_eq!(hooks.before_inference(&mut log).await, 0);
        assert_eq!(store.semantic_queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn assistant_turn_never_issues_a_query() {
        let store = Arc::new(StubStore::with_snippets(vec![snippet("irrelevant")]));
        let hooks = MemoryHookProvider::new(
            store.clone(),
            identity(),
            DEFAULT_RECALL_TURNS,
            Some("/actors/s1".into()),
        );
        let mut log = MessageLog::new();
        log.push(Turn::user("hi"));
        log.push(Turn::assistant("hello"));

        assert_eq!(hooks.before_inference(&mut log).await, 0);
        assert_eq!(store.semantic_queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retrieval_disabled_without_namespace() {
        let store = Arc::new(StubStore::with_snippets(vec![snippet("irrelevant")]));
        let hooks =
            MemoryHookProvider::new(store.clone(), identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();
        log.push(Turn::user("hi"));

        assert_eq!(hooks.before_inference(&mut log).await, 0);
        assert_eq!(store.semantic_queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn injection_appends_snippets_after_original_text_in_order() {
        let store = Arc::new(StubStore::with_snippets(vec![
            snippet("likes algebra"),
            snippet("struggling with fractions"),
        ]));
        let hooks = MemoryHookProvider::new(
            store,
            identity(),
            DEFAULT_RECALL_TURNS,
            Some("/actors/s1".into()),
        );
        let mut log = MessageLog::new();
        log.push(Turn::user("help me study"));

        let injected = hooks.before_inference(&mut log).await;

        assert_eq!(injected, 2);
        let text = &log.last().unwrap().text;
        assert!(text.starts_with("help me study"));
        let a = text.find("likes algebra").unwrap();
        let b = text.find("struggling with fractions").unwrap();
        assert!(a < b, "snippets must appear in return order");
        assert!(text.contains("Previous context:"));
    }

    #[tokio::test]
    async fn malformed_snippets_are_skipped_silently() {
        let store = Arc::new(StubStore::with_snippets(vec![
            MemorySnippet::default(),
            MemorySnippet {
                text: Some("   ".into()),
                score: None,
            },
            snippet("prefers worked examples"),
        ]));
        let hooks = MemoryHookProvider::new(
            store,
            identity(),
            DEFAULT_RECALL_TURNS,
            Some("/actors/s1".into()),
        );
        let mut log = MessageLog::new();
        log.push(Turn::user("quiz me"));

        assert_eq!(hooks.before_inference(&mut log).await, 1);
        assert!(log.last().unwrap().text.contains("prefers worked examples"));
    }

    #[tokio::test]
    async fn retrieval_failure_leaves_the_turn_untouched() {
        let store = Arc::new(StubStore::failing());
        let hooks = MemoryHookProvider::new(
            store,
            identity(),
            DEFAULT_RECALL_TURNS,
            Some("/actors/s1".into()),
        );
        let mut log = MessageLog::new();
        log.push(Turn::user("hello"));

        assert_eq!(hooks.before_inference(&mut log).await, 0);
        assert_eq!(log.last().unwrap().text, "hello");
    }

    #[tokio::test]
    async fn no_snippets_leaves_the_turn_untouched() {
        let store = Arc::new(StubStore::with_snippets(Vec::new()));
        let hooks = MemoryHookProvider::new(
            store,
            identity(),
            DEFAULT_RECALL_TURNS,
            Some("/actors/s1".into()),
        );
        let mut log = MessageLog::new();
        log.push(Turn::user("hello"));

        assert_eq!(hooks.before_inference(&mut log).await, 0);
        assert_eq!(log.last().unwrap().text, "hello");
    }

    // ── Trigger C ────────────────────────────────────────────

    #[tokio::test]
    async fn after_inference_persists_completed_exchange() {
        let store = Arc::new(LocalMemoryStore::new());
        let hooks =
            MemoryHookProvider::new(store.clone(), identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();
        log.push(Turn::user("2+2?"));
        log.push(Turn::assistant("4"));

        assert!(hooks.after_inference(&log).await);

        let turns = store
            .get_recent_turns("m1", "s1", "s1_m1_session", 5)
            .await
            .unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, "USER");
        assert_eq!(turns[0].text, "2+2?");
        assert_eq!(turns[1].role, "ASSISTANT");
        assert_eq!(turns[1].text, "4");
    }

    #[tokio::test]
    async fn incomplete_exchange_is_a_noop() {
        let store = Arc::new(StubStore::default());
        let hooks =
            MemoryHookProvider::new(store.clone(), identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();
        log.push(Turn::user("still waiting"));

        assert!(!hooks.after_inference(&log).await);
        assert_eq!(store.appends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn persistence_failure_is_non_fatal() {
        let store = Arc::new(StubStore::failing());
        let hooks = MemoryHookProvider::new(store, identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();
        log.push(Turn::user("q"));
        log.push(Turn::assistant("a"));

        assert!(!hooks.after_inference(&log).await);
        assert_eq!(log.len(), 2);
    }

    // ── End to end ───────────────────────────────────────────

    #[tokio::test]
    async fn persisted_exchange_is_reloaded_by_a_new_conversation() {
        let store = Arc::new(LocalMemoryStore::new());

        // First conversation: persist one exchange.
        let first = MemoryHookProvider::new(store.clone(), identity(), DEFAULT_RECALL_TURNS, None);
        let mut log = MessageLog::new();
        log.push(Turn::user("2+2?"));
        log.push(Turn::assistant("4"));
        assert!(first.after_inference(&log).await);

        // A new conversation instance with the same (actor, memory) derives the
        // same session id and loads the history back.
        let mut second =
            MemoryHookProvider::new(store, identity(), DEFAULT_RECALL_TURNS, None);
        let mut fresh = MessageLog::new();
        let loaded = second.initialize(&mut fresh).await;

        assert_eq!(loaded, 2);
        assert_eq!(fresh.turns()[0].text, "2+2?");
        assert_eq!(fresh.turns()[1].text, "4");
    }
}
