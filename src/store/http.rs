//! HTTP memory service client.
//!
//! Speaks a small JSON REST surface: resource listing/creation, session event
//! streams, and namespace-scoped semantic retrieval. Error bodies are
//! sanitized before they reach logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::{
    MemoryResource, MemorySnippet, MemoryStore, RecordedTurn, SemanticStrategy, StoreError,
    StoreResult,
};
use crate::providers::sanitize_api_error;

/// Client for a remote memory service.
pub struct HttpMemoryStore {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpMemoryStore {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(ToString::to_string),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> StoreResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read error body>".to_string());
        Err(StoreError::Api {
            status: status.as_u16(),
            message: sanitize_api_error(&body),
        })
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Unreachable(err.to_string())
}

// ── Wire types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListResourcesResponse {
    #[serde(default)]
    memories: Vec<ResourceDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceDoc {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    event_expiry_days: u32,
    #[serde(default)]
    strategies: Vec<StrategyDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StrategyDoc {
    name: String,
    #[serde(default)]
    namespaces: Vec<String>,
}

impl From<ResourceDoc> for MemoryResource {
    fn from(doc: ResourceDoc) -> Self {
        let strategy = doc.strategies.into_iter().next().map(|s| SemanticStrategy {
            name: s.name,
            namespace_template: s.namespaces.into_iter().next().unwrap_or_default(),
        });
        MemoryResource {
            id: doc.id,
            name: doc.name,
            retention_days: doc.event_expiry_days,
            strategy,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateResourceRequest<'a> {
    name: &'a str,
    event_expiry_days: u32,
    strategies: Vec<StrategyDoc>,
}

#[derive(Debug, Deserialize)]
struct CreateResourceResponse {
    memory: ResourceDoc,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    events: Vec<EventDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EventDoc {
    role: String,
    content: ContentDoc,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentDoc {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    namespace: &'a str,
    search_criteria: SearchCriteria<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchCriteria<'a> {
    search_query: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    #[serde(default)]
    memory_records: Vec<RecordDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordDoc {
    #[serde(default)]
    content: Option<ContentDoc>,
    #[serde(default)]
    relevance_score: Option<f64>,
}

impl From<RecordDoc> for MemorySnippet {
    fn from(doc: RecordDoc) -> Self {
        MemorySnippet {
            text: doc.content.and_then(|c| c.text),
            score: doc.relevance_score,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendEventRequest<'a> {
    actor_id: &'a str,
    session_id: &'a str,
    messages: &'a [RecordedTurn],
}

#[async_trait]
impl MemoryStore for HttpMemoryStore {
    async fn list_resources(&self) -> StoreResult<Vec<MemoryResource>> {
        let response = self
            .request(self.client.get(self.url("/memories")))
            .send()
            .await
            .map_err(transport)?;
        let parsed: ListResourcesResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(transport)?;
        Ok(parsed.memories.into_iter().map(Into::into).collect())
    }

    async fn create_resource(
        &self,
        name: &str,
        retention_days: u32,
        strategy: Option<SemanticStrategy>,
    ) -> StoreResult<MemoryResource> {
        let strategies = strategy
            .map(|s| {
                vec![StrategyDoc {
                    name: s.name,
                    namespaces: vec![s.namespace_template],
                }]
            })
            .unwrap_or_default();
        let body = CreateResourceRequest {
            name,
            event_expiry_days: retention_days,
            strategies,
        };
        let response = self
            .request(self.client.post(self.url("/memories")).json(&body))
            .send()
            .await
            .map_err(transport)?;
        let parsed: CreateResourceResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(transport)?;
        Ok(parsed.memory.into())
    }

    async fn get_recent_turns(
        &self,
        memory_id: &str,
        actor_id: &str,
        session_id: &str,
        k: usize,
    ) -> StoreResult<Vec<RecordedTurn>> {
        let path = format!("/memories/{memory_id}/actors/{actor_id}/sessions/{session_id}/events");
        let response = self
            .request(
                self.client
                    .get(self.url(&path))
                    .query(&[("maxResults", (k * 2).to_string())]),
            )
            .send()
            .await
            .map_err(transport)?;
        let parsed: EventsResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(transport)?;
        Ok(parsed
            .events
            .into_iter()
            .filter_map(|event| {
                event.content.text.map(|text| RecordedTurn {
                    role: event.role,
                    text,
                    timestamp: event.timestamp.unwrap_or_else(Utc::now),
                })
            })
            .collect())
    }

    async fn query_semantic(
        &self,
        memory_id: &str,
        namespace: &str,
        query: &str,
    ) -> StoreResult<Vec<MemorySnippet>> {
        let body = RetrieveRequest {
            namespace,
            search_criteria: SearchCriteria {
                search_query: query,
            },
        };
        let path = format!("/memories/{memory_id}/retrieve");
        let response = self
            .request(self.client.post(self.url(&path)).json(&body))
            .send()
            .await
            .map_err(transport)?;
        let parsed: RetrieveResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(transport)?;
        Ok(parsed.memory_records.into_iter().map(Into::into).collect())
    }

    async fn append_exchange(
        &self,
        memory_id: &str,
        actor_id: &str,
        session_id: &str,
        turns: &[RecordedTurn],
    ) -> StoreResult<()> {
        let body = AppendEventRequest {
            actor_id,
            session_id,
            messages: turns,
        };
        let path = format!("/memories/{memory_id}/events");
        let response = self
            .request(self.client.post(self.url(&path)).json(&body))
            .send()
            .await
            .map_err(transport)?;
        Self::check(response).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
