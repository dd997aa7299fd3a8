//! OpenAI-compatible chat completions provider.
//!
//! Most hosted LLM APIs follow the same `/v1/chat/completions` shape, so one
//! implementation covers any compatible endpoint via a custom base URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::{ChatOptions, Provider};
use crate::transcript::MessageLog;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiProvider {
    pub fn with_base_url(base_url: Option<&str>, api_key: Option<&str>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.map(ToString::to_string),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn chat_completions_url(&self) -> String {
        if self.base_url.ends_with("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn chat(&self, log: &MessageLog, options: &ChatOptions) -> anyhow::Result<String> {
        let mut messages = Vec::with_capacity(log.len() + 1);
        if !options.system_prompt.is_empty() {
            messages.push(Message {
                role: "system".to_string(),
                content: options.system_prompt.clone(),
            });
        }
        for turn in log.turns() {
            messages.push(Message {
                role: turn.role.as_str().to_string(),
                content: turn.text.clone(),
            });
        }

        let body = ChatRequest {
            model: options.model.clone(),
            messages,
            temperature: options.temperature,
        };

        let mut request = self.client.post(self.chat_completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(super::api_error("openai", response).await);
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        content.ok_or_else(|| anyhow::anyhow!("openai returned an empty completion"))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
