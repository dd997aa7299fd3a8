//! Model provider trait — the inference collaborator seam.

use async_trait::async_trait;

use crate::transcript::MessageLog;

/// Options for one inference turn.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f64,
    pub system_prompt: String,
}

/// An inference backend. The memory layer treats it as an opaque
/// collaborator: message log in, assistant text out.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run one inference turn over the conversation and return the
    /// assistant's reply text.
    async fn chat(&self, log: &MessageLog, options: &ChatOptions) -> anyhow::Result<String>;

    /// The name of this provider implementation.
    fn name(&self) -> &str;
}
