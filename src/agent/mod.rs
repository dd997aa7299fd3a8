//! Agent control loop — wires the provider, the memory hooks, and the chat
//! surface together.
//!
//! One conversation is processed strictly sequentially: retrieval completes
//! (or degrades) before inference starts, and persistence is attempted only
//! after the assistant turn lands in the log.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::Config;
use crate::hooks::MemoryHookProvider;
use crate::identity::SessionIdentity;
use crate::providers::{create_provider, ChatOptions, Provider};
use crate::store::{create_store, find_or_create_resource, MemoryStore, SemanticStrategy};
use crate::transcript::{MessageLog, Turn};

/// Per-conversation state, passed explicitly instead of living in ambient
/// session storage.
pub struct ConversationContext {
    pub identity: SessionIdentity,
    pub log: MessageLog,
}

/// What happened during one processed turn, for the presentation layer.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub reply: String,
    /// Turns loaded from memory (first turn of a conversation only).
    pub loaded: usize,
    /// Long-term memories injected into this turn.
    pub injected: usize,
    /// Whether the exchange was durably persisted.
    pub persisted: bool,
}

pub struct Agent {
    provider: Box<dyn Provider>,
    hooks: MemoryHookProvider,
    options: ChatOptions,
    context: ConversationContext,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, hooks: MemoryHookProvider, options: ChatOptions) -> Self {
        let context = ConversationContext {
            identity: hooks.identity().clone(),
            log: MessageLog::new(),
        };
        Self {
            provider,
            hooks,
            options,
            context,
        }
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Process one user message through the full hook cycle.
    pub async fn process_message(&mut self, text: &str) -> Result<TurnReport> {
        let loaded = self.hooks.initialize(&mut self.context.log).await;

        self.context.log.push(Turn::user(text));
        let injected = self.hooks.before_inference(&mut self.context.log).await;

        // A failed or cancelled inference appends no assistant turn, so
        // nothing is persisted for this step.
        let reply = self.provider.chat(&self.context.log, &self.options).await?;
        self.context.log.push(Turn::assistant(reply.clone()));

        let persisted = self.hooks.after_inference(&self.context.log).await;

        Ok(TurnReport {
            reply,
            loaded,
            injected,
            persisted,
        })
    }
}

/// Build an agent from config and start a chat session.
///
/// With `message` set, runs a single turn and exits; otherwise enters the
/// interactive loop.
pub async fn run(
    config: Config,
    message: Option<String>,
    actor: Option<String>,
    provider_override: Option<String>,
    model_override: Option<String>,
    temperature: Option<f64>,
) -> Result<()> {
    let actor_id = actor.unwrap_or_else(|| config.actor_id.clone());
    // Misconfigured identity is fatal before any store call is attempted.
    if actor_id.trim().is_empty() {
        return Err(crate::identity::IdentityError::EmptyActor.into());
    }

    let store: Arc<dyn MemoryStore> = Arc::from(create_store(&config.store)?);
    let strategy = config.memory.semantic.then(|| SemanticStrategy {
        name: config.memory.strategy_name.clone(),
        namespace_template: config.memory.namespace_template.clone(),
    });
    let resource = find_or_create_resource(
        store.as_ref(),
        &config.memory.resource_name,
        config.memory.retention_days,
        strategy,
    )
    .await
    .context("failed to resolve the memory resource")?;

    let identity = SessionIdentity::new(&actor_id, &resource.id)?;
    info!(
        actor = %identity.actor_id,
        memory = %identity.memory_id,
        session = %identity.session_id,
        "conversation identity resolved"
    );

    let namespace = resource
        .strategy
        .as_ref()
        .map(|s| s.namespace_for(&identity.actor_id));
    let hooks = MemoryHookProvider::new(
        store,
        identity,
        config.memory.recall_turns,
        namespace,
    );

    let provider_name = provider_override
        .or_else(|| config.default_provider.clone())
        .unwrap_or_else(|| "openai".to_string());
    let provider = create_provider(&provider_name, None, config.provider_url.as_deref())?;
    let options = ChatOptions {
        model: model_override
            .or_else(|| config.default_model.clone())
            .unwrap_or_else(|| "gpt-4o-mini".to_string()),
        temperature: temperature.unwrap_or(config.default_temperature),
        system_prompt: config.system_prompt.clone(),
    };

    let mut agent = Agent::new(provider, hooks, options);

    if let Some(message) = message {
        let report = agent.process_message(&message).await?;
        print_notices(&report);
        println!("{}", report.reply);
        return Ok(());
    }

    println!("engram · memory: {} [{}]", resource.name, resource.id);
    println!("Type a message, or 'exit' to quit.\n");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        print!("you> ");
        use std::io::Write;
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match agent.process_message(input).await {
            Ok(report) => {
                print_notices(&report);
                println!("engram> {}\n", report.reply);
            }
            Err(err) => {
                eprintln!("error: {err:#}\n");
            }
        }
    }

    Ok(())
}

fn print_notices(report: &TurnReport) {
    if report.loaded > 0 {
        println!("🔄 Loaded {} messages from memory", report.loaded);
    }
    if report.injected > 0 {
        println!("🧠 Retrieved {} memories", report.injected);
    }
    if report.persisted {
        println!("💾 Saved to memory");
    }
}
