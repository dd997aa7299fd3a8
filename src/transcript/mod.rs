//! Conversation transcript — turns, the message log, and exchange extraction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (role, text) pair in the conversation.
///
/// Tool results arrive in user-role turns but carry machine output, not
/// conversational text; they are flagged so the memory layer can skip them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub tool_result: bool,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            tool_result: false,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            tool_result: false,
            timestamp: Utc::now(),
        }
    }

    /// A tool-result artifact returned to the model after a tool call.
    pub fn tool_result(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            tool_result: true,
            timestamp: Utc::now(),
        }
    }

    pub fn is_tool_result(&self) -> bool {
        self.tool_result
    }
}

/// A completed user/assistant pair eligible for persistence.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request: Turn,
    pub response: Turn,
}

/// Ordered sequence of turns held for the current in-process conversation.
///
/// Append-only from the runtime's perspective, with two exceptions owned by
/// the memory hooks: seeding the log from persisted history at initialization,
/// and the in-place context injection on the latest pending user turn.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    turns: Vec<Turn>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Turn> {
        self.turns.last_mut()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Replace the whole log with reconstructed history (initialization only).
    pub fn replace(&mut self, turns: Vec<Turn>) {
        self.turns = turns;
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Find the most recent completed exchange in the log, if any.
///
/// Scans backward, skipping tool-result artifacts. The assistant turn must be
/// the very last log entry; an in-flight or tool-interleaved turn is not yet a
/// persistable exchange and yields `None`.
pub fn extract_latest_exchange(log: &MessageLog) -> Option<Exchange> {
    let turns = log.turns();
    let last = turns.last()?;
    if last.role != Role::Assistant || last.is_tool_result() {
        return None;
    }

    let request = turns[..turns.len() - 1]
        .iter()
        .rev()
        .filter(|turn| !turn.is_tool_result())
        .find(|turn| turn.role == Role::User)?;

    Some(Exchange {
        request: request.clone(),
        response: last.clone(),
    })
}
