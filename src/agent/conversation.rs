//! Conversation history replayed to the model on every turn.

use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Content cut to `max_chars` characters for logging.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// Ordered history of one agent request.
///
/// The first turn is always the system instruction and the second the user's
/// request. Turns are only ever appended.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(system_prompt: &str, request: &str) -> Self {
        Self {
            turns: vec![
                Turn::new(Role::System, system_prompt),
                Turn::new(Role::User, request),
            ],
        }
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::System, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::new(Role::Assistant, content));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The last `n` turns, oldest first.
    pub fn tail(&self, n: usize) -> &[Turn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Iterate system turns from newest to oldest.
    pub fn system_turns_rev(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().rev().filter(|t| t.role == Role::System)
    }
}
