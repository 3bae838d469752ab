//! Conversation context handed to agents
//!
//! The `Context` carries the session identity, the conversation so far
//! (previous turns plus earlier hops of the current turn), and a flexible
//! key-value store for anything else the supervisor wants to pass along.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Well-known context keys
pub mod keys {
    /// Index of the current hop within the turn
    pub const HOP: &str = "hop";
    /// Name of the agent that handled the previous hop
    pub const PRIOR_AGENT: &str = "prior_agent";
    /// Identifier of the current turn
    pub const TURN_ID: &str = "turn_id";
}

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Agent that produced an assistant message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            agent: None,
        }
    }

    pub fn assistant(agent: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            agent: Some(agent.into()),
        }
    }
}

/// Context passed to agents during execution
///
/// # Example
///
/// ```
/// use tradeguard_core::{Context, Message};
///
/// let mut ctx = Context::new("session-123");
/// ctx.push(Message::user("What are your trading hours?"));
///
/// assert_eq!(ctx.session_id(), "session-123");
/// assert_eq!(ctx.history().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    session_id: String,
    history: Vec<Message>,
    data: HashMap<String, serde_json::Value>,
}

impl Context {
    /// Create an empty context for a session
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    /// Seed the context with prior conversation
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Conversation so far, oldest first
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Append a message to the conversation
    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Most recent assistant message, if any
    pub fn last_assistant(&self) -> Option<&Message> {
        self.history.iter().rev().find(|m| m.role == Role::Assistant)
    }

    // =========== Generic Key-Value Operations ===========

    /// Insert a value into the context
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a value from the context
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Get a typed value from the context
    ///
    /// Deserializes the stored JSON value into the requested type.
    pub fn get_typed<T: for<'de> Deserialize<'de>>(&self, key: &str) -> crate::Result<Option<T>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(value) => {
                let typed = serde_json::from_value(value.clone()).map_err(|e| {
                    crate::Error::ProcessingFailed(format!(
                        "Failed to deserialize context value: {e}"
                    ))
                })?;
                Ok(Some(typed))
            }
        }
    }

    /// Remove a value from the context
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }
}
