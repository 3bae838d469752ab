//! Core Agent trait definition

use crate::{Context, Result, ToolInvoker};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Completion signal an agent returns with its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// The reply answers the user; the turn can end
    Final,
    /// Another agent should take over
    Continue,
}

/// One unit of work produced by an agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    /// Draft reply, not yet checked by the output guardrail
    pub draft: String,
    pub signal: Signal,
}

impl AgentReply {
    /// A reply that finishes the turn
    pub fn final_answer(draft: impl Into<String>) -> Self {
        Self {
            draft: draft.into(),
            signal: Signal::Final,
        }
    }

    /// A reply that asks the supervisor to route again
    pub fn handoff(draft: impl Into<String>) -> Self {
        Self {
            draft: draft.into(),
            signal: Signal::Continue,
        }
    }
}

/// Core trait that all agents must implement
///
/// The supervisor hands an agent the sanitized user input, the
/// conversation context, and a tool invoker. Every tool the agent uses has
/// to go through the invoker, which validates the call before anything is
/// executed; a rejected call comes back as an error outcome the agent can
/// react to.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Run one unit of work
    async fn run(
        &self,
        input: &str,
        context: &Context,
        tools: &dyn ToolInvoker,
    ) -> Result<AgentReply>;

    /// Get the agent's name
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_constructors() {
        let reply = AgentReply::final_answer("Market orders fill at the best available price.");
        assert_eq!(reply.signal, Signal::Final);

        let reply = AgentReply::handoff("This needs the trading desk.");
        assert_eq!(reply.signal, Signal::Continue);
        assert_eq!(reply.draft, "This needs the trading desk.");
    }

    #[test]
    fn test_signal_serialization() {
        assert_eq!(
            serde_json::to_value(Signal::Continue).unwrap(),
            serde_json::json!("continue")
        );
    }
}
