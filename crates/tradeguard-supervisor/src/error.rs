//! Turn diagnostics

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradeguard_core::RejectReason;

/// Why a turn ended without a normal agent answer
///
/// Diagnostics are recorded on the turn and reported in events; they are
/// never returned as an `Err` from the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The input guardrail rejected the user message
    #[error("Input rejected: {reason}")]
    InputRejected { reason: RejectReason },

    /// The output guardrail rejected an agent draft
    #[error("Output of {agent} rejected: {reason}")]
    OutputRejected { agent: String, reason: RejectReason },

    /// Routing produced no usable agent
    #[error("No agent resolved: {detail}")]
    AgentUnresolved { detail: String },

    /// Agents kept handing off past the hop bound
    #[error("Hop limit of {max_hops} exceeded")]
    HopLimitExceeded { max_hops: u32 },

    /// The agent/tool loop ran past the turn deadline
    #[error("Turn timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// An agent returned an error
    #[error("Agent {agent} failed: {error}")]
    AgentFailed { agent: String, error: String },
}

impl Diagnostic {
    /// Stable reason code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputRejected { .. } => "input_rejected",
            Self::OutputRejected { .. } => "output_rejected",
            Self::AgentUnresolved { .. } => "agent_unresolved",
            Self::HopLimitExceeded { .. } => "hop_limit_exceeded",
            Self::Timeout { .. } => "timeout",
            Self::AgentFailed { .. } => "agent_failed",
        }
    }
}
