//! Core contracts for tradeguard
//!
//! This crate defines the types shared by the guardrail layers and the
//! supervisor: the `Agent` and `ToolInvoker` traits an agent implementation
//! plugs into, the tri-state `GuardrailVerdict`, tool-call records, the
//! conversation `Context`, and the common error type.

pub mod agent;
pub mod context;
pub mod error;
pub mod tool_call;
pub mod verdict;

pub use agent::{Agent, AgentReply, Signal};
pub use context::{Context, Message, Role};
pub use error::{Error, Result};
pub use tool_call::{ToolCall, ToolInvoker, ToolOutcome};
pub use verdict::{GuardrailVerdict, RejectReason};
