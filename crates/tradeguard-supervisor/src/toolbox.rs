//! Guarded tool access for agents

use crate::events::{self, Event, EventSink};
use crate::registry::AgentDescriptor;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{info, warn};
use tradeguard_core::{GuardrailVerdict, RejectReason, ToolCall, ToolInvoker, ToolOutcome};
use tradeguard_guardrails::ToolGuardrail;
use tradeguard_tools::ToolRegistry;
use uuid::Uuid;

/// The only path from an agent to its tools
///
/// Built per hop for one agent. Every invocation is checked against the
/// agent's declared tools and the tool guardrail before the registry runs
/// it, and every invocation is recorded, executed or not.
pub struct GuardedToolbox {
    session_id: String,
    turn_id: Uuid,
    agent: AgentDescriptor,
    guardrail: Arc<ToolGuardrail>,
    registry: Arc<ToolRegistry>,
    events: Arc<dyn EventSink>,
    calls: Mutex<Vec<ToolCall>>,
}

impl GuardedToolbox {
    pub fn new(
        session_id: impl Into<String>,
        turn_id: Uuid,
        agent: AgentDescriptor,
        guardrail: Arc<ToolGuardrail>,
        registry: Arc<ToolRegistry>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            turn_id,
            agent,
            guardrail,
            registry,
            events,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Calls recorded so far
    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Consume the toolbox, returning every recorded call
    pub fn into_calls(self) -> Vec<ToolCall> {
        self.calls.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn verdict_for(&self, tool: &str, arguments: &Value) -> GuardrailVerdict {
        if !self.agent.allows(tool) {
            warn!(agent = %self.agent.name, tool, "Tool not declared for agent");
            return GuardrailVerdict::reject(RejectReason::ToolNotAllowed);
        }
        self.guardrail.check_tool_call(&self.session_id, tool, arguments)
    }

    fn record(&self, call: ToolCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl ToolInvoker for GuardedToolbox {
    async fn invoke(&self, tool: &str, arguments: Value) -> ToolOutcome {
        let verdict = self.verdict_for(tool, &arguments);
        events::emit(
            self.events.as_ref(),
            Event::ToolVerdict {
                session_id: self.session_id.clone(),
                turn_id: self.turn_id,
                agent: self.agent.name.clone(),
                tool: tool.to_string(),
                verdict: verdict.clone(),
            },
        );

        if let Some(reason) = verdict.reason() {
            self.record(ToolCall::new(
                tool,
                arguments,
                verdict,
                ToolOutcome::Rejected { reason },
            ));
            return ToolOutcome::Rejected { reason };
        }

        let arguments = self.guardrail.normalize_arguments(tool, &arguments);
        let start = Instant::now();
        let outcome = match self.registry.execute(tool, arguments.clone()).await {
            Ok(output) => ToolOutcome::Success { output },
            Err(e) => {
                warn!(tool, error = %e, "Tool execution failed");
                ToolOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        info!(
            agent = %self.agent.name,
            tool,
            success = outcome.is_success(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool executed"
        );

        self.record(ToolCall::new(tool, arguments, verdict, outcome.clone()));
        outcome
    }

    fn available_tools(&self) -> Vec<String> {
        self.agent.allowed_tools.clone()
    }
}
