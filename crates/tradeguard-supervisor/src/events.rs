//! Observability events
//!
//! The supervisor reports every guardrail verdict, routing transition and
//! finished turn to an [`EventSink`]. Emission is fire-and-forget: a sink
//! failure is logged and never affects the turn.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tradeguard_core::GuardrailVerdict;
use uuid::Uuid;

/// Something that happened during a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    InputVerdict {
        session_id: String,
        turn_id: Uuid,
        verdict: GuardrailVerdict,
    },
    ToolVerdict {
        session_id: String,
        turn_id: Uuid,
        agent: String,
        tool: String,
        verdict: GuardrailVerdict,
    },
    OutputVerdict {
        session_id: String,
        turn_id: Uuid,
        agent: String,
        hop: u32,
        verdict: GuardrailVerdict,
    },
    Routed {
        session_id: String,
        turn_id: Uuid,
        from: Option<String>,
        to: String,
        hop: u32,
    },
    TurnCompleted {
        session_id: String,
        turn_id: Uuid,
        agent: Option<String>,
        /// Diagnostic code, absent for a normal answer
        diagnostic: Option<String>,
        latency_ms: u64,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputVerdict { .. } => "input_verdict",
            Self::ToolVerdict { .. } => "tool_verdict",
            Self::OutputVerdict { .. } => "output_verdict",
            Self::Routed { .. } => "routed",
            Self::TurnCompleted { .. } => "turn_completed",
        }
    }

    pub fn turn_id(&self) -> Uuid {
        match self {
            Self::InputVerdict { turn_id, .. }
            | Self::ToolVerdict { turn_id, .. }
            | Self::OutputVerdict { turn_id, .. }
            | Self::Routed { turn_id, .. }
            | Self::TurnCompleted { turn_id, .. } => *turn_id,
        }
    }
}

/// Why an event could not be delivered
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Event channel is closed")]
    Closed,

    #[error("Event channel is full")]
    Full,

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Destination for turn events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event) -> Result<(), SinkError>;
}

/// Emit an event, logging and discarding any failure
pub(crate) fn emit(sink: &dyn EventSink, event: Event) {
    if let Err(e) = sink.emit(&event) {
        warn!(event = event.kind(), error = %e, "Failed to emit event");
    }
}

/// Writes each event as a JSON `tracing` record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &Event) -> Result<(), SinkError> {
        let payload = serde_json::to_string(event)?;
        info!(target: "tradeguard::events", event = event.kind(), %payload);
        Ok(())
    }
}

/// Forwards events into a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<Event>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &Event) -> Result<(), SinkError> {
        self.sender.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &Event) -> Result<(), SinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn routed() -> Event {
        Event::Routed {
            session_id: "s1".to_string(),
            turn_id: Uuid::new_v4(),
            from: None,
            to: "faq_agent".to_string(),
            hop: 0,
        }
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(routed()).unwrap();
        assert_eq!(json["event"], "routed");
        assert_eq!(json["to"], "faq_agent");
        assert!(json["from"].is_null());
    }

    #[test]
    fn test_channel_sink_delivers_and_reports_failures() {
        let (sink, mut receiver) = ChannelSink::new(1);
        let event = routed();

        sink.emit(&event).unwrap();
        assert!(matches!(sink.emit(&event), Err(SinkError::Full)));
        assert_eq!(receiver.try_recv().unwrap(), event);

        drop(receiver);
        assert!(matches!(sink.emit(&event), Err(SinkError::Closed)));
    }

    #[test]
    fn test_emit_swallows_errors() {
        let (sink, receiver) = ChannelSink::new(1);
        drop(receiver);
        emit(&sink, routed());
        emit(&NoopSink, routed());
        emit(&TracingSink, routed());
    }
}
