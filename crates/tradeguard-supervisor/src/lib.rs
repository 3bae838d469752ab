//! Supervisor for tradeguard
//!
//! The [`Supervisor`] owns the turn lifecycle of a guarded multi-agent
//! trading assistant. It screens each message with the input guardrail,
//! routes it to one of the registered agents, gives that agent tools only
//! through a [`GuardedToolbox`], screens every draft with the output
//! guardrail, and records the result as a [`Turn`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use tradeguard_supervisor::Supervisor;
//! # use tradeguard_core::{Agent, AgentReply, Context, Result, ToolInvoker};
//! # struct Echo(&'static str);
//! # #[async_trait::async_trait]
//! # impl Agent for Echo {
//! #     async fn run(&self, input: &str, _: &Context, _: &dyn ToolInvoker) -> Result<AgentReply> {
//! #         Ok(AgentReply::final_answer(input))
//! #     }
//! #     fn name(&self) -> &str { self.0 }
//! # }
//!
//! # async fn demo() -> tradeguard_core::Result<()> {
//! let supervisor = Supervisor::builder()
//!     .agent(Arc::new(Echo("faq_agent")))
//!     .agent(Arc::new(Echo("task_agent")))
//!     .agent(Arc::new(Echo("market_insights_agent")))
//!     .build()?;
//!
//! let outcome = supervisor.handle("session-1", "What are the fees?").await;
//! println!("{}", outcome.response);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod session;
pub mod supervisor;
pub mod toolbox;

pub use config::{SupervisorConfig, SupervisorConfigBuilder};
pub use error::Diagnostic;
pub use events::{ChannelSink, Event, EventSink, NoopSink, SinkError, TracingSink};
pub use metrics::{MetricsSummary, MetricsTracker, ToolStats};
pub use registry::{AgentDescriptor, AgentRegistry, FAQ_AGENT, MARKET_INSIGHTS_AGENT, TASK_AGENT};
pub use router::{CompletionClient, FINISH, KeywordRouter, ModelRouter, PriorHop, RoutingDecision};
pub use session::{HopRecord, Session, SessionStore, Turn};
pub use supervisor::{Supervisor, SupervisorBuilder, TurnOutcome};
pub use toolbox::GuardedToolbox;
