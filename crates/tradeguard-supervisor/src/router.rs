//! Routing decisions
//!
//! A [`RoutingDecision`] picks the agent for the next hop of a turn. The
//! supervisor treats its answer as untrusted: `None`, a name that is not a
//! registered agent, or an error all end the turn with a fallback.
//!
//! Two implementations are provided:
//! - [`KeywordRouter`]: deterministic keyword scoring over the descriptors
//! - [`ModelRouter`]: asks a language model through a [`CompletionClient`]

use crate::registry::AgentDescriptor;
use async_trait::async_trait;
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use tracing::debug;
use tradeguard_core::{Error, Result};

/// The hop that just finished, when routing again within a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorHop {
    pub agent: String,
    /// Sanitized output of that hop
    pub output: String,
    /// Hops completed so far in this turn
    pub hop: u32,
}

/// Chooses the agent for the next hop
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutingDecision: Send + Sync {
    /// Name of the next agent, or `None` when no agent should run
    async fn decide<'a>(
        &self,
        input: &str,
        agents: &[AgentDescriptor],
        prior: Option<&'a PriorHop>,
    ) -> Result<Option<String>>;
}

/// Rule-based router scoring keyword hits per agent
///
/// On a follow-up hop an agent named in the prior output wins outright;
/// otherwise the prior agent is excluded from scoring. Ties go to the agent
/// declared first. With no hits the default agent is used, if any.
#[derive(Debug, Clone, Default)]
pub struct KeywordRouter {
    default_agent: Option<String>,
}

impl KeywordRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agent used when no keyword matches
    pub fn with_default(mut self, agent: impl Into<String>) -> Self {
        self.default_agent = Some(agent.into());
        self
    }

    /// Number of the descriptor's keywords found in `input`
    pub fn score(input: &str, agent: &AgentDescriptor) -> usize {
        let normalized = normalize(input);
        agent
            .keywords
            .iter()
            .filter(|kw| normalized.contains(&format!(" {} ", kw.trim())))
            .count()
    }

    fn explicit_handoff<'a>(
        prior: &PriorHop,
        agents: &'a [AgentDescriptor],
    ) -> Option<&'a AgentDescriptor> {
        let output = prior.output.to_lowercase();
        agents
            .iter()
            .filter(|a| a.name != prior.agent)
            .filter_map(|a| output.find(&a.name.to_lowercase()).map(|pos| (pos, a)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, a)| a)
    }
}

/// Lower-case words separated and surrounded by single spaces
fn normalize(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '/' || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    format!(" {} ", words.join(" "))
}

#[async_trait]
impl RoutingDecision for KeywordRouter {
    async fn decide<'a>(
        &self,
        input: &str,
        agents: &[AgentDescriptor],
        prior: Option<&'a PriorHop>,
    ) -> Result<Option<String>> {
        if let Some(prior) = prior {
            if let Some(agent) = Self::explicit_handoff(prior, agents) {
                debug!(from = %prior.agent, to = %agent.name, "Explicit handoff");
                return Ok(Some(agent.name.clone()));
            }
        }

        let excluded = prior.map(|p| p.agent.as_str());
        let mut best: Option<(&AgentDescriptor, usize)> = None;
        for agent in agents.iter().filter(|a| Some(a.name.as_str()) != excluded) {
            let score = Self::score(input, agent);
            debug!(agent = %agent.name, score, "Keyword score");
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((agent, score));
            }
        }

        if let Some((agent, _)) = best {
            return Ok(Some(agent.name.clone()));
        }

        Ok(self
            .default_agent
            .clone()
            .filter(|name| Some(name.as_str()) != excluded))
    }
}

/// Text completion backend used by [`ModelRouter`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Reply a model gives when no further agent is needed
pub const FINISH: &str = "FINISH";

const ROUTING_TEMPLATE: &str = "\
You are the supervisor of a trading assistant. Choose the agent that should handle the user's request.

Agents:
{% for agent in agents %}- {{ agent.name }}: {{ agent.routing_hint }}
{% endfor %}
{% if prior %}The agent {{ prior.agent }} already replied:
{{ prior.output }}

{% endif %}Answer with exactly one agent name, or FINISH if no agent is needed.

User request: {{ input }}";

/// Router delegating the choice to a language model
pub struct ModelRouter<C: CompletionClient> {
    client: C,
    env: Environment<'static>,
}

impl<C: CompletionClient> ModelRouter<C> {
    pub fn new(client: C) -> Result<Self> {
        Self::with_template(client, ROUTING_TEMPLATE)
    }

    /// Use a custom routing prompt
    ///
    /// The template receives `input`, `agents` and `prior` (absent on the
    /// first hop).
    pub fn with_template(client: C, template: &'static str) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("routing", template)
            .map_err(|e| Error::InitializationFailed(format!("Invalid routing template: {e}")))?;
        Ok(Self { client, env })
    }

    /// Render the prompt sent to the model
    pub fn render_prompt(
        &self,
        input: &str,
        agents: &[AgentDescriptor],
        prior: Option<&PriorHop>,
    ) -> Result<String> {
        self.env
            .get_template("routing")
            .and_then(|t| t.render(context! { input => input, agents => agents, prior => prior }))
            .map_err(|e| Error::Routing(format!("Failed to render routing prompt: {e}")))
    }

    /// Map a model reply onto an agent name
    fn parse_reply(reply: &str, agents: &[AgentDescriptor]) -> Option<String> {
        let answer = reply
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())?
            .trim_matches(|c: char| !(c.is_alphanumeric() || c == '_'));

        if answer.eq_ignore_ascii_case(FINISH) {
            return None;
        }
        agents
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(answer))
            .map(|a| a.name.clone())
    }
}

#[async_trait]
impl<C: CompletionClient> RoutingDecision for ModelRouter<C> {
    async fn decide<'a>(
        &self,
        input: &str,
        agents: &[AgentDescriptor],
        prior: Option<&'a PriorHop>,
    ) -> Result<Option<String>> {
        let prompt = self.render_prompt(input, agents, prior)?;
        let reply = self.client.complete(&prompt).await?;
        let choice = Self::parse_reply(&reply, agents);
        debug!(reply = %reply.trim(), ?choice, "Model routing decision");
        Ok(choice)
    }
}
