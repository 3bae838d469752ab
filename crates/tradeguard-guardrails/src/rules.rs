//! Rule tables
//!
//! Rules are plain data: an id, a category, an action and a pattern. The
//! built-in tables below are compiled once into a [`RuleSet`] when a
//! guardrail is constructed and never change afterwards. Patterns are
//! matched case-insensitively unless a rule opts out with
//! [`RuleSpec::match_case`].

use crate::error::{GuardrailError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tradeguard_core::RejectReason;

/// What kind of content a rule detects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Injection,
    OffTopic,
    SensitiveData,
    HarmfulCode,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Injection => "injection",
            Self::OffTopic => "off_topic",
            Self::SensitiveData => "sensitive_data",
            Self::HarmfulCode => "harmful_code",
        }
    }

    /// Reason reported when a block rule of this category fires
    pub fn reject_reason(self) -> RejectReason {
        match self {
            Self::Injection => RejectReason::Injection,
            Self::OffTopic | Self::SensitiveData => RejectReason::OffTopic,
            Self::HarmfulCode => RejectReason::HarmfulCode,
        }
    }
}

/// What happens to content matching a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// The whole text is rejected
    Block,
    /// The matched span is rewritten
    Redact,
}

/// Uncompiled rule, as written in a table
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub id: &'static str,
    pub category: RuleCategory,
    pub action: RuleAction,
    pub pattern: &'static str,
    /// Label used in redaction markers; defaults to the category
    pub label: Option<&'static str>,
    pub case_sensitive: bool,
}

impl RuleSpec {
    /// Match the pattern exactly as written instead of ignoring case
    pub const fn match_case(self) -> Self {
        Self {
            case_sensitive: true,
            ..self
        }
    }
}

const fn block(id: &'static str, category: RuleCategory, pattern: &'static str) -> RuleSpec {
    RuleSpec {
        id,
        category,
        action: RuleAction::Block,
        pattern,
        label: None,
        case_sensitive: false,
    }
}

const fn redact(
    id: &'static str,
    category: RuleCategory,
    pattern: &'static str,
    label: &'static str,
) -> RuleSpec {
    RuleSpec {
        id,
        category,
        action: RuleAction::Redact,
        pattern,
        label: Some(label),
        case_sensitive: false,
    }
}

use RuleCategory::{HarmfulCode, Injection, OffTopic, SensitiveData};

/// Rules applied to user input, in evaluation order
pub const INPUT_RULES: &[RuleSpec] = &[
    // Attempts to override system behavior
    block(
        "injection.ignore_instructions",
        Injection,
        r"ignore\s+(?:all\s+)?(?:previous|above|prior|all)\s+(?:instructions|prompts|rules)",
    ),
    block("injection.forget", Injection, r"forget\s+(?:everything|all|previous)"),
    block("injection.role_reassignment", Injection, r"you\s+are\s+now\s+(?:a|an)\s+"),
    block("injection.act_as", Injection, r"act\s+as\s+(?:if\s+you\s+are\s+)?(?:a|an)\s+"),
    block("injection.system_prefix", Injection, r"\bsystem\s*:"),
    block("injection.role_token", Injection, r"<\|(?:system|assistant|user)\|>"),
    block("injection.inst_marker", Injection, r"\[/?INST\]"),
    block("injection.sys_marker", Injection, r"<</?SYS>>"),
    block("injection.header", Injection, r"###\s*(?:system|instruction|prompt)"),
    block("injection.disregard", Injection, r"disregard\s+(?:all|previous|prior)"),
    block(
        "injection.reveal_prompt",
        Injection,
        r"reveal\s+(?:your\s+|the\s+)?(?:system\s+|hidden\s+)?prompt",
    ),
    // Requests unrelated to trading
    block("off_topic.hacking", OffTopic, r"\bhack(?:s|ed|er|ers|ing)?\b"),
    block("off_topic.exploit", OffTopic, r"\bexploit(?:s|ed|ing)?\b"),
    block("off_topic.vulnerability", OffTopic, r"\bvulnerabilit(?:y|ies)\b"),
    block("off_topic.malware", OffTopic, r"\b(?:malware|ransomware|virus(?:es)?)\b"),
    block("off_topic.phishing", OffTopic, r"\bphishing\b"),
    block("off_topic.crypto_mining", OffTopic, r"\bcryptocurrency\s+mining\b"),
    block("off_topic.bitcoin_wallet", OffTopic, r"\bbitcoin\s+wallets?\b"),
    block("off_topic.illegal", OffTopic, r"\billegal(?:ly)?\b"),
    block("off_topic.drugs", OffTopic, r"\b(?:illicit|recreational|street)\s+drugs?\b"),
    block("off_topic.identity", OffTopic, r"\b(?:ssn|social\s+security\s+numbers?)\b"),
    // Suspicious but non-fatal delimiters
    redact("injection.special_token", Injection, r"<\|[a-z_]{1,32}\|>", "TOKEN"),
    redact(
        "injection.zero_width",
        Injection,
        r"[\u{200B}-\u{200D}\u{2060}\u{FEFF}]+",
        "ZERO_WIDTH",
    ),
];

/// Rules applied to agent output, in evaluation order
pub const OUTPUT_RULES: &[RuleSpec] = &[
    // Sensitive data, always redacted
    redact(
        "sensitive.secret_key",
        SensitiveData,
        r"\b(?:sk|pk|rk)[-_](?:live[-_]|test[-_])?[a-z0-9]{4,}[a-z0-9_\-]*(?:\.{3}|…)?",
        "API_KEY",
    ),
    redact("sensitive.api_key_pair", SensitiveData, r"\bapi[_-]?key\s*[:=]\s*\S+", "API_KEY"),
    redact("sensitive.password_pair", SensitiveData, r"\bpassword\s*[:=]\s*\S+", "PASSWORD"),
    redact("sensitive.secret_pair", SensitiveData, r"\bsecret\s*[:=]\s*\S+", "SECRET"),
    redact("sensitive.token_pair", SensitiveData, r"\btoken\s*[:=]\s*\S+", "TOKEN"),
    redact(
        "sensitive.card_number",
        SensitiveData,
        concat!(
            r"\b(?:\d{4} \d{4} \d{4} \d{4}|\d{4}-\d{4}-\d{4}-\d{4}|\d{16}",
            r"|\d{4} \d{6} \d{5}|\d{4}-\d{6}-\d{5}|\d{15})\b",
        ),
        "CARD",
    ),
    redact("sensitive.ssn", SensitiveData, r"\b\d{3}-\d{2}-\d{4}\b", "SSN"),
    // Upper-case only, so long ordinary words are left alone
    redact("sensitive.bare_token", SensitiveData, r"\b[A-Z0-9]{20,}\b", "TOKEN").match_case(),
    // Domain boundary: content that must never reach the user
    block("off_domain.hacking", OffTopic, r"\bhack(?:s|ed|er|ers|ing)?\b"),
    block("off_domain.exploit", OffTopic, r"\bexploit(?:s|ed|ing)?\b"),
    block("off_domain.vulnerability", OffTopic, r"\bvulnerabilit(?:y|ies)\b"),
    block("off_domain.malware", OffTopic, r"\b(?:malware|virus(?:es)?)\b"),
    block("off_domain.illegal_activity", OffTopic, r"\billegal\s+activit(?:y|ies)\b"),
    block("off_domain.weapons", OffTopic, r"\bweapons?\b"),
    block("off_domain.violence", OffTopic, r"\bviolence\b"),
    block("off_domain.drugs", OffTopic, r"\b(?:illicit|illegal|recreational|street)\s+drugs?\b"),
    block(
        "off_domain.code_request",
        OffTopic,
        r"\b(?:generate\s+code\s+for|write\s+a\s+script\s+to|execute\s+command)\b",
    ),
    block(
        "off_domain.intrusion",
        OffTopic,
        r"\b(?:bypass\s+security|crack\s+passwords?|unauthorized\s+access)\b",
    ),
    block(
        "code.fenced_block",
        HarmfulCode,
        r"```\s*(?:python|bash|sh|shell|javascript|js|sql)\b",
    ),
    block("code.script_tag", HarmfulCode, r"<script[^>]*>"),
    block("code.eval", HarmfulCode, r"\beval\s*\("),
    block("code.exec", HarmfulCode, r"\bexec\s*\("),
    block("code.subprocess", HarmfulCode, r"\bsubprocess\."),
    block("code.os_system", HarmfulCode, r"\bos\.system\s*\("),
];

/// A compiled, immutable rule
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    category: RuleCategory,
    action: RuleAction,
    label: Option<String>,
    regex: Regex,
}

impl Rule {
    /// Compile a case-insensitive rule
    pub fn new(
        id: impl Into<String>,
        category: RuleCategory,
        action: RuleAction,
        pattern: &str,
    ) -> Result<Self> {
        Self::build(id.into(), category, action, pattern, false)
    }

    /// Compile a rule that matches case exactly
    pub fn case_sensitive(
        id: impl Into<String>,
        category: RuleCategory,
        action: RuleAction,
        pattern: &str,
    ) -> Result<Self> {
        Self::build(id.into(), category, action, pattern, true)
    }

    fn build(
        id: String,
        category: RuleCategory,
        action: RuleAction,
        pattern: &str,
        case_sensitive: bool,
    ) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|source| GuardrailError::InvalidRule {
                id: id.clone(),
                source,
            })?;

        Ok(Self {
            id,
            category,
            action,
            label: None,
            regex,
        })
    }

    /// Set the label used in redaction markers
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> RuleCategory {
        self.category
    }

    pub fn action(&self) -> RuleAction {
        self.action
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Placeholder written in place of a redacted span, e.g. `[REDACTED-CARD]`
    pub fn marker(&self) -> String {
        let label = self
            .label
            .clone()
            .unwrap_or_else(|| self.category.as_str().to_uppercase());
        format!("[REDACTED-{label}]")
    }
}

impl TryFrom<&RuleSpec> for Rule {
    type Error = GuardrailError;

    fn try_from(spec: &RuleSpec) -> Result<Self> {
        let rule = if spec.case_sensitive {
            Rule::case_sensitive(spec.id, spec.category, spec.action, spec.pattern)?
        } else {
            Rule::new(spec.id, spec.category, spec.action, spec.pattern)?
        };
        Ok(match spec.label {
            Some(label) => rule.with_label(label),
            None => rule,
        })
    }
}

/// Ordered collection of compiled rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Compile a table of rule specs, keeping declaration order
    pub fn compile(specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs.iter().map(Rule::try_from).collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Built-in input rules
    pub fn input_defaults() -> Result<Self> {
        Self::compile(INPUT_RULES)
    }

    /// Built-in output rules
    pub fn output_defaults() -> Result<Self> {
        Self::compile(OUTPUT_RULES)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
