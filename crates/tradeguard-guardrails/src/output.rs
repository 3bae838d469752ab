//! Agent output validation

use crate::error::Result;
use crate::input::CheckResult;
use crate::matcher::PatternMatcher;
use crate::rules::{RuleAction, RuleSet};
use tracing::{debug, info, warn};
use tradeguard_core::{GuardrailVerdict, RejectReason};

/// Text shown in place of a draft that fails the domain boundary
pub const SAFE_FALLBACK_MESSAGE: &str =
    "I apologize, but I cannot provide that response due to security policies.";

/// Screens agent drafts before they reach the user
#[derive(Debug, Clone)]
pub struct OutputGuardrail {
    rules: RuleSet,
    fallback: String,
}

impl OutputGuardrail {
    pub fn new(rules: RuleSet, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// Guardrail with the built-in output rules and fallback message
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(RuleSet::output_defaults()?, SAFE_FALLBACK_MESSAGE))
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Check an agent draft
    ///
    /// Sensitive data is redacted first, then the raw draft is scanned for
    /// content outside the trading domain. A boundary match replaces the
    /// whole text with the fallback message.
    pub fn check(&self, draft: &str) -> CheckResult {
        if draft.trim().is_empty() {
            debug!("Rejected empty output");
            return self.reject(RejectReason::EmptyOutput, Vec::new());
        }

        let redactors = self.rules.iter().filter(|r| r.action() == RuleAction::Redact);
        let redactions = PatternMatcher::evaluate(draft, redactors);

        let blockers = self.rules.iter().filter(|r| r.action() == RuleAction::Block);
        if let Some(hit) = PatternMatcher::evaluate(draft, blockers).first() {
            let reason = hit.rule.category().reject_reason();
            warn!(rule = hit.rule.id(), %reason, "Output rejected");
            return self.reject(reason, vec![hit.rule.id().to_string()]);
        }

        if redactions.is_empty() {
            debug!("Output allowed");
            return CheckResult {
                text: draft.to_string(),
                verdict: GuardrailVerdict::Allow,
            };
        }

        let rules = PatternMatcher::rule_ids(&redactions);
        info!(?rules, "Output redacted");
        CheckResult {
            text: PatternMatcher::redact(draft, &redactions),
            verdict: GuardrailVerdict::Sanitize { rules },
        }
    }

    fn reject(&self, reason: RejectReason, rules: Vec<String>) -> CheckResult {
        CheckResult {
            text: self.fallback.clone(),
            verdict: GuardrailVerdict::Reject { reason, rules },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guardrail() -> OutputGuardrail {
        OutputGuardrail::with_defaults().unwrap()
    }

    #[test]
    fn test_no_match_unchanged() {
        let draft = "Your order for 10 shares of MSFT was placed as a market order.";
        let result = guardrail().check(draft);
        assert_eq!(result.verdict, GuardrailVerdict::Allow);
        assert_eq!(result.text, draft);
    }

    #[test]
    fn test_api_key_redacted() {
        let result = guardrail().check("The API key is sk-live-abc123...");
        assert_eq!(result.text, "The API key is [REDACTED-API_KEY]");
        assert_eq!(
            result.verdict,
            GuardrailVerdict::Sanitize {
                rules: vec!["sensitive.secret_key".to_string()]
            }
        );
    }

    #[test]
    fn test_card_number_redacted() {
        let guardrail = guardrail();
        for draft in [
            "Card on file: 4111 1111 1111 1111.",
            "Card on file: 4111-1111-1111-1111.",
            "Card on file: 4111111111111111.",
        ] {
            let result = guardrail.check(draft);
            assert_eq!(result.text, "Card on file: [REDACTED-CARD].", "{draft}");
            assert!(result.verdict.is_sanitize());
        }
    }

    #[test]
    fn test_numbers_next_to_cards_kept() {
        let guardrail = guardrail();
        let result = guardrail.check("Card 4111 1111 1111 1111 5 shares were sold");
        assert_eq!(result.text, "Card [REDACTED-CARD] 5 shares were sold");

        let draft = "Your order id is 1700000000000.";
        assert_eq!(guardrail.check(draft).verdict, GuardrailVerdict::Allow);
    }

    #[test]
    fn test_long_words_not_taken_for_tokens() {
        let guardrail = guardrail();
        let draft = "Apple is counterrevolutionary in design";
        let result = guardrail.check(draft);
        assert_eq!(result.verdict, GuardrailVerdict::Allow);
        assert_eq!(result.text, draft);

        let result = guardrail.check("Reference AB12CD34EF56GH78IJ90 is attached");
        assert_eq!(result.text, "Reference [REDACTED-TOKEN] is attached");
    }

    #[test]
    fn test_drug_content_blocked() {
        let guardrail = guardrail();
        let result = guardrail.check("You could also look into buying illicit drugs.");
        assert_eq!(result.text, SAFE_FALLBACK_MESSAGE);
        assert_eq!(result.verdict.rules().to_vec(), vec!["off_domain.drugs".to_string()]);

        let draft = "PFE shares rose after positive drug trial results.";
        assert_eq!(guardrail.check(draft).verdict, GuardrailVerdict::Allow);
    }

    #[test]
    fn test_ssn_and_password_redacted() {
        let result = guardrail().check("SSN 123-45-6789, password: hunter2");
        assert_eq!(result.text, "SSN [REDACTED-SSN], [REDACTED-PASSWORD]");
        assert_eq!(
            result.verdict.rules().to_vec(),
            vec!["sensitive.password_pair".to_string(), "sensitive.ssn".to_string()]
        );
    }

    #[test]
    fn test_harmful_code_replaced_with_fallback() {
        let result = guardrail().check("Sure:\n```python\nimport os\nos.system('rm -rf /')\n```");
        assert_eq!(result.text, SAFE_FALLBACK_MESSAGE);
        assert_eq!(result.verdict.reason(), Some(RejectReason::HarmfulCode));
    }

    #[test]
    fn test_off_domain_overrides_redaction() {
        let result = guardrail().check("Use key sk-test-abcd1234 to bypass security checks");
        assert_eq!(result.text, SAFE_FALLBACK_MESSAGE);
        assert_eq!(result.verdict.reason(), Some(RejectReason::OffTopic));
        assert_eq!(result.verdict.rules().to_vec(), vec!["off_domain.intrusion".to_string()]);
    }

    #[test]
    fn test_empty_output() {
        let guardrail = OutputGuardrail::new(RuleSet::output_defaults().unwrap(), "fallback");
        let result = guardrail.check("  ");
        assert_eq!(result.text, "fallback");
        assert_eq!(result.verdict.reason(), Some(RejectReason::EmptyOutput));
    }
}
