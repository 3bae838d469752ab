//! Pattern matching and redaction
//!
//! [`PatternMatcher`] is the text-classification primitive shared by the
//! input and output guardrails. It is stateless: evaluation and redaction
//! are pure functions of their arguments.

use crate::rules::{Rule, RuleSet};
use std::borrow::Cow;
use std::ops::Range;

/// A rule that matched, and where
#[derive(Debug, Clone)]
pub struct Match<'r> {
    pub rule: &'r Rule,
    /// Byte range of the match in the evaluated text
    pub span: Range<usize>,
}

/// Stateless rule evaluator
pub struct PatternMatcher;

impl PatternMatcher {
    /// Evaluate every rule against `text`
    ///
    /// Rules are visited in declaration order and every non-overlapping
    /// match of each rule is returned, so the result is grouped by rule and
    /// ordered by position within a rule.
    pub fn evaluate<'r>(
        text: &str,
        rules: impl IntoIterator<Item = &'r Rule>,
    ) -> Vec<Match<'r>> {
        let mut matches = Vec::new();
        for rule in rules {
            for found in rule.regex().find_iter(text) {
                if found.start() == found.end() {
                    continue;
                }
                matches.push(Match {
                    rule,
                    span: found.range(),
                });
            }
        }
        matches
    }

    /// Evaluate a whole rule set
    pub fn evaluate_set<'r>(text: &str, rules: &'r RuleSet) -> Vec<Match<'r>> {
        Self::evaluate(text, rules.iter())
    }

    /// Replace each matched span with its rule's redaction marker
    ///
    /// Text outside the matches is copied verbatim. Overlapping spans are
    /// merged and the earliest-starting match supplies the marker.
    pub fn redact(text: &str, matches: &[Match<'_>]) -> String {
        Self::rewrite(text, matches, |rule| Cow::Owned(rule.marker()))
    }

    /// Remove each matched span
    pub fn strip(text: &str, matches: &[Match<'_>]) -> String {
        Self::rewrite(text, matches, |_| Cow::Borrowed(""))
    }

    /// Distinct ids of the matched rules, in first-seen order
    pub fn rule_ids(matches: &[Match<'_>]) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for m in matches {
            if !ids.iter().any(|id| id == m.rule.id()) {
                ids.push(m.rule.id().to_string());
            }
        }
        ids
    }

    fn rewrite<'r, F>(text: &str, matches: &[Match<'r>], replacement: F) -> String
    where
        F: Fn(&'r Rule) -> Cow<'static, str>,
    {
        let mut spans: Vec<(Range<usize>, &'r Rule)> =
            matches.iter().map(|m| (m.span.clone(), m.rule)).collect();
        spans.sort_by(|a, b| a.0.start.cmp(&b.0.start).then(b.0.end.cmp(&a.0.end)));

        let mut merged: Vec<(Range<usize>, &'r Rule)> = Vec::with_capacity(spans.len());
        for (span, rule) in spans {
            match merged.last_mut() {
                Some((last, _)) if span.start < last.end => {
                    last.end = last.end.max(span.end);
                }
                _ => merged.push((span, rule)),
            }
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (span, rule) in merged {
            out.push_str(&text[cursor..span.start]);
            out.push_str(&replacement(rule));
            cursor = span.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}
