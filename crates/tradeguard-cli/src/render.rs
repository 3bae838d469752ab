//! Terminal rendering of turn traces and metrics

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use tradeguard_core::GuardrailVerdict;
use tradeguard_supervisor::{MetricsSummary, Turn};

const CELL_WIDTH: usize = 60;

/// Short form of a verdict, e.g. `reject (injection)`
pub fn verdict_label(verdict: &GuardrailVerdict) -> String {
    match verdict {
        GuardrailVerdict::Allow => "allow".to_string(),
        GuardrailVerdict::Sanitize { rules } => format!("sanitize ({})", rules.join(", ")),
        GuardrailVerdict::Reject { reason, .. } => format!("reject ({reason})"),
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= CELL_WIDTH {
        return text.to_string();
    }
    let head: String = text.chars().take(CELL_WIDTH - 1).collect();
    format!("{head}…")
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Stage-by-stage view of one turn
pub fn trace_table(turn: &Turn) -> Table {
    let mut table = new_table(vec!["Stage", "Agent / Tool", "Detail", "Verdict"]);

    table.add_row(vec![
        "input".to_string(),
        "-".to_string(),
        truncate(&turn.sanitized_input),
        verdict_label(&turn.input_verdict),
    ]);
    for (i, hop) in turn.hops.iter().enumerate() {
        table.add_row(vec![
            format!("hop {}", i + 1),
            hop.agent.clone(),
            truncate(&hop.output),
            verdict_label(&hop.verdict),
        ]);
    }
    for call in &turn.tool_calls {
        let status = if call.executed() { "executed" } else { "blocked" };
        table.add_row(vec![
            format!("tool ({status})"),
            call.tool.clone(),
            truncate(&call.arguments.to_string()),
            verdict_label(&call.verdict),
        ]);
    }
    table.add_row(vec![
        "result".to_string(),
        turn.agent.clone().unwrap_or_else(|| "-".to_string()),
        turn.diagnostic
            .as_ref()
            .map_or_else(|| "answered".to_string(), ToString::to_string),
        format!("{} ms", turn.latency_ms),
    ]);
    table
}

/// Totals accumulated over the session
pub fn metrics_table(summary: &MetricsSummary) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);

    table.add_row(vec!["turns".to_string(), summary.total_turns.to_string()]);
    table.add_row(vec!["answered".to_string(), summary.answered_turns.to_string()]);
    table.add_row(vec!["rejected inputs".to_string(), summary.rejected_inputs.to_string()]);
    table.add_row(vec![
        "average latency".to_string(),
        format!("{:.1} ms", summary.average_latency_ms),
    ]);
    for (code, count) in &summary.fallbacks {
        table.add_row(vec![format!("fallback: {code}"), count.to_string()]);
    }
    for (agent, count) in &summary.agent_usage {
        table.add_row(vec![format!("agent: {agent}"), count.to_string()]);
    }
    for (tool, stats) in &summary.tool_usage {
        table.add_row(vec![
            format!("tool: {tool}"),
            format!(
                "{} ok / {} rejected / {} failed",
                stats.succeeded, stats.rejected, stats.failed
            ),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeguard_core::RejectReason;

    #[test]
    fn test_verdict_labels() {
        assert_eq!(verdict_label(&GuardrailVerdict::Allow), "allow");
        assert_eq!(
            verdict_label(&GuardrailVerdict::reject(RejectReason::InvalidQuantity)),
            "reject (invalid_quantity)"
        );
        assert_eq!(
            verdict_label(&GuardrailVerdict::Sanitize {
                rules: vec!["sensitive.card_number".to_string()]
            }),
            "sanitize (sensitive.card_number)"
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short"), "short");
        let long = "x".repeat(100);
        assert_eq!(truncate(&long).chars().count(), CELL_WIDTH);
    }

    #[test]
    fn test_metrics_table_lists_fallbacks() {
        let summary = MetricsSummary {
            total_turns: 2,
            fallbacks: [("input_rejected".to_string(), 1)].into_iter().collect(),
            ..MetricsSummary::default()
        };
        let rendered = metrics_table(&summary).to_string();
        assert!(rendered.contains("fallback: input_rejected"));
    }
}
