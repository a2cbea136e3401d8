//! Human-readable narrative generation over analysis results.
//!
//! LLM-backed narrative generation is a Non-goal for this crate's execution
//! surface, but the trait shape lets an embedding application plug one in;
//! [`DeterministicNarrator`] is the template-based fallback that needs no
//! network access and is what this crate actually ships.

use crate::engine::{AnalysisResult, Summary};
use crate::cycle::Cycle;
use crate::graph::TransactionGraph;
use crate::scoring::AccountSuspicionScore;

/// Produces human-readable summaries of analysis findings.
pub trait Narrator {
    fn narrate_account(&self, score: &AccountSuspicionScore) -> String;
    fn narrate_cycle(&self, cycle: &Cycle) -> String;
    fn narrate_summary(&self, summary: &Summary) -> String;
    fn recommend(&self, graph: &TransactionGraph, score: &AccountSuspicionScore) -> Vec<String>;
}

/// Deterministic, template-based narrator. No network access, no
/// randomness — the same result always produces the same text.
#[derive(Debug, Clone, Default)]
pub struct DeterministicNarrator;

impl DeterministicNarrator {
    pub fn new() -> Self {
        Self
    }
}

impl Narrator for DeterministicNarrator {
    fn narrate_account(&self, score: &AccountSuspicionScore) -> String {
        format!(
            "Account {} scored {:.1}/100 ({}): ring {:.1}, smurfing {:.1}, shell {:.1}, pattern {:.1}.",
            score.account,
            score.final_score,
            score.risk_level,
            score.ring_score,
            score.smurfing_score,
            score.shell_score,
            score.pattern_score,
        )
    }

    fn narrate_cycle(&self, cycle: &Cycle) -> String {
        format!(
            "Circular flow of {} accounts moving {:.2} across {} transactions (strength {:.2}): {}.",
            cycle.length(),
            cycle.total_amount,
            cycle.num_transactions,
            cycle.strength,
            cycle.accounts.join(" -> "),
        )
    }

    fn narrate_summary(&self, summary: &Summary) -> String {
        format!(
            "{} accounts, {} transactions analyzed: {} cycles, {} smurfing alerts, {} shell alerts, {} high-risk and {} critical-risk accounts ({:.1}% of accounts touched by a cycle).",
            summary.total_accounts,
            summary.total_transactions,
            summary.cycles_found,
            summary.smurfing_alerts,
            summary.shell_alerts,
            summary.high_risk_accounts,
            summary.critical_risk_accounts,
            summary.cycle_participation * 100.0,
        )
    }

    /// Recommend accounts within two hops that may warrant inclusion in the
    /// same investigation, for any account flagged above the medium band.
    fn recommend(&self, graph: &TransactionGraph, score: &AccountSuspicionScore) -> Vec<String> {
        if score.final_score < 40.0 {
            return Vec::new();
        }
        let mut neighbors: Vec<String> = graph.get_neighbors(&score.account, 2).into_iter().collect();
        neighbors.sort();
        neighbors
    }
}

/// Render a full analysis result as a multi-paragraph narrative report.
pub fn narrative_report(
    narrator: &dyn Narrator,
    graph: &TransactionGraph,
    result: &AnalysisResult,
) -> String {
    let mut out = String::new();
    out.push_str(&narrator.narrate_summary(&result.summary));
    out.push('\n');

    for cycle in result.cycles.iter().take(10) {
        out.push_str(&narrator.narrate_cycle(cycle));
        out.push('\n');
    }

    for score in result
        .account_scores
        .iter()
        .filter(|s| matches!(s.risk_level, crate::risk::RiskLevel::High | crate::risk::RiskLevel::Critical))
        .take(20)
    {
        out.push_str(&narrator.narrate_account(score));
        out.push('\n');
        let recommended = narrator.recommend(graph, score);
        if !recommended.is_empty() {
            out.push_str(&format!("  related accounts worth reviewing: {}\n", recommended.join(", ")));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use crate::cancellation::CancellationToken;
    use crate::transaction::Transaction;
    use chrono::{TimeZone, Utc};

    fn txn(id: &str, from: &str, to: &str, amount: f64, hour: i64) -> Transaction {
        Transaction::new(
            id,
            from,
            to,
            amount,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(hour),
            None,
        )
        .unwrap()
    }

    #[test]
    fn summary_narration_mentions_counts() {
        let narrator = DeterministicNarrator::new();
        let summary = Summary {
            total_accounts: 5,
            total_transactions: 10,
            total_volume: 50_000.0,
            mean_transaction_amount: 5_000.0,
            median_transaction_amount: 4_500.0,
            min_transaction_amount: 100.0,
            max_transaction_amount: 12_000.0,
            cycles_found: 1,
            smurfing_alerts: 2,
            shell_alerts: 0,
            low_risk_accounts: 3,
            medium_risk_accounts: 1,
            high_risk_accounts: 1,
            critical_risk_accounts: 0,
            cycle_participation: 0.4,
            percentage_suspicious: 20.0,
        };
        let text = narrator.narrate_summary(&summary);
        assert!(text.contains("5 accounts"));
        assert!(text.contains("1 cycles"));
    }

    #[test]
    fn low_score_accounts_get_no_recommendations() {
        let txns = vec![txn("T1", "A", "B", 100.0, 0)];
        let graph = crate::graph::GraphBuilder::new().build(&txns);
        let narrator = DeterministicNarrator::new();
        let score = AccountSuspicionScore {
            account: "A".to_string(),
            ring_score: 0.0,
            smurfing_score: 0.0,
            shell_score: 0.0,
            pattern_score: 10.0,
            final_score: 10.0,
            risk_level: crate::risk::RiskLevel::Low,
            risk_factors: vec![],
        };
        assert!(narrator.recommend(&graph, &score).is_empty());
    }

    #[test]
    fn full_report_includes_summary_and_cycle_lines() {
        let txns = vec![
            txn("T1", "A", "B", 10_000.0, 0),
            txn("T2", "B", "C", 10_000.0, 1),
            txn("T3", "C", "A", 10_000.0, 2),
        ];
        let engine = Engine::new(EngineConfig::default());
        let cancel = CancellationToken::new();
        let result = engine.analyze(&txns, &cancel).unwrap();
        let graph = crate::graph::GraphBuilder::new().build(&txns);
        let narrator = DeterministicNarrator::new();
        let report = narrative_report(&narrator, &graph, &result);
        assert!(report.contains("accounts"));
        assert!(report.contains("->"));
    }
}
