//! Composite suspicion scoring: fuses four independently recomputed
//! sub-scores (ring participation, smurfing, shell, flow pattern) into one
//! 0-100 `final_score` per account.
//!
//! Every sub-score here is recomputed from the raw graph aggregates rather
//! than reused from [`crate::smurfing::SmurfingAlert`] or
//! [`crate::shell::ShellAlert`] — those detectors answer "is this account a
//! smurf/shell account", a narrower question than "how suspicious is this
//! account overall". See DESIGN.md's scoring-consistency note.

use crate::config::ScorerConfig;
use crate::cycle::Cycle;
use crate::graph::TransactionGraph;
use crate::risk::{classify, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Final composite suspicion score for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountSuspicionScore {
    pub account: String,
    pub ring_score: f64,
    pub smurfing_score: f64,
    pub shell_score: f64,
    pub pattern_score: f64,
    pub final_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
}

/// Scores every account touched by the graph by recombining raw per-account
/// aggregates with the set of detected cycles.
#[derive(Debug, Clone)]
pub struct SuspicionScorer<'a> {
    config: &'a ScorerConfig,
}

impl<'a> SuspicionScorer<'a> {
    pub fn new(config: &'a ScorerConfig) -> Self {
        Self { config }
    }

    /// Zero if the account is in no cycle; otherwise the fraction of all
    /// detected rings it participates in, scaled up by its average ring
    /// amount (capped at 1.5x), clamped to [0,100].
    fn ring_score(account: &str, cycles: &[Cycle]) -> f64 {
        let involved: Vec<&Cycle> = cycles.iter().filter(|c| c.accounts.iter().any(|a| a == account)).collect();
        if involved.is_empty() {
            return 0.0;
        }
        let total_rings = cycles.len().max(1) as f64;
        let ring_count = involved.len() as f64;
        let avg_ring_amount = involved.iter().map(|c| c.total_amount).sum::<f64>() / involved.len() as f64;
        let multiplier = (1.0 + avg_ring_amount / 1_000_000.0).min(1.5);
        ((ring_count / total_rings) * 100.0 * multiplier).clamp(0.0, 100.0)
    }

    /// Zero below 10 lifetime transactions; otherwise a blend of transaction
    /// volume, counterparty fan, and total amount moved, all recomputed from
    /// the graph rather than any detected window.
    fn smurfing_score(graph: &TransactionGraph, node: u32) -> f64 {
        let agg = graph.aggregate(node);
        let n = agg.txn_count;
        if n < 10 {
            return 0.0;
        }
        let fan_in = graph.in_neighbor_count(node);
        let fan_out = graph.out_degree_nodes(node);
        let amount = agg.total_in + agg.total_out;

        let volume_term = (((n - 10) as f64) * 2.0).min(100.0);
        let fan_term = (((fan_in + fan_out) as f64) * 5.0).min(100.0);
        let amount_term = if amount > 10_000.0 {
            ((amount / 100_000.0) * 50.0).min(100.0)
        } else {
            0.0
        };

        (0.5 * volume_term + 0.3 * fan_term + 0.2 * amount_term).clamp(0.0, 100.0)
    }

    /// Rewards few transactions, high per-transaction value, and narrow
    /// connectivity — the shell/pass-through signature read off raw
    /// aggregates, independent of [`crate::shell::ShellDetector`]'s own
    /// emit-threshold gate.
    fn shell_score(graph: &TransactionGraph, node: u32) -> f64 {
        let agg = graph.aggregate(node);
        let txn_count = agg.txn_count;
        if txn_count == 0 {
            return 0.0;
        }
        let avg_value = (agg.total_in + agg.total_out) / txn_count as f64;
        let unique_sources = graph.in_neighbor_count(node);
        let unique_destinations = graph.out_degree_nodes(node);

        let count_term = (100.0 - 10.0 * txn_count as f64).max(0.0);
        let value_term = if avg_value > 10_000.0 {
            ((avg_value / 100_000.0) * 50.0).min(100.0)
        } else {
            0.0
        };
        let connectivity_term = (100.0 - 20.0 * (unique_sources + unique_destinations) as f64).max(0.0);

        (0.4 * count_term + 0.3 * value_term + 0.3 * connectivity_term).clamp(0.0, 100.0)
    }

    /// Flow-pattern score from raw in/out totals and counterparty counts:
    /// pass-through symmetry, one-sided consolidation, and throughput
    /// efficiency relative to connectivity. Zero unless the account has both
    /// inbound and outbound activity.
    fn pattern_score(graph: &TransactionGraph, node: u32) -> f64 {
        let agg = graph.aggregate(node);
        let (total_in, total_out) = (agg.total_in, agg.total_out);
        if total_in <= 0.0 || total_out <= 0.0 {
            return 0.0;
        }
        let sources = graph.in_neighbor_count(node) as f64;
        let destinations = graph.out_degree_nodes(node) as f64;
        let txns = agg.txn_count.max(1) as f64;

        let pass_through = (1.0 - total_in.min(total_out) / total_in.max(total_out)) * 100.0;
        let consolidation = if (sources > destinations && total_in > total_out)
            || (destinations > sources && total_out > total_in)
        {
            60.0
        } else {
            0.0
        };
        let avg_per_txn = (total_in + total_out) / txns;
        let connectivity = ((sources + destinations) / txns).max(0.1);
        let throughput_efficiency = ((avg_per_txn / 10_000.0) * (1.0 / connectivity)).min(100.0);

        (0.3 * pass_through + 0.3 * consolidation + 0.4 * throughput_efficiency).clamp(0.0, 100.0)
    }

    fn risk_factors(ring: f64, smurfing: f64, shell: f64, pattern: f64) -> Vec<String> {
        let mut factors = Vec::new();
        if ring > 50.0 {
            factors.push("ring_participation".to_string());
        }
        if smurfing > 50.0 {
            factors.push("smurfing_activity".to_string());
        }
        if shell > 50.0 {
            factors.push("shell_characteristics".to_string());
        }
        if pattern > 50.0 {
            factors.push("flow_pattern_anomaly".to_string());
        }
        factors
    }

    /// Score every account in the graph. Accounts that only appear in a
    /// detector's alerts are already nodes of the graph (the graph builder
    /// interns every account that sends or receives at least one
    /// transaction), so no separate union is needed.
    pub fn score_all(&self, graph: &TransactionGraph, cycles: &[Cycle]) -> Vec<AccountSuspicionScore> {
        let mut scores: Vec<AccountSuspicionScore> = graph
            .node_ids_iter()
            .map(|node| {
                let account = graph.account_name(node).to_string();
                let ring_score = Self::ring_score(&account, cycles);
                let smurfing_score = Self::smurfing_score(graph, node);
                let shell_score = Self::shell_score(graph, node);
                let pattern_score = Self::pattern_score(graph, node);

                let final_score = (ring_score * self.config.weight_ring
                    + smurfing_score * self.config.weight_smurfing
                    + shell_score * self.config.weight_shell
                    + pattern_score * self.config.weight_patterns)
                    .clamp(0.0, 100.0);

                let risk_level = classify(
                    final_score,
                    self.config.band_medium,
                    self.config.band_high,
                    self.config.band_critical,
                );
                let risk_factors = Self::risk_factors(ring_score, smurfing_score, shell_score, pattern_score);

                AccountSuspicionScore {
                    account,
                    ring_score,
                    smurfing_score,
                    shell_score,
                    pattern_score,
                    final_score,
                    risk_level,
                    risk_factors,
                }
            })
            .collect();

        scores.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scores
    }
}

/// Build a lookup from account to its final score, convenient for callers
/// that only need one account's result.
pub fn index_by_account(scores: &[AccountSuspicionScore]) -> HashMap<String, &AccountSuspicionScore> {
    scores.iter().map(|s| (s.account.clone(), s)).collect()
}

/// The set of accounts at exactly the `HIGH` risk band (the `CRITICAL` band
/// is reported separately by [`critical_accounts`], per the spec's "split of
/// high/critical accounts").
pub fn high_risk_accounts(scores: &[AccountSuspicionScore]) -> HashSet<String> {
    scores
        .iter()
        .filter(|s| s.risk_level == RiskLevel::High)
        .map(|s| s.account.clone())
        .collect()
}

/// The set of accounts at the `CRITICAL` risk band.
pub fn critical_accounts(scores: &[AccountSuspicionScore]) -> HashSet<String> {
    scores
        .iter()
        .filter(|s| s.risk_level == RiskLevel::Critical)
        .map(|s| s.account.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
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
    fn clean_account_scores_zero_everywhere() {
        let txns = vec![txn("T1", "A", "B", 100.0, 0)];
        let graph = GraphBuilder::new().build(&txns);
        let config = ScorerConfig::default();
        let scorer = SuspicionScorer::new(&config);
        let scores = scorer.score_all(&graph, &[]);
        let a = scores.iter().find(|s| s.account == "A").unwrap();
        assert_eq!(a.ring_score, 0.0);
        assert_eq!(a.smurfing_score, 0.0);
        assert_eq!(a.shell_score, 0.0);
        assert!(a.risk_factors.is_empty());
    }

    #[test]
    fn account_outside_any_cycle_scores_zero_ring() {
        let txns = vec![
            txn("T1", "A", "B", 10_000.0, 0),
            txn("T2", "B", "C", 10_000.0, 1),
            txn("T3", "C", "A", 10_000.0, 2),
            txn("T4", "D", "E", 1.0, 3),
        ];
        let graph = GraphBuilder::new().build(&txns);
        let config = ScorerConfig::default();
        let scorer = SuspicionScorer::new(&config);
        let cycle_config = crate::config::CycleConfig::default();
        let cycles = crate::cycle::CycleDetector::new(&graph, &cycle_config)
            .detect(&crate::cancellation::CancellationToken::new())
            .unwrap();
        let scores = scorer.score_all(&graph, &cycles);
        let a = scores.iter().find(|s| s.account == "A").unwrap();
        assert!(a.ring_score > 0.0);
        let d = scores.iter().find(|s| s.account == "D").unwrap();
        assert_eq!(d.ring_score, 0.0);
    }

    #[test]
    fn high_volume_narrow_account_scores_high_shell_subscore() {
        // Few transactions, high per-transaction value, one counterparty on
        // each side: should score high on the shell sub-score even with no
        // ShellAlert ever emitted for it.
        let txns = vec![
            txn("T1", "SRC", "M", 500_000.0, 0),
            txn("T2", "M", "DST", 495_000.0, 1),
        ];
        let graph = GraphBuilder::new().build(&txns);
        let config = ScorerConfig::default();
        let scorer = SuspicionScorer::new(&config);
        let scores = scorer.score_all(&graph, &[]);
        let m = scores.iter().find(|s| s.account == "M").unwrap();
        assert!(m.shell_score > 50.0);
    }

    #[test]
    fn every_subscore_and_final_score_stay_in_bounds() {
        let txns: Vec<Transaction> = (0..40)
            .map(|i| txn(&format!("T{i}"), "HUB", &format!("LEAF{i}"), 1_000.0 + i as f64, i % 5))
            .collect();
        let graph = GraphBuilder::new().build(&txns);
        let config = ScorerConfig::default();
        let scorer = SuspicionScorer::new(&config);
        let scores = scorer.score_all(&graph, &[]);
        for s in &scores {
            assert!((0.0..=100.0).contains(&s.ring_score));
            assert!((0.0..=100.0).contains(&s.smurfing_score));
            assert!((0.0..=100.0).contains(&s.shell_score));
            assert!((0.0..=100.0).contains(&s.pattern_score));
            assert!((0.0..=100.0).contains(&s.final_score));
        }
    }

    #[test]
    fn risk_bands_follow_config_cutoffs() {
        let txns = vec![txn("T1", "A", "B", 100.0, 0)];
        let graph = GraphBuilder::new().build(&txns);
        let config = ScorerConfig::default();
        let scorer = SuspicionScorer::new(&config);
        let scores = scorer.score_all(&graph, &[]);
        let a = scores.iter().find(|s| s.account == "A").unwrap();
        assert_eq!(a.risk_level, RiskLevel::Low);
    }
}
