//! Shell / pass-through account detection: six weighted sub-scores fused
//! into a composite `shell_score`, plus the auxiliary pass-through and
//! velocity-anomaly views the comprehensive account profile exposes.

use crate::config::ShellConfig;
use crate::graph::TransactionGraph;
use crate::risk::{classify, RiskLevel};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Composite shell-account risk profile for one account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellAlert {
    pub account: String,
    pub shell_score: f64,
    /// Filled in by the orchestrator from the account's composite
    /// `shell_score` sub-score (§4.6 "fill per-alert risk scores from (5)");
    /// `0.0` until then, distinct from the detector's own `shell_score`
    /// above (see DESIGN.md's scoring-consistency note).
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub high_value_score: f64,
    pub pass_through_score: f64,
    pub connection_score: f64,
    pub dormancy_score: f64,
    pub directionality_score: f64,
    pub uniformity_score: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample coefficient of variation (÷(n-1) variance, matching
/// `statistics.variance`/`statistics.stdev` in the original rather than a
/// population variance).
fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt() / m
}

fn gaps_hours(mut timestamps: Vec<DateTime<Utc>>) -> Vec<f64> {
    timestamps.sort();
    timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64 / 3600.0)
        .collect()
}

struct AccountHistory {
    inbound_amounts: Vec<f64>,
    outbound_amounts: Vec<f64>,
    inbound_sources: HashSet<String>,
    outbound_destinations: HashSet<String>,
    timestamps: Vec<DateTime<Utc>>,
}

impl AccountHistory {
    fn build(account: &str, transactions: &[Transaction]) -> Self {
        let mut inbound_amounts = Vec::new();
        let mut outbound_amounts = Vec::new();
        let mut inbound_sources = HashSet::new();
        let mut outbound_destinations = HashSet::new();
        let mut timestamps = Vec::new();

        for txn in transactions {
            if txn.to_account == account {
                inbound_amounts.push(txn.amount);
                inbound_sources.insert(txn.from_account.clone());
                timestamps.push(txn.timestamp);
            }
            if txn.from_account == account {
                outbound_amounts.push(txn.amount);
                outbound_destinations.insert(txn.to_account.clone());
                timestamps.push(txn.timestamp);
            }
        }

        Self {
            inbound_amounts,
            outbound_amounts,
            inbound_sources,
            outbound_destinations,
            timestamps,
        }
    }

    fn txn_count(&self) -> usize {
        self.inbound_amounts.len() + self.outbound_amounts.len()
    }

    fn total_in(&self) -> f64 {
        self.inbound_amounts.iter().sum()
    }

    fn total_out(&self) -> f64 {
        self.outbound_amounts.iter().sum()
    }
}

/// Detector over the interned graph; per-account timelines come from the
/// raw transaction batch since the graph's edge collapse discards them.
#[derive(Debug, Clone)]
pub struct ShellDetector<'a> {
    graph: &'a TransactionGraph,
    config: &'a ShellConfig,
}

impl<'a> ShellDetector<'a> {
    pub fn new(graph: &'a TransactionGraph, config: &'a ShellConfig) -> Self {
        Self { graph, config }
    }

    fn score_one(&self, account: &str, transactions: &[Transaction]) -> Option<ShellAlert> {
        let history = AccountHistory::build(account, transactions);
        let txn_count = history.txn_count();
        if txn_count == 0 || txn_count > self.config.max_transactions {
            return None;
        }
        let total_in = history.total_in();
        let total_out = history.total_out();
        let total_throughput = total_in + total_out;
        if total_throughput < self.config.min_total_value {
            return None;
        }

        let avg_transaction = total_throughput / txn_count as f64;
        let high_value_score = ((avg_transaction / 10_000.0) * 20.0).min(20.0);

        let pass_through_score = if total_in == 0.0 || total_out == 0.0 {
            0.0
        } else {
            let r = total_in.min(total_out) / total_in.max(total_out);
            let diff = (total_in - total_out).abs();
            let max_side = total_in.max(total_out);
            if r > 0.95 && diff < 0.05 * max_side {
                25.0
            } else if r > 0.90 {
                15.0
            } else if r > 0.85 {
                8.0
            } else {
                0.0
            }
        };

        let unique_sources = history.inbound_sources.len();
        let unique_destinations = history.outbound_destinations.len();
        let source_score = if unique_sources == 1 && txn_count >= 3 {
            10.0
        } else if unique_sources <= 2 && txn_count >= 5 {
            8.0
        } else {
            0.0
        };
        let destination_score = if unique_destinations == 1 && txn_count >= 3 {
            10.0
        } else if unique_destinations <= 2 && txn_count >= 5 {
            8.0
        } else {
            0.0
        };
        let bonus = if unique_sources + unique_destinations <= 3 && txn_count >= 4 {
            7.0
        } else {
            0.0
        };
        let connection_score = (source_score + destination_score + bonus).min(20.0);

        let gaps = gaps_hours(history.timestamps.clone());
        let dormancy_score = if history.timestamps.len() < 3 {
            0.0
        } else {
            let max_gap = gaps.iter().cloned().fold(0.0_f64, f64::max);
            let max_index = gaps.iter().position(|&g| g == max_gap).unwrap_or(0);
            let tail = &gaps[max_index + 1..];
            let tail_mean = mean(tail);
            if max_gap > 168.0 && !tail.is_empty() && tail_mean < 24.0 {
                15.0
            } else if coefficient_of_variation(&gaps) < 0.5 {
                12.0
            } else {
                0.0
            }
        };

        let inbound_count = history.inbound_amounts.len();
        let outbound_count = history.outbound_amounts.len();
        let directionality_score = if inbound_count == 0 && outbound_count > 2 {
            12.0
        } else if outbound_count == 0 && inbound_count > 2 {
            12.0
        } else {
            let total = (inbound_count + outbound_count).max(1) as f64;
            let in_share = inbound_count as f64 / total;
            let out_share = outbound_count as f64 / total;
            if in_share > 0.9 || out_share > 0.9 {
                8.0
            } else {
                0.0
            }
        };

        let all_amounts: Vec<f64> = history
            .inbound_amounts
            .iter()
            .chain(history.outbound_amounts.iter())
            .copied()
            .collect();
        let uniformity_score = if all_amounts.len() < 3 {
            0.0
        } else {
            let cv = coefficient_of_variation(&all_amounts);
            if cv < 0.2 {
                5.0
            } else if cv < 0.4 {
                3.0
            } else {
                0.0
            }
        };

        let shell_score = (0.20 * high_value_score
            + 0.25 * pass_through_score
            + 0.20 * connection_score
            + 0.15 * dormancy_score
            + 0.15 * directionality_score
            + 0.05 * uniformity_score)
            .min(100.0);

        if shell_score <= self.config.shell_emit_threshold {
            return None;
        }

        let risk_level = classify(shell_score, 40.0, 60.0, 80.0);

        Some(ShellAlert {
            account: account.to_string(),
            shell_score,
            risk_score: 0.0,
            risk_level,
            high_value_score,
            pass_through_score,
            connection_score,
            dormancy_score,
            directionality_score,
            uniformity_score,
        })
    }

    /// Score every account that clears the transaction-count and
    /// total-value gates, keeping only those above `shell_emit_threshold`.
    pub fn detect(&self, transactions: &[Transaction]) -> Vec<ShellAlert> {
        let mut alerts: Vec<ShellAlert> = self
            .graph
            .accounts()
            .filter_map(|account| self.score_one(account, transactions))
            .collect();
        alerts.sort_by(|a, b| {
            b.shell_score
                .partial_cmp(&a.shell_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        alerts
    }

    /// Accounts whose inbound and outbound totals match within `tolerance`
    /// (a fraction of the larger side) — pure pass-throughs regardless of
    /// whether they clear the shell score threshold.
    pub fn detect_pass_through_accounts(&self, transactions: &[Transaction], tolerance: f64) -> Vec<String> {
        let mut hits: Vec<(String, f64)> = self
            .graph
            .accounts()
            .filter_map(|account| {
                let history = AccountHistory::build(account, transactions);
                let total_in = history.total_in();
                let total_out = history.total_out();
                if total_in == 0.0 || total_out == 0.0 {
                    return None;
                }
                let r = total_in.min(total_out) / total_in.max(total_out);
                let diff = (total_in - total_out).abs();
                if r > 0.95 && diff < tolerance * total_in.max(total_out) {
                    Some((account.to_string(), r))
                } else {
                    None
                }
            })
            .collect();
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.into_iter().map(|(account, _)| account).collect()
    }

    /// Accounts with at least 3 timestamps spanning more than zero hours
    /// whose transaction velocity (#txns/hours) exceeds 2, sorted by
    /// velocity descending.
    pub fn detect_velocity_anomalies(&self, transactions: &[Transaction]) -> Vec<String> {
        let mut hits: Vec<(String, f64)> = self
            .graph
            .accounts()
            .filter_map(|account| {
                let history = AccountHistory::build(account, transactions);
                if history.timestamps.len() < 3 {
                    return None;
                }
                let mut timestamps = history.timestamps.clone();
                timestamps.sort();
                let span_hours =
                    (*timestamps.last().unwrap() - *timestamps.first().unwrap()).num_seconds() as f64 / 3600.0;
                if span_hours <= 0.0 {
                    return None;
                }
                let velocity = timestamps.len() as f64 / span_hours;
                if velocity > 2.0 {
                    Some((account.to_string(), velocity))
                } else {
                    None
                }
            })
            .collect();
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        hits.into_iter().map(|(account, _)| account).collect()
    }
}

/// A full account profile combining graph aggregates with the shell score
/// and pass-through flag, for the `EngineApi::account_profile` collaborator
/// surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountProfile {
    pub account: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub total_in: f64,
    pub total_out: f64,
    pub txn_count: usize,
    pub shell: Option<ShellAlert>,
    pub is_pass_through: bool,
}

/// Build the comprehensive profile for one account.
pub fn comprehensive_profile(
    graph: &TransactionGraph,
    shell_config: &ShellConfig,
    transactions: &[Transaction],
    account: &str,
) -> Option<AccountProfile> {
    let agg = graph.aggregate_by_name(account)?;
    let detector = ShellDetector::new(graph, shell_config);
    let shell = detector.score_one(account, transactions);
    let is_pass_through = detector
        .detect_pass_through_accounts(transactions, shell_config.pass_through_tolerance)
        .contains(&account.to_string());

    Some(AccountProfile {
        account: account.to_string(),
        in_degree: agg.in_degree,
        out_degree: agg.out_degree,
        total_in: agg.total_in,
        total_out: agg.total_out,
        txn_count: agg.txn_count,
        shell,
        is_pass_through,
    })
}
