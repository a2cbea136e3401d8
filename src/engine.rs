//! The analysis engine: wires graph construction and the three independent
//! detectors into one pass, then fuses their output into a composite score.

use crate::cancellation::CancellationToken;
use crate::config::EngineConfig;
use crate::cycle::{self, Cycle, CycleDetector};
use crate::error::EngineError;
use crate::graph::GraphBuilder;
use crate::scoring::{index_by_account, AccountSuspicionScore, SuspicionScorer};
use crate::shell::{self, ShellAlert, ShellDetector};
use crate::smurfing::{SmurfingAlert, SmurfingDetector};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Lifecycle state of one analysis run, surfaced for callers polling a
/// long-running engine (mirrors the teacher's validator state machine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum State {
    #[default]
    Idle,
    Analyzing,
    Done,
}

/// Crate-level counts and statistics summarizing a completed analysis
/// (§4.6: "counts, volume, mean/median/min/max transaction amount, accounts
/// participating in cycles, risk-band counts, percentage suspicious").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub total_accounts: usize,
    pub total_transactions: usize,
    pub total_volume: f64,
    pub mean_transaction_amount: f64,
    pub median_transaction_amount: f64,
    pub min_transaction_amount: f64,
    pub max_transaction_amount: f64,
    pub cycles_found: usize,
    pub smurfing_alerts: usize,
    pub shell_alerts: usize,
    pub low_risk_accounts: usize,
    pub medium_risk_accounts: usize,
    pub high_risk_accounts: usize,
    pub critical_risk_accounts: usize,
    pub cycle_participation: f64,
    pub percentage_suspicious: f64,
}

/// The full output of one `Engine::analyze` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub cycles: Vec<Cycle>,
    pub smurfing_alerts: Vec<SmurfingAlert>,
    pub shell_alerts: Vec<ShellAlert>,
    pub account_scores: Vec<AccountSuspicionScore>,
    pub high_risk_accounts: Vec<String>,
    pub critical_accounts: Vec<String>,
    pub summary: Summary,
}

/// Mean, median, min, max of a non-empty amount slice (0.0 for all four on
/// an empty slice, which cannot occur downstream since `analyze` rejects
/// empty batches before this runs).
fn amount_stats(amounts: &[f64]) -> (f64, f64, f64, f64) {
    if amounts.is_empty() {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let mut sorted = amounts.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    (mean, median, sorted[0], sorted[sorted.len() - 1])
}

/// The analysis engine. Each `analyze` call is a pure function of its
/// inputs and config; `state` only exists so a caller polling the same
/// `Engine` instance can observe the {Idle -> Analyzing -> Done} lifecycle
/// of its most recent run (§4.6).
#[derive(Debug, Default)]
pub struct Engine {
    pub config: EngineConfig,
    state: Mutex<State>,
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            state: Mutex::new(State::Idle),
        }
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::Idle),
        }
    }

    /// The lifecycle state of this engine's most recent (or in-flight)
    /// `analyze` call.
    pub fn state(&self) -> State {
        *self.state.lock().unwrap()
    }

    /// Run the full pipeline: build the graph, then run the cycle, smurfing
    /// and shell detectors concurrently (they're independent of each
    /// other's output), join, and fuse into the composite score.
    #[tracing::instrument(skip(self, transactions, cancel), fields(batch_size = transactions.len()))]
    pub fn analyze(
        &self,
        transactions: &[Transaction],
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, EngineError> {
        if transactions.is_empty() {
            tracing::warn!("rejecting empty transaction batch");
            return Err(EngineError::InvalidInput(
                "no transactions to analyze".to_string(),
            ));
        }

        *self.state.lock().unwrap() = State::Analyzing;

        let graph = GraphBuilder::new().build(transactions);
        tracing::debug!(accounts = graph.node_count(), "graph built");

        let cycle_result: Mutex<Option<Result<Vec<Cycle>, EngineError>>> = Mutex::new(None);
        let smurfing_result: Mutex<Option<Vec<SmurfingAlert>>> = Mutex::new(None);
        let shell_result: Mutex<Option<Vec<ShellAlert>>> = Mutex::new(None);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let detector = CycleDetector::new(&graph, &self.config.cycle);
                let result = detector.detect(cancel);
                *cycle_result.lock().unwrap() = Some(result);
            });
            scope.spawn(|| {
                let detector = SmurfingDetector::new(&self.config.smurfing);
                let result = detector.detect(transactions);
                *smurfing_result.lock().unwrap() = Some(result);
            });
            scope.spawn(|| {
                let detector = ShellDetector::new(&graph, &self.config.shell);
                let result = detector.detect(transactions);
                *shell_result.lock().unwrap() = Some(result);
            });
        });

        let cycles = match cycle_result.into_inner().unwrap().unwrap() {
            Ok(cycles) => cycles,
            Err(EngineError::Cancelled) => {
                tracing::info!("cycle enumeration cancelled; discarding partial analysis");
                *self.state.lock().unwrap() = State::Idle;
                return Err(EngineError::Cancelled);
            }
            Err(err) => {
                *self.state.lock().unwrap() = State::Idle;
                return Err(err);
            }
        };
        let mut smurfing_alerts = smurfing_result.into_inner().unwrap().unwrap();
        let mut shell_alerts = shell_result.into_inner().unwrap().unwrap();
        tracing::debug!(
            cycles = cycles.len(),
            smurfing_alerts = smurfing_alerts.len(),
            shell_alerts = shell_alerts.len(),
            "detectors complete"
        );

        let scorer = SuspicionScorer::new(&self.config.scorer);
        let account_scores = scorer.score_all(&graph, &cycles);

        let score_index = index_by_account(&account_scores);
        for alert in smurfing_alerts.iter_mut() {
            if let Some(score) = score_index.get(alert.account.as_str()) {
                alert.risk_score = score.smurfing_score;
            }
        }
        for alert in shell_alerts.iter_mut() {
            if let Some(score) = score_index.get(alert.account.as_str()) {
                alert.risk_score = score.shell_score;
            }
        }

        let low_risk_accounts = account_scores
            .iter()
            .filter(|s| s.risk_level == crate::risk::RiskLevel::Low)
            .count();
        let medium_risk_accounts = account_scores
            .iter()
            .filter(|s| s.risk_level == crate::risk::RiskLevel::Medium)
            .count();
        let high_risk_accounts = crate::scoring::high_risk_accounts(&account_scores);
        let critical_accounts = crate::scoring::critical_accounts(&account_scores);

        let amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();
        let total_volume: f64 = amounts.iter().sum();
        let (mean_transaction_amount, median_transaction_amount, min_transaction_amount, max_transaction_amount) =
            amount_stats(&amounts);
        let percentage_suspicious = if account_scores.is_empty() {
            0.0
        } else {
            ((high_risk_accounts.len() + critical_accounts.len()) as f64 / account_scores.len() as f64) * 100.0
        };

        let summary = Summary {
            total_accounts: graph.node_count(),
            total_transactions: transactions.len(),
            total_volume,
            mean_transaction_amount,
            median_transaction_amount,
            min_transaction_amount,
            max_transaction_amount,
            cycles_found: cycles.len(),
            smurfing_alerts: smurfing_alerts.len(),
            shell_alerts: shell_alerts.len(),
            low_risk_accounts,
            medium_risk_accounts,
            high_risk_accounts: high_risk_accounts.len(),
            critical_risk_accounts: critical_accounts.len(),
            cycle_participation: cycle::cycle_participation(&graph, &cycles),
            percentage_suspicious,
        };

        let mut high_risk_list: Vec<String> = high_risk_accounts.into_iter().collect();
        high_risk_list.sort();
        let mut critical_list: Vec<String> = critical_accounts.into_iter().collect();
        critical_list.sort();

        let analysis_id = Uuid::new_v4().to_string();
        *self.state.lock().unwrap() = State::Done;
        tracing::info!(
            analysis_id = %analysis_id,
            high_risk = high_risk_list.len(),
            critical = critical_list.len(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            analysis_id,
            cycles,
            smurfing_alerts,
            shell_alerts,
            account_scores,
            high_risk_accounts: high_risk_list,
            critical_accounts: critical_list,
            summary,
        })
    }

    /// Look up one account's comprehensive profile (graph aggregates, shell
    /// score, pass-through flag) without re-running the full pipeline.
    pub fn account_profile(
        &self,
        transactions: &[Transaction],
        account: &str,
    ) -> Result<shell::AccountProfile, EngineError> {
        let graph = GraphBuilder::new().build(transactions);
        shell::comprehensive_profile(&graph, &self.config.shell, transactions, account)
            .ok_or_else(|| EngineError::NotFound(format!("account {account} not found")))
    }
}

/// The external collaborator surface an embedding application drives the
/// engine through (HTTP/RPC framing is left to the caller; Non-goal for
/// this crate).
pub trait EngineApi {
    fn analyze(
        &self,
        transactions: &[Transaction],
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, EngineError>;
}

impl EngineApi for Engine {
    fn analyze(
        &self,
        transactions: &[Transaction],
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, EngineError> {
        Engine::analyze(self, transactions, cancel)
    }
}

/// A keyed cache for completed analyses. Caching-as-a-service is a
/// Non-goal; this is the in-process shape an embedding application can
/// back with something heavier.
pub trait ResultCache {
    fn get(&self, key: &str) -> Option<AnalysisResult>;
    fn put(&self, key: &str, result: AnalysisResult);
}

/// Mutex-guarded in-memory `ResultCache`, the one concrete implementation
/// this crate ships and exercises in tests.
#[derive(Debug, Default)]
pub struct InMemoryResultCache {
    entries: Mutex<HashMap<String, AnalysisResult>>,
}

impl InMemoryResultCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for InMemoryResultCache {
    fn get(&self, key: &str) -> Option<AnalysisResult> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, result: AnalysisResult) {
        self.entries.lock().unwrap().insert(key.to_string(), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn empty_batch_is_rejected() {
        let engine = Engine::new(EngineConfig::default());
        let cancel = CancellationToken::new();
        let result = engine.analyze(&[], &cancel);
        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
        assert_eq!(engine.state(), State::Idle);
    }

    #[test]
    fn state_reaches_done_after_a_successful_run() {
        let txns = vec![
            txn("T1", "A", "B", 10_000.0, 0),
            txn("T2", "B", "C", 10_000.0, 1),
            txn("T3", "C", "A", 10_000.0, 2),
        ];
        let engine = Engine::new(EngineConfig::default());
        assert_eq!(engine.state(), State::Idle);
        let cancel = CancellationToken::new();
        engine.analyze(&txns, &cancel).unwrap();
        assert_eq!(engine.state(), State::Done);
    }

    #[test]
    fn state_returns_to_idle_after_cancellation() {
        let txns = vec![
            txn("T1", "A", "B", 10_000.0, 0),
            txn("T2", "B", "C", 10_000.0, 1),
            txn("T3", "C", "A", 10_000.0, 2),
        ];
        let engine = Engine::new(EngineConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = engine.analyze(&txns, &cancel);
        assert!(matches!(result, Err(EngineError::Cancelled)));
        assert_eq!(engine.state(), State::Idle);
    }

    #[test]
    fn analyze_finds_a_triangle_cycle() {
        let txns = vec![
            txn("T1", "A", "B", 10_000.0, 0),
            txn("T2", "B", "C", 10_000.0, 1),
            txn("T3", "C", "A", 10_000.0, 2),
        ];
        let engine = Engine::new(EngineConfig::default());
        let cancel = CancellationToken::new();
        let result = engine.analyze(&txns, &cancel).unwrap();
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.summary.total_accounts, 3);
        assert_eq!(result.summary.total_transactions, 3);
    }

    #[test]
    fn cache_roundtrips_a_result() {
        let txns = vec![
            txn("T1", "A", "B", 10_000.0, 0),
            txn("T2", "B", "C", 10_000.0, 1),
            txn("T3", "C", "A", 10_000.0, 2),
        ];
        let engine = Engine::new(EngineConfig::default());
        let cancel = CancellationToken::new();
        let result = engine.analyze(&txns, &cancel).unwrap();
        let cache = InMemoryResultCache::new();
        cache.put("run-1", result.clone());
        assert_eq!(cache.get("run-1"), Some(result));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn summary_reports_amount_statistics_and_suspicious_percentage() {
        let txns = vec![
            txn("T1", "A", "B", 100.0, 0),
            txn("T2", "B", "C", 200.0, 1),
            txn("T3", "C", "D", 300.0, 2),
        ];
        let engine = Engine::new(EngineConfig::default());
        let cancel = CancellationToken::new();
        let result = engine.analyze(&txns, &cancel).unwrap();
        assert_eq!(result.summary.total_volume, 600.0);
        assert_eq!(result.summary.min_transaction_amount, 100.0);
        assert_eq!(result.summary.max_transaction_amount, 300.0);
        assert_eq!(result.summary.median_transaction_amount, 200.0);
        assert!(result.summary.percentage_suspicious >= 0.0);
        assert_eq!(
            result.summary.low_risk_accounts
                + result.summary.medium_risk_accounts
                + result.summary.high_risk_accounts
                + result.summary.critical_risk_accounts,
            result.account_scores.len()
        );
    }

    #[test]
    fn account_profile_reports_not_found() {
        let txns = vec![txn("T1", "A", "B", 100.0, 0)];
        let engine = Engine::new(EngineConfig::default());
        let result = engine.account_profile(&txns, "Z");
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
