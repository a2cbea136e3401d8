//! Circular flow ("ring") detection: bounded-length simple directed cycles,
//! deduplicated by rotation and scored by financial strength.

use crate::cancellation::CancellationToken;
use crate::config::CycleConfig;
use crate::error::EngineError;
use crate::graph::TransactionGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A single detected cycle, already canonicalized to its lexicographically
/// smallest rotation so two DFS roots that found the same ring collapse to
/// one entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cycle {
    pub accounts: Vec<String>,
    pub total_amount: f64,
    pub transaction_ids: Vec<String>,
    pub num_transactions: usize,
    pub avg_transaction: f64,
    /// Coefficient of variation of the traversed edge amounts, clamped to
    /// [0,1].
    pub amount_spread: f64,
    pub uniformity: f64,
    pub earliest_timestamp: DateTime<Utc>,
    pub strength: f64,
}

impl Cycle {
    pub fn length(&self) -> usize {
        self.accounts.len()
    }
}

/// Canonicalize a cycle (as node ids) to its lexicographically smallest
/// rotation, so `[A,B,C]`, `[B,C,A]` and `[C,A,B]` hash identically.
fn canonical_rotation(path: &[u32]) -> Vec<u32> {
    canonical_rotation_of(path)
}

/// Rotation-invariant canonical form of any orderable sequence: the
/// lexicographically smallest rotation. Used both to dedup discovered node-id
/// paths and, on `Cycle::accounts`, to break strength ties the same way
/// regardless of which node the DFS happened to start from.
fn canonical_rotation_of<T: Ord + Clone>(path: &[T]) -> Vec<T> {
    let n = path.len();
    let mut best: Option<usize> = None;
    for start in 0..n {
        let candidate_is_smaller = match best {
            None => true,
            Some(b) => {
                (0..n)
                    .map(|i| &path[(start + i) % n])
                    .cmp((0..n).map(|i| &path[(b + i) % n]))
                    == std::cmp::Ordering::Less
            }
        };
        if candidate_is_smaller {
            best = Some(start);
        }
    }
    let start = best.unwrap_or(0);
    (0..n).map(|i| path[(start + i) % n].clone()).collect()
}

fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (variance.sqrt() / mean).clamp(0.0, 1.0)
}

/// Detector over a built [`TransactionGraph`], configured by [`CycleConfig`].
#[derive(Debug, Clone)]
pub struct CycleDetector<'a> {
    graph: &'a TransactionGraph,
    config: &'a CycleConfig,
}

impl<'a> CycleDetector<'a> {
    pub fn new(graph: &'a TransactionGraph, config: &'a CycleConfig) -> Self {
        Self { graph, config }
    }

    /// Ordered start-node heuristic: the top `high_degree_prefix` nodes by
    /// out-degree, followed by any remaining nodes with out-degree > 0 that
    /// weren't already covered. Every node with outgoing edges is visited at
    /// least once as a DFS root (the v2 original's `visited_globally`
    /// short-circuit, which silently dropped cycles through later roots, is
    /// not reproduced here).
    fn start_nodes(&self) -> Vec<u32> {
        let mut by_degree: Vec<u32> = self
            .graph
            .node_ids_iter()
            .filter(|&n| self.graph.out_degree_nodes(n) > 0)
            .collect();
        by_degree.sort_by(|&a, &b| {
            self.graph
                .out_degree_nodes(b)
                .cmp(&self.graph.out_degree_nodes(a))
                .then(a.cmp(&b))
        });

        let mut seen: HashSet<u32> = HashSet::new();
        let mut ordered = Vec::with_capacity(by_degree.len());
        for &node in by_degree.iter().take(self.config.high_degree_prefix) {
            if seen.insert(node) {
                ordered.push(node);
            }
        }
        for &node in &by_degree {
            if seen.insert(node) {
                ordered.push(node);
            }
        }
        ordered
    }

    /// Enumerate all simple directed cycles of length `min_length..=max_length`
    /// reachable from `start`, via DFS with an on-path visited set.
    fn dfs_from(
        &self,
        start: u32,
        found: &mut HashMap<Vec<u32>, Vec<u32>>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        let mut path = vec![start];
        let mut on_path = HashSet::new();
        on_path.insert(start);
        self.dfs_step(start, &mut path, &mut on_path, found, cancel)
    }

    fn dfs_step(
        &self,
        start: u32,
        path: &mut Vec<u32>,
        on_path: &mut HashSet<u32>,
        found: &mut HashMap<Vec<u32>, Vec<u32>>,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let current = *path.last().unwrap();
        if path.len() > self.config.max_length {
            return Ok(());
        }

        for next in self.graph.successors(current) {
            if next == start && path.len() >= self.config.min_length {
                let canonical = canonical_rotation(path);
                found.entry(canonical).or_insert_with(|| path.clone());
                continue;
            }
            if on_path.contains(&next) || path.len() == self.config.max_length {
                continue;
            }
            path.push(next);
            on_path.insert(next);
            self.dfs_step(start, path, on_path, found, cancel)?;
            on_path.remove(&next);
            path.pop();
        }
        Ok(())
    }

    fn metrics(&self, path: &[u32]) -> Cycle {
        let n = path.len();
        let mut total_amount = 0.0;
        let mut transaction_ids = Vec::new();
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut edge_amounts = Vec::new();

        for i in 0..n {
            let from = path[i];
            let to = path[(i + 1) % n];
            if let Some(edge) = self.graph.edge(from, to) {
                total_amount += edge.amount;
                transaction_ids.extend(edge.transaction_ids.iter().cloned());
                edge_amounts.push(edge.amount);
                earliest = Some(match earliest {
                    Some(e) if e <= edge.timestamp => e,
                    _ => edge.timestamp,
                });
            }
        }

        let num_transactions = transaction_ids.len();
        let avg_transaction = if num_transactions > 0 {
            total_amount / num_transactions as f64
        } else {
            0.0
        };
        let amount_spread = coefficient_of_variation(&edge_amounts);
        let uniformity = 1.0 - amount_spread;

        let accounts = path
            .iter()
            .map(|&id| self.graph.account_name(id).to_string())
            .collect::<Vec<_>>();
        let strength = self.strength(total_amount, num_transactions, n);

        Cycle {
            accounts,
            total_amount,
            transaction_ids,
            num_transactions,
            avg_transaction,
            amount_spread,
            uniformity,
            earliest_timestamp: earliest.unwrap_or_else(Utc::now),
            strength,
        }
    }

    fn strength(&self, total_amount: f64, num_transactions: usize, length: usize) -> f64 {
        let c = self.config;
        let volume_score = total_amount / c.volume_norm;
        let frequency_score = num_transactions as f64 / c.frequency_norm;
        let length_score = length as f64 / c.length_norm;
        let raw = volume_score * c.volume_weight
            + frequency_score * c.frequency_weight
            + length_score * c.length_weight;
        raw.min(c.strength_cap)
    }

    /// Run full cycle detection: enumerate, dedup, score, sort by
    /// (strength desc, canonical asc), truncate to `top_k`.
    pub fn detect(&self, cancel: &CancellationToken) -> Result<Vec<Cycle>, EngineError> {
        let mut found: HashMap<Vec<u32>, Vec<u32>> = HashMap::new();

        for start in self.start_nodes() {
            self.dfs_from(start, &mut found, cancel)?;
        }

        let mut canonical_keys: Vec<Vec<u32>> = found.keys().cloned().collect();
        canonical_keys.sort();

        let mut cycles: Vec<Cycle> = canonical_keys
            .into_iter()
            .map(|key| {
                let path = found.remove(&key).unwrap();
                self.metrics(&path)
            })
            .collect();

        cycles.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| canonical_rotation_of(&a.accounts).cmp(&canonical_rotation_of(&b.accounts)))
        });
        cycles.truncate(self.config.top_k);
        Ok(cycles)
    }
}

/// Fraction of the graph's accounts that appear in at least one cycle.
pub fn cycle_participation(graph: &TransactionGraph, cycles: &[Cycle]) -> f64 {
    if graph.node_count() == 0 {
        return 0.0;
    }
    accounts_in_cycles(cycles).len() as f64 / graph.node_count() as f64
}

/// The set of distinct accounts appearing in any detected cycle.
pub fn accounts_in_cycles(cycles: &[Cycle]) -> HashSet<String> {
    cycles
        .iter()
        .flat_map(|c| c.accounts.iter().cloned())
        .collect()
}

/// Number of cycles a given account participates in, and the mean
/// `total_amount` across those cycles (0.0 if none).
pub fn ring_participation(account: &str, cycles: &[Cycle]) -> (usize, f64) {
    let involved: Vec<&Cycle> = cycles.iter().filter(|c| c.accounts.iter().any(|a| a == account)).collect();
    if involved.is_empty() {
        return (0, 0.0);
    }
    let avg_amount = involved.iter().map(|c| c.total_amount).sum::<f64>() / involved.len() as f64;
    (involved.len(), avg_amount)
}
