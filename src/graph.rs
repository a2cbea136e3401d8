//! Graph Builder: folds a transaction list into a directed multigraph
//! collapsed to a simple graph with aggregation.
//!
//! Account identifiers are opaque strings; they're interned to `u32` node
//! ids at build time so the cycle detector's DFS can work over integers with
//! bit-set visited arrays (see DESIGN.md / spec §9).

use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Aggregate edge record for all transactions from one account to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub amount: f64,
    pub transaction_ids: Vec<String>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Per-account degree/volume aggregates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountAggregate {
    pub in_degree: usize,
    pub out_degree: usize,
    pub total_in: f64,
    pub total_out: f64,
    pub txn_count: usize,
}

/// The interned directed multigraph, collapsed to one [`Edge`] per ordered
/// account pair.
#[derive(Debug, Clone)]
pub struct TransactionGraph {
    node_ids: HashMap<String, u32>,
    node_names: Vec<String>,
    successors: Vec<HashMap<u32, Edge>>,
    predecessors: Vec<Vec<u32>>,
    aggregates: Vec<AccountAggregate>,
}

impl TransactionGraph {
    fn empty() -> Self {
        Self {
            node_ids: HashMap::new(),
            node_names: Vec::new(),
            successors: Vec::new(),
            predecessors: Vec::new(),
            aggregates: Vec::new(),
        }
    }

    fn intern(&mut self, account: &str) -> u32 {
        if let Some(&id) = self.node_ids.get(account) {
            return id;
        }
        let id = self.node_names.len() as u32;
        self.node_names.push(account.to_string());
        self.node_ids.insert(account.to_string(), id);
        self.successors.push(HashMap::new());
        self.predecessors.push(Vec::new());
        self.aggregates.push(AccountAggregate::default());
        id
    }

    pub fn node_count(&self) -> usize {
        self.node_names.len()
    }

    pub fn account_name(&self, node: u32) -> &str {
        &self.node_names[node as usize]
    }

    pub fn node_id(&self, account: &str) -> Option<u32> {
        self.node_ids.get(account).copied()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &str> {
        self.node_names.iter().map(|s| s.as_str())
    }

    pub fn node_ids_iter(&self) -> impl Iterator<Item = u32> {
        0..(self.node_names.len() as u32)
    }

    pub fn out_degree_nodes(&self, node: u32) -> usize {
        self.successors[node as usize].len()
    }

    /// Number of distinct accounts that have ever sent to `node` (unlike
    /// `AccountAggregate::in_degree`, which counts transactions, not
    /// counterparties). `predecessors` gains an entry only the first time an
    /// ordered pair is seen, so it is already deduplicated.
    pub fn in_neighbor_count(&self, node: u32) -> usize {
        self.predecessors[node as usize].len()
    }

    pub fn successors(&self, node: u32) -> impl Iterator<Item = u32> + '_ {
        self.successors[node as usize].keys().copied()
    }

    pub fn edge(&self, from: u32, to: u32) -> Option<&Edge> {
        self.successors[from as usize].get(&to)
    }

    pub fn edge_by_name(&self, from: &str, to: &str) -> Option<&Edge> {
        let f = self.node_id(from)?;
        let t = self.node_id(to)?;
        self.edge(f, t)
    }

    pub fn aggregate(&self, node: u32) -> AccountAggregate {
        self.aggregates[node as usize]
    }

    pub fn aggregate_by_name(&self, account: &str) -> Option<AccountAggregate> {
        self.node_id(account).map(|id| self.aggregate(id))
    }

    /// All neighbors reachable within `depth` outgoing hops (BFS), excluding
    /// the starting account itself. Used by the narrative collaborator's
    /// fallback recommendations (spec §4.1 supplement).
    pub fn get_neighbors(&self, account: &str, depth: usize) -> std::collections::HashSet<String> {
        let mut neighbors = std::collections::HashSet::new();
        let Some(start) = self.node_id(account) else {
            return neighbors;
        };
        let mut visited = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((start, 0usize));
        visited.insert(start);

        while let Some((current, current_depth)) = queue.pop_front() {
            if current_depth >= depth {
                continue;
            }
            for next in self.successors(current) {
                if visited.insert(next) {
                    queue.push_back((next, current_depth + 1));
                }
            }
        }

        for &node in &visited {
            if node != start {
                neighbors.insert(self.account_name(node).to_string());
            }
        }
        neighbors
    }
}

/// Builds a [`TransactionGraph`] from a transaction batch, iterating in
/// input order so edge aggregation (earliest-wins timestamp, append-order
/// transaction ids) is deterministic for a given input.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, transactions: &[Transaction]) -> TransactionGraph {
        let mut graph = TransactionGraph::empty();

        for txn in transactions {
            let from = graph.intern(&txn.from_account);
            let to = graph.intern(&txn.to_account);

            match graph.successors[from as usize].get_mut(&to) {
                Some(edge) => {
                    edge.amount += txn.amount;
                    edge.transaction_ids.push(txn.id.clone());
                    edge.count += 1;
                    if txn.timestamp < edge.timestamp {
                        edge.timestamp = txn.timestamp;
                    }
                }
                None => {
                    graph.successors[from as usize].insert(
                        to,
                        Edge {
                            amount: txn.amount,
                            transaction_ids: vec![txn.id.clone()],
                            count: 1,
                            timestamp: txn.timestamp,
                        },
                    );
                    graph.predecessors[to as usize].push(from);
                }
            }

            let from_agg = &mut graph.aggregates[from as usize];
            from_agg.out_degree += 1;
            from_agg.total_out += txn.amount;
            from_agg.txn_count += 1;

            let to_agg = &mut graph.aggregates[to as usize];
            to_agg.in_degree += 1;
            to_agg.total_in += txn.amount;
            to_agg.txn_count += 1;
        }

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn txn(id: &str, from: &str, to: &str, amount: f64, hour: u32) -> Transaction {
        Transaction::new(
            id,
            from,
            to,
            amount,
            Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn aggregates_parallel_edges() {
        let txns = vec![
            txn("T1", "A", "B", 100.0, 0),
            txn("T2", "A", "B", 50.0, 1),
        ];
        let graph = GraphBuilder::new().build(&txns);
        let edge = graph.edge_by_name("A", "B").unwrap();
        assert_eq!(edge.amount, 150.0);
        assert_eq!(edge.count, 2);
        assert_eq!(edge.transaction_ids, vec!["T1".to_string(), "T2".to_string()]);
    }

    #[test]
    fn earliest_timestamp_wins_regardless_of_order() {
        let txns = vec![
            txn("T1", "A", "B", 100.0, 5),
            txn("T2", "A", "B", 50.0, 1),
        ];
        let graph = GraphBuilder::new().build(&txns);
        let edge = graph.edge_by_name("A", "B").unwrap();
        assert_eq!(edge.timestamp.hour(), 1);
    }

    #[test]
    fn aggregates_match_transaction_sums() {
        let txns = vec![
            txn("T1", "A", "B", 100.0, 0),
            txn("T2", "B", "C", 40.0, 1),
            txn("T3", "A", "C", 10.0, 2),
        ];
        let graph = GraphBuilder::new().build(&txns);
        let a = graph.aggregate_by_name("A").unwrap();
        assert_eq!(a.total_out, 110.0);
        assert_eq!(a.out_degree, 2);
        let b = graph.aggregate_by_name("B").unwrap();
        assert_eq!(b.total_in, 100.0);
        assert_eq!(b.total_out, 40.0);
    }

    #[test]
    fn self_edges_are_kept() {
        let txns = vec![txn("T1", "A", "A", 100.0, 0)];
        let graph = GraphBuilder::new().build(&txns);
        assert!(graph.edge_by_name("A", "A").is_some());
    }
}
