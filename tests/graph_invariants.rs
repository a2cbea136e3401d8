//! Property tests over graph aggregation: whatever the input batch looks
//! like, the graph's aggregates must stay consistent with the transactions
//! that produced them.

use chrono::{TimeZone, Utc};
use forensics_engine::{GraphBuilder, Transaction};
use proptest::prelude::*;

fn arbitrary_account() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["A", "B", "C", "D", "E"]).prop_map(String::from)
}

fn arbitrary_batch(max_len: usize) -> impl Strategy<Value = Vec<Transaction>> {
    prop::collection::vec((arbitrary_account(), arbitrary_account(), 1.0f64..100_000.0), 1..max_len)
        .prop_map(|rows| {
            let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
            rows.into_iter()
                .enumerate()
                .map(|(index, (from, to, amount))| {
                    Transaction::new(
                        format!("T{index}"),
                        from,
                        to,
                        amount,
                        base + chrono::Duration::minutes(index as i64),
                        None,
                    )
                    .unwrap()
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn aggregate_out_totals_match_transaction_sums(txns in arbitrary_batch(30)) {
        let graph = GraphBuilder::new().build(&txns);

        let mut expected_out: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        let mut expected_in: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        for txn in &txns {
            *expected_out.entry(txn.from_account.clone()).or_default() += txn.amount;
            *expected_in.entry(txn.to_account.clone()).or_default() += txn.amount;
        }

        for (account, &total) in &expected_out {
            let agg = graph.aggregate_by_name(account).unwrap();
            prop_assert!((agg.total_out - total).abs() < 1e-6);
        }
        for (account, &total) in &expected_in {
            let agg = graph.aggregate_by_name(account).unwrap();
            prop_assert!((agg.total_in - total).abs() < 1e-6);
        }
    }

    #[test]
    fn every_transaction_id_appears_in_exactly_one_edge(txns in arbitrary_batch(30)) {
        let graph = GraphBuilder::new().build(&txns);

        for txn in &txns {
            let edge = graph.edge_by_name(&txn.from_account, &txn.to_account).unwrap();
            prop_assert!(edge.transaction_ids.contains(&txn.id));
        }
    }

    #[test]
    fn node_count_never_exceeds_distinct_account_count(txns in arbitrary_batch(30)) {
        let graph = GraphBuilder::new().build(&txns);
        let mut distinct: std::collections::HashSet<String> = std::collections::HashSet::new();
        for txn in &txns {
            distinct.insert(txn.from_account.clone());
            distinct.insert(txn.to_account.clone());
        }
        prop_assert_eq!(graph.node_count(), distinct.len());
    }
}
