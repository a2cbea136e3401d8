//! Produce a human-readable narrative report for a hand-built batch using
//! the deterministic, offline narrator.

use chrono::{Duration, TimeZone, Utc};
use forensics_engine::{CancellationToken, DeterministicNarrator, Engine, EngineConfig, GraphBuilder, Transaction};

fn main() {
    tracing_subscriber::fmt::init();

    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let txns = vec![
        Transaction::new("T1", "ACC_A", "ACC_B", 48_000.0, base, None).unwrap(),
        Transaction::new("T2", "ACC_B", "ACC_C", 47_500.0, base + Duration::hours(6), None).unwrap(),
        Transaction::new("T3", "ACC_C", "ACC_A", 47_000.0, base + Duration::hours(12), None).unwrap(),
    ];

    let engine = Engine::new(EngineConfig::default());
    let cancel = CancellationToken::new();
    let result = engine.analyze(&txns, &cancel).expect("analysis should succeed");

    let graph = GraphBuilder::new().build(&txns);
    let narrator = DeterministicNarrator::new();
    let report = forensics_engine::narrative::narrative_report(&narrator, &graph, &result);

    println!("{report}");
}
