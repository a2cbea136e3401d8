//! Run the full analysis pipeline over a hand-built transaction batch and
//! print the summary plus the top suspicious accounts.

use chrono::{Duration, TimeZone, Utc};
use forensics_engine::{CancellationToken, Engine, EngineConfig, Transaction};

fn main() {
    tracing_subscriber::fmt::init();

    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let txns = vec![
        Transaction::new("T1", "ACC_A", "ACC_B", 48_000.0, base, None).unwrap(),
        Transaction::new("T2", "ACC_B", "ACC_C", 47_500.0, base + Duration::hours(6), None).unwrap(),
        Transaction::new("T3", "ACC_C", "ACC_A", 47_000.0, base + Duration::hours(12), None).unwrap(),
        Transaction::new("T4", "ACC_D", "ACC_E", 9_800.0, base + Duration::hours(1), None).unwrap(),
        Transaction::new("T5", "ACC_F", "ACC_E", 9_700.0, base + Duration::hours(2), None).unwrap(),
        Transaction::new("T6", "ACC_G", "ACC_E", 9_600.0, base + Duration::hours(3), None).unwrap(),
    ];

    let engine = Engine::new(EngineConfig::default());
    let cancel = CancellationToken::new();

    match engine.analyze(&txns, &cancel) {
        Ok(result) => {
            println!("analysis {}", result.analysis_id);
            println!("{:#?}", result.summary);
            for score in result.account_scores.iter().take(5) {
                println!(
                    "{:<8} final={:>6.1} ring={:>6.1} smurfing={:>6.1} shell={:>6.1} ({})",
                    score.account,
                    score.final_score,
                    score.ring_score,
                    score.smurfing_score,
                    score.shell_score,
                    score.risk_level
                );
            }
        }
        Err(err) => eprintln!("analysis failed: {err}"),
    }
}
