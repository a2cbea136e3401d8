//! Load a transaction batch from a CSV file (path given as the first
//! argument, falling back to an inline sample) and run the engine over it.

use forensics_engine::{CancellationToken, Engine, EngineConfig};

fn main() {
    tracing_subscriber::fmt::init();

    let txns = match std::env::args().nth(1) {
        Some(path) => forensics_engine::csv_ingest::load_from_path(&path)
            .unwrap_or_else(|err| panic!("failed to load {path}: {err}")),
        None => {
            let sample = "id,from_account,to_account,amount,timestamp,description\n\
                          T1,ACC_A,ACC_B,48000.0,2025-01-01T00:00:00Z,wire\n\
                          T2,ACC_B,ACC_C,47500.0,2025-01-01T06:00:00Z,wire\n\
                          T3,ACC_C,ACC_A,47000.0,2025-01-01T12:00:00Z,wire\n";
            forensics_engine::csv_ingest::load_from_reader(sample.as_bytes())
                .expect("inline sample should parse")
        }
    };

    println!("loaded {} transactions", txns.len());

    let engine = Engine::new(EngineConfig::default());
    let cancel = CancellationToken::new();
    let result = engine.analyze(&txns, &cancel).expect("analysis should succeed");
    println!("{:#?}", result.summary);
}
