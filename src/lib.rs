//! # Transaction Forensics Engine
//!
//! A graph-based analysis engine for detecting money-laundering patterns in
//! batches of financial transactions: circular flows ("rings"), structuring
//! and smurfing, shell/pass-through accounts, and a composite per-account
//! suspicion score fusing all three.
//!
//! ## What this crate does
//!
//! - **Graph construction**: collapses a transaction batch into a directed
//!   account graph with per-edge aggregation ([`graph`]).
//! - **Ring detection**: bounded-length simple cycle enumeration with
//!   financial-strength scoring ([`cycle`]).
//! - **Structuring/smurfing detection**: an overlapping sliding-window
//!   sweep fusing four signals into one alert per account ([`smurfing`]).
//! - **Shell account detection**: a six-factor weighted composite score
//!   ([`shell`]).
//! - **Composite scoring**: a weighted fusion of all three detectors into
//!   one risk-banded score per account ([`scoring`]).
//!
//! CSV ingestion ([`csv_ingest`]) and narrative report generation
//! ([`narrative`]) are ambient conveniences around the core engine
//! ([`engine`]); neither is required to use it.

pub mod cancellation;
pub mod config;
pub mod csv_ingest;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod graph;
pub mod narrative;
pub mod risk;
pub mod scoring;
pub mod shell;
pub mod smurfing;
pub mod transaction;

pub use cancellation::CancellationToken;
pub use config::{CycleConfig, EngineConfig, ScorerConfig, ShellConfig, SmurfingConfig};
pub use cycle::{Cycle, CycleDetector};
pub use engine::{AnalysisResult, Engine, EngineApi, InMemoryResultCache, ResultCache, State, Summary};
pub use error::EngineError;
pub use graph::{AccountAggregate, Edge, GraphBuilder, TransactionGraph};
pub use narrative::{DeterministicNarrator, Narrator};
pub use risk::RiskLevel;
pub use scoring::{critical_accounts, high_risk_accounts, index_by_account, AccountSuspicionScore, SuspicionScorer};
pub use shell::{AccountProfile, ShellAlert, ShellDetector};
pub use smurfing::{SmurfingAlert, SmurfingDetector};
pub use transaction::Transaction;
