//! The immutable transaction record the whole engine operates over.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single financial transfer between two accounts.
///
/// Distinct `from_account`/`to_account` is not required — self-edges are
/// kept in the graph but ignored by cycle enumeration, which requires
/// length >= 3.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

impl Transaction {
    /// Construct a transaction, rejecting non-positive amounts at the
    /// boundary so the rest of the engine can assume positivity.
    pub fn new(
        id: impl Into<String>,
        from_account: impl Into<String>,
        to_account: impl Into<String>,
        amount: f64,
        timestamp: DateTime<Utc>,
        description: Option<String>,
    ) -> Result<Self, EngineError> {
        if !(amount > 0.0) {
            return Err(EngineError::InvalidInput(format!(
                "amount must be positive, got {amount}"
            )));
        }
        Ok(Self {
            id: id.into(),
            from_account: from_account.into(),
            to_account: to_account.into(),
            amount,
            timestamp,
            description,
        })
    }
}
