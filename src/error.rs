//! Engine error taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the analysis engine and its collaborators.
///
/// Only [`EngineError::InvalidInput`] and [`EngineError::NotFound`] are meant
/// to reach an external caller as a user-facing failure; `CycleBudgetExceeded`
/// is a soft internal safety net and `Cancelled` reflects a cooperative stop.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("cycle enumeration budget exceeded: {0}")]
    CycleBudgetExceeded(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("analysis cancelled")]
    Cancelled,
}
