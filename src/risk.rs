//! Shared risk-level classification used by the shell detector and the
//! composite suspicion scorer, which recompute independently (see
//! DESIGN.md's "scoring consistency" note) but classify with the same bands.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        write!(f, "{s}")
    }
}

/// Classify a 0-100 score into a risk band given the medium/high/critical
/// cutoffs (`score < medium` is Low, `>= critical` is Critical).
pub fn classify(score: f64, medium: f64, high: f64, critical: f64) -> RiskLevel {
    if score >= critical {
        RiskLevel::Critical
    } else if score >= high {
        RiskLevel::High
    } else if score >= medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_match_spec_cutoffs() {
        assert_eq!(classify(39.9, 40.0, 60.0, 80.0), RiskLevel::Low);
        assert_eq!(classify(40.0, 40.0, 60.0, 80.0), RiskLevel::Medium);
        assert_eq!(classify(59.9, 40.0, 60.0, 80.0), RiskLevel::Medium);
        assert_eq!(classify(60.0, 40.0, 60.0, 80.0), RiskLevel::High);
        assert_eq!(classify(79.9, 40.0, 60.0, 80.0), RiskLevel::High);
        assert_eq!(classify(80.0, 40.0, 60.0, 80.0), RiskLevel::Critical);
        assert_eq!(classify(100.0, 40.0, 60.0, 80.0), RiskLevel::Critical);
    }
}
