//! Configuration knobs for every detector, with the spec's calibration
//! constants exposed rather than hardcoded (see DESIGN.md / REDESIGN FLAGS).

/// Cycle (ring) detector configuration.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub top_k: usize,
    pub high_degree_prefix: usize,
    /// Denominator normalizing total cycle volume in the strength formula.
    pub volume_norm: f64,
    /// Denominator normalizing transaction count in the strength formula.
    pub frequency_norm: f64,
    /// Denominator normalizing cycle length in the strength formula.
    pub length_norm: f64,
    pub volume_weight: f64,
    pub frequency_weight: f64,
    pub length_weight: f64,
    pub strength_cap: f64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            max_length: 5,
            top_k: 100,
            high_degree_prefix: 50,
            volume_norm: 100_000.0,
            frequency_norm: 10.0,
            length_norm: 3.0,
            volume_weight: 0.40,
            frequency_weight: 0.35,
            length_weight: 0.25,
            strength_cap: 10.0,
        }
    }
}

/// Smurfing/structuring detector configuration.
#[derive(Debug, Clone)]
pub struct SmurfingConfig {
    pub window_hours: i64,
    pub min_transactions: usize,
    pub structuring_thresholds: Vec<f64>,
    pub structuring_min_amounts: usize,
    pub structuring_fraction: f64,
    pub window_suspicious_threshold: f64,
    pub consolidation_min_inbound: usize,
    pub consolidation_min_outbound: usize,
    pub fan_min_connections: usize,
    pub fan_min_volume: f64,
}

impl Default for SmurfingConfig {
    fn default() -> Self {
        Self {
            window_hours: 72,
            min_transactions: 6,
            structuring_thresholds: vec![10_000.0, 5_000.0, 3_000.0, 1_000.0],
            structuring_min_amounts: 5,
            structuring_fraction: 0.4,
            window_suspicious_threshold: 30.0,
            consolidation_min_inbound: 3,
            consolidation_min_outbound: 1,
            fan_min_connections: 3,
            fan_min_volume: 20_000.0,
        }
    }
}

/// Shell / pass-through detector configuration.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub max_transactions: usize,
    pub min_total_value: f64,
    pub shell_emit_threshold: f64,
    pub pass_through_tolerance: f64,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_transactions: 5,
            min_total_value: 50_000.0,
            shell_emit_threshold: 40.0,
            pass_through_tolerance: 0.05,
        }
    }
}

/// Composite suspicion scorer configuration.
#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub weight_ring: f64,
    pub weight_smurfing: f64,
    pub weight_shell: f64,
    pub weight_patterns: f64,
    pub band_medium: f64,
    pub band_high: f64,
    pub band_critical: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            weight_ring: 0.30,
            weight_smurfing: 0.25,
            weight_shell: 0.25,
            weight_patterns: 0.20,
            band_medium: 40.0,
            band_high: 60.0,
            band_critical: 80.0,
        }
    }
}

/// Top-level configuration bundle for [`crate::engine::Engine`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub cycle: CycleConfig,
    pub smurfing: SmurfingConfig,
    pub shell: ShellConfig,
    pub scorer: ScorerConfig,
}
