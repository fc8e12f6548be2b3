//! Error types for ranking configuration

use thiserror::Error;

/// Inconsistent thresholds or weights in a [`crate::config::RankingConfig`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Error-rate threshold must lie in [0, 1]
    #[error("max_error_rate must be within [0, 1], got {value}")]
    ErrorRateOutOfRange {
        /// Configured threshold
        value: f64,
    },

    /// Reliability factor would divide by zero
    #[error("reliability_target must be greater than 0")]
    ZeroReliabilityTarget,

    /// Weight is negative or not a number
    #[error("Invalid weight for {metric}: {weight}")]
    InvalidWeight {
        /// Metric label
        metric: String,
        /// Offending weight
        weight: f64,
    },

    /// Every weight is zero
    #[error("At least one metric weight must be positive")]
    EmptyWeights,

    /// Penalty tiers must be strictly ascending by `below`
    #[error("Sample penalty tiers must be ascending, found below = {below} out of order")]
    UnorderedPenalties {
        /// Threshold of the out-of-order tier
        below: usize,
    },

    /// Penalty multiplier must lie in [0, 1]
    #[error("Sample penalty for below = {below} must be within [0, 1], got {multiplier}")]
    PenaltyOutOfRange {
        /// Threshold of the tier
        below: usize,
        /// Offending multiplier
        multiplier: f64,
    },
}
