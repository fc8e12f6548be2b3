use crate::error::ConfigError;
use crate::models::Metric;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the overall ranking score is built from normalized metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallMode {
    /// Fixed per-metric weight table
    Weighted,
    /// Plain mean of every categorised metric
    CategoryMean,
}

/// Weights of the primary "best model" score, one per normalized metric
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricWeights {
    #[serde(default = "default_bleu_weight")]
    pub bleu: f64,
    #[serde(default = "default_rouge1_weight")]
    pub rouge1: f64,
    #[serde(default = "default_rouge2_weight")]
    pub rouge2: f64,
    #[serde(default = "default_rouge_l_weight")]
    pub rouge_l: f64,
    #[serde(default = "default_bertscore_weight")]
    pub bertscore: f64,
    #[serde(default = "default_validity_rate_weight")]
    pub validity_rate: f64,
}

fn default_bleu_weight() -> f64 {
    0.10
}

fn default_rouge1_weight() -> f64 {
    0.25
}

fn default_rouge2_weight() -> f64 {
    0.20
}

fn default_rouge_l_weight() -> f64 {
    0.15
}

fn default_bertscore_weight() -> f64 {
    0.25
}

fn default_validity_rate_weight() -> f64 {
    0.05
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            bleu: default_bleu_weight(),
            rouge1: default_rouge1_weight(),
            rouge2: default_rouge2_weight(),
            rouge_l: default_rouge_l_weight(),
            bertscore: default_bertscore_weight(),
            validity_rate: default_validity_rate_weight(),
        }
    }
}

impl MetricWeights {
    /// The weight table as (metric, weight) pairs
    pub fn entries(&self) -> [(Metric, f64); 6] {
        [
            (Metric::Bleu, self.bleu),
            (Metric::Rouge1, self.rouge1),
            (Metric::Rouge2, self.rouge2),
            (Metric::RougeL, self.rouge_l),
            (Metric::BertScore, self.bertscore),
            (Metric::ValidityRate, self.validity_rate),
        ]
    }
}

/// Multiplier applied when a model has fewer than `below` valid responses
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SamplePenalty {
    pub below: usize,
    pub multiplier: f64,
}

/// Named set of models compared against each other in the insights
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelGroup {
    pub name: String,
    /// Case-insensitive substrings of the model identifier
    pub patterns: Vec<String>,
}

/// Thresholds and weights shared by every pipeline stage
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankingConfig {
    /// Models whose error rate exceeds this are left out of the aggregate
    #[serde(default = "default_max_error_rate")]
    pub max_error_rate: f64,
    /// Valid responses needed for a full reliability factor
    #[serde(default = "default_reliability_target")]
    pub reliability_target: usize,
    #[serde(default = "default_overall_mode")]
    pub overall_mode: OverallMode,
    #[serde(default)]
    pub weights: MetricWeights,
    /// Minimum-sample penalty tiers, ascending by `below`
    #[serde(default = "default_sample_penalties")]
    pub sample_penalties: Vec<SamplePenalty>,
    /// Substrings marking a prediction as an error when no flag is recorded
    #[serde(default = "default_invalid_patterns")]
    pub invalid_patterns: Vec<String>,
    #[serde(default)]
    pub groups: Vec<ModelGroup>,
}

fn default_max_error_rate() -> f64 {
    0.4
}

fn default_reliability_target() -> usize {
    10
}

fn default_overall_mode() -> OverallMode {
    OverallMode::Weighted
}

fn default_sample_penalties() -> Vec<SamplePenalty> {
    vec![
        SamplePenalty {
            below: 5,
            multiplier: 0.3,
        },
        SamplePenalty {
            below: 10,
            multiplier: 0.6,
        },
    ]
}

fn default_invalid_patterns() -> Vec<String> {
    [
        "erro",
        "error",
        "timeout",
        "rate limit",
        "api key",
        "authentication",
        "connection",
        "network",
        "failed",
        "exception",
        "traceback",
        "null",
        "none",
        "undefined",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            max_error_rate: default_max_error_rate(),
            reliability_target: default_reliability_target(),
            overall_mode: default_overall_mode(),
            weights: MetricWeights::default(),
            sample_penalties: default_sample_penalties(),
            invalid_patterns: default_invalid_patterns(),
            groups: Vec::new(),
        }
    }
}

impl RankingConfig {
    /// Check thresholds, weights and penalty tiers for consistency
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.max_error_rate) {
            return Err(ConfigError::ErrorRateOutOfRange {
                value: self.max_error_rate,
            });
        }

        if self.reliability_target == 0 {
            return Err(ConfigError::ZeroReliabilityTarget);
        }

        let mut total = 0.0;
        for (metric, weight) in self.weights.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    metric: metric.label(),
                    weight,
                });
            }
            total += weight;
        }
        if total <= 0.0 {
            return Err(ConfigError::EmptyWeights);
        }

        let mut previous = 0;
        for tier in &self.sample_penalties {
            if tier.below <= previous {
                return Err(ConfigError::UnorderedPenalties { below: tier.below });
            }
            if !(0.0..=1.0).contains(&tier.multiplier) {
                return Err(ConfigError::PenaltyOutOfRange {
                    below: tier.below,
                    multiplier: tier.multiplier,
                });
            }
            previous = tier.below;
        }

        Ok(())
    }
}

/// Root configuration: where the runs live and how to rank them
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Run files (JSON or CSV) holding per-response records
    #[serde(default)]
    pub runs: Vec<PathBuf>,
    /// Optional local path to store the ranking report as JSON
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub ranking: RankingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;

        config
            .ranking
            .validate()
            .with_context(|| format!("Invalid ranking config: {}", path.display()))?;

        Ok(config)
    }
}
