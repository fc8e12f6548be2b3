use crate::config::{OverallMode, RankingConfig};
use crate::models::{
    Category, CategoryScores, CompositeScore, ModelAggregate, NormalizedMetricTable,
};
use tracing::debug;

/// Combines normalized metrics into category and overall scores
pub struct CompositeScorer<'a> {
    config: &'a RankingConfig,
}

impl<'a> CompositeScorer<'a> {
    pub fn new(config: &'a RankingConfig) -> Self {
        Self { config }
    }

    /// `min(1, valid / reliability_target)`
    pub fn reliability_factor(&self, valid_responses: usize) -> f64 {
        if self.config.reliability_target == 0 {
            return 1.0;
        }
        (valid_responses as f64 / self.config.reliability_target as f64).min(1.0)
    }

    /// Multiplier of the first tier the valid count falls below, else 1.0
    pub fn sample_penalty(&self, valid_responses: usize) -> f64 {
        self.config
            .sample_penalties
            .iter()
            .find(|tier| valid_responses < tier.below)
            .map(|tier| tier.multiplier)
            .unwrap_or(1.0)
    }

    /// Mean of each category's normalized metrics for one model
    pub fn category_scores(&self, table: &NormalizedMetricTable, model: &str) -> CategoryScores {
        let mut scores = CategoryScores::default();
        for category in Category::ALL {
            let values: Vec<f64> = table
                .metrics_in(category)
                .into_iter()
                .map(|m| table.get(model, m).unwrap_or(0.0))
                .collect();
            scores.set(category, mean(&values));
        }
        scores
    }

    /// Mean over every metric column in the table
    pub fn mean_score(&self, table: &NormalizedMetricTable, model: &str) -> f64 {
        let values: Vec<f64> = table
            .metrics
            .iter()
            .map(|m| table.get(model, m).unwrap_or(0.0))
            .collect();
        mean(&values).unwrap_or(0.0)
    }

    /// Weight-table score, renormalized over the weighted columns present
    pub fn weighted_score(&self, table: &NormalizedMetricTable, model: &str) -> f64 {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for (metric, weight) in self.config.weights.entries() {
            if !table.has_metric(&metric) {
                continue;
            }
            weighted_sum += weight * table.get(model, &metric).unwrap_or(0.0);
            weight_total += weight;
        }

        if weight_total > 0.0 {
            weighted_sum / weight_total
        } else {
            0.0
        }
    }

    pub fn score(&self, table: &NormalizedMetricTable, aggregate: &ModelAggregate) -> CompositeScore {
        let model = aggregate.model.as_str();
        let valid = aggregate.valid_responses;

        let category_scores = self.category_scores(table, model);
        let mean_score = self.mean_score(table, model);
        let weighted_score = self.weighted_score(table, model);
        let base_score = match self.config.overall_mode {
            OverallMode::Weighted => weighted_score,
            OverallMode::CategoryMean => mean_score,
        };

        let reliability_factor = self.reliability_factor(valid);
        let sample_penalty = self.sample_penalty(valid);
        let penalty_factor = reliability_factor * sample_penalty;
        let final_score = if valid == 0 {
            0.0
        } else {
            base_score * penalty_factor
        };

        debug!(
            model,
            base_score,
            reliability_factor,
            sample_penalty,
            final_score,
            "Scored model"
        );

        CompositeScore {
            model: model.to_string(),
            valid_responses: valid,
            category_scores,
            mean_score,
            weighted_score,
            base_score,
            reliability_factor,
            sample_penalty,
            penalty_factor,
            final_score,
        }
    }

    pub fn score_all(
        &self,
        table: &NormalizedMetricTable,
        aggregates: &[ModelAggregate],
    ) -> Vec<CompositeScore> {
        aggregates.iter().map(|a| self.score(table, a)).collect()
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
