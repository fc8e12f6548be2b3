//! Min-max normalization of raw metric columns into [0, 1]
//!
//! Every column is normalized on its own. Absent and non-finite raw values
//! never leak into the output: they normalize to 0.0. A degenerate column
//! (all valid values equal) normalizes to 1.0 when the shared value is
//! positive and to 0.0 otherwise.

use crate::models::{Metric, ModelAggregate, NormalizedMetricTable, NormalizedRow};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Normalize one column of raw values, index-aligned with the input
pub fn normalize_column(values: &[Option<f64>]) -> Vec<f64> {
    let valid: Vec<f64> = values
        .iter()
        .filter_map(|v| v.filter(|x| x.is_finite()))
        .collect();

    if valid.is_empty() {
        return vec![0.0; values.len()];
    }

    let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
    let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max > min {
        let range = max - min;
        values
            .iter()
            .map(|v| match v {
                Some(x) if x.is_finite() => {
                    let scaled = (x - min) / range;
                    if scaled.is_finite() {
                        scaled.clamp(0.0, 1.0)
                    } else {
                        0.0
                    }
                }
                _ => 0.0,
            })
            .collect()
    } else {
        let fill = if max > 0.0 { 1.0 } else { 0.0 };
        values
            .iter()
            .map(|v| match v {
                Some(x) if x.is_finite() => fill,
                _ => 0.0,
            })
            .collect()
    }
}

/// Rescales every raw aggregate metric across the candidate set
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Metric columns present in the candidate set
    ///
    /// Similarity and benchmark columns only exist when some model with
    /// valid responses reports them; operational columns always exist.
    pub fn columns(&self, aggregates: &[ModelAggregate]) -> Vec<Metric> {
        if aggregates.is_empty() {
            return Vec::new();
        }
        let reporting: Vec<&ModelAggregate> = aggregates
            .iter()
            .filter(|a| a.valid_responses > 0)
            .collect();

        let mut columns: Vec<Metric> = Metric::SIMILARITY
            .into_iter()
            .filter(|m| reporting.iter().any(|a| a.metrics.contains_key(m)))
            .collect();
        columns.extend(Metric::OPERATIONAL);

        let benchmarks: BTreeSet<&String> = reporting
            .iter()
            .flat_map(|a| a.benchmarks.keys())
            .collect();
        columns.extend(benchmarks.into_iter().map(|b| Metric::Benchmark(b.clone())));

        columns
    }

    pub fn normalize(&self, aggregates: &[ModelAggregate]) -> NormalizedMetricTable {
        let metrics = self.columns(aggregates);
        let mut rows: Vec<NormalizedRow> = aggregates
            .iter()
            .map(|a| NormalizedRow {
                model: a.model.clone(),
                values: BTreeMap::new(),
            })
            .collect();

        for metric in &metrics {
            let raw: Vec<Option<f64>> = aggregates.iter().map(|a| a.raw_value(metric)).collect();
            let normalized = normalize_column(&raw);
            debug!(metric = %metric, models = raw.len(), "Normalized metric column");

            for (row, value) in rows.iter_mut().zip(normalized) {
                row.values.insert(metric.clone(), value);
            }
        }

        NormalizedMetricTable { metrics, rows }
    }
}
