use crate::models::{BenchmarkAccuracy, Metric, MetricStats, ModelAggregate, ResponseRecord};
use crate::reliability::{InvalidityPredicate, is_error};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Computes per-model statistics over valid responses
pub struct Aggregator<'a> {
    predicate: &'a dyn InvalidityPredicate,
}

impl<'a> Aggregator<'a> {
    pub fn new(predicate: &'a dyn InvalidityPredicate) -> Self {
        Self { predicate }
    }

    /// One aggregate per model, in the map's model order
    pub fn aggregate_all(&self, by_model: &BTreeMap<String, Vec<ResponseRecord>>) -> Vec<ModelAggregate> {
        by_model
            .iter()
            .map(|(model, records)| self.aggregate(model, records))
            .collect()
    }

    pub fn aggregate(&self, model: &str, records: &[ResponseRecord]) -> ModelAggregate {
        let runs: BTreeSet<String> = records.iter().filter_map(|r| r.run.clone()).collect();
        let total_responses = records.len();
        let valid: Vec<&ResponseRecord> = records
            .iter()
            .filter(|r| !is_error(r, self.predicate))
            .collect();
        let valid_responses = valid.len();

        let mut aggregate = ModelAggregate {
            model: model.to_string(),
            runs: runs.into_iter().collect(),
            total_responses,
            valid_responses,
            ..ModelAggregate::default()
        };

        if valid_responses == 0 {
            debug!(model, total_responses, "No valid responses, aggregate defaults to zero");
            return aggregate;
        }

        aggregate.validity_rate = valid_responses as f64 / total_responses as f64;

        for metric in Metric::SIMILARITY {
            let values: Vec<f64> = valid.iter().filter_map(|r| r.metric(&metric)).collect();
            if !values.is_empty() {
                aggregate.metrics.insert(metric, MetricStats::from_values(&values));
            }
        }

        let lengths: Vec<f64> = valid.iter().map(|r| r.length() as f64).collect();
        let words: Vec<f64> = valid.iter().map(|r| r.words() as f64).collect();
        aggregate.length = MetricStats::from_values(&lengths);
        aggregate.words = MetricStats::from_values(&words);
        aggregate.length_cv = coefficient_of_variation(&aggregate.length);

        aggregate.benchmarks = self.benchmark_accuracies(records);

        debug!(
            model,
            total_responses,
            valid_responses,
            validity_rate = aggregate.validity_rate,
            "Aggregated model metrics"
        );

        aggregate
    }

    /// Accuracy per benchmark over every attempted question
    ///
    /// Errored answers count as incorrect.
    fn benchmark_accuracies(&self, records: &[ResponseRecord]) -> BTreeMap<String, BenchmarkAccuracy> {
        let mut tallies: BTreeMap<String, (usize, usize, BTreeMap<String, (usize, usize)>)> =
            BTreeMap::new();

        for record in records {
            let Some(benchmark) = record.benchmark.as_ref() else {
                continue;
            };
            let correct = !is_error(record, self.predicate) && record.benchmark_correct == Some(true);

            let (total, hits, subjects) = tallies.entry(benchmark.to_lowercase()).or_default();
            *total += 1;
            if correct {
                *hits += 1;
            }
            if let Some(subject) = &record.subject {
                let (subject_total, subject_hits) = subjects.entry(subject.clone()).or_default();
                *subject_total += 1;
                if correct {
                    *subject_hits += 1;
                }
            }
        }

        tallies
            .into_iter()
            .map(|(benchmark, (total, hits, subjects))| {
                let accuracy = BenchmarkAccuracy {
                    benchmark: benchmark.clone(),
                    total_questions: total,
                    correct_answers: hits,
                    accuracy: ratio(hits, total),
                    subjects: subjects
                        .into_iter()
                        .map(|(subject, (t, h))| (subject, ratio(h, t)))
                        .collect(),
                };
                (benchmark, accuracy)
            })
            .collect()
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// `std / mean * 100`, undefined for a non-positive mean
pub fn coefficient_of_variation(stats: &MetricStats) -> Option<f64> {
    if stats.count == 0 || stats.mean <= 0.0 {
        return None;
    }
    let cv = stats.std / stats.mean * 100.0;
    cv.is_finite().then_some(cv)
}
