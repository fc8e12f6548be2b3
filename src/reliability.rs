use crate::config::RankingConfig;
use crate::consolidate::ConsolidatedRecords;
use crate::models::{ExcludedModel, ExclusionReason, ResponseRecord};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Decides whether a prediction is an error when no flag was recorded
pub trait InvalidityPredicate {
    fn is_invalid(&self, prediction: &str) -> bool;
}

/// Flags empty predictions and predictions mentioning any error pattern
#[derive(Debug, Clone)]
pub struct ErrorPatternPredicate {
    patterns: Vec<String>,
}

impl ErrorPatternPredicate {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

impl InvalidityPredicate for ErrorPatternPredicate {
    fn is_invalid(&self, prediction: &str) -> bool {
        let normalized = prediction.trim().to_lowercase();
        if normalized.is_empty() {
            return true;
        }
        self.patterns.iter().any(|p| normalized.contains(p.as_str()))
    }
}

/// Error flag of a record: the recorded flag, else the predicate's verdict
pub fn is_error(record: &ResponseRecord, predicate: &dyn InvalidityPredicate) -> bool {
    match record.is_error {
        Some(flag) => flag,
        None => predicate.is_invalid(&record.prediction),
    }
}

/// Models that passed the filter and those set aside for diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub kept: BTreeMap<String, Vec<ResponseRecord>>,
    pub excluded: Vec<ExcludedModel>,
    /// Raw records of excluded models, untouched
    pub excluded_records: BTreeMap<String, Vec<ResponseRecord>>,
}

/// Drops models whose error rate is above the configured threshold
pub struct ReliabilityFilter<'a> {
    max_error_rate: f64,
    predicate: &'a dyn InvalidityPredicate,
}

impl<'a> ReliabilityFilter<'a> {
    pub fn new(config: &RankingConfig, predicate: &'a dyn InvalidityPredicate) -> Self {
        Self {
            max_error_rate: config.max_error_rate,
            predicate,
        }
    }

    /// Error count and rate; the rate is undefined without records
    pub fn error_rate(&self, records: &[ResponseRecord]) -> (usize, Option<f64>) {
        let errors = records
            .iter()
            .filter(|r| is_error(r, self.predicate))
            .count();
        if records.is_empty() {
            (errors, None)
        } else {
            (errors, Some(errors as f64 / records.len() as f64))
        }
    }

    pub fn filter(&self, consolidated: ConsolidatedRecords) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for (model, records) in consolidated.by_model {
            let (errors, rate) = self.error_rate(&records);

            let reason = match rate {
                None => Some(ExclusionReason::NoResponses),
                Some(rate) if rate > self.max_error_rate => {
                    Some(ExclusionReason::ErrorRateAboveThreshold)
                }
                Some(_) => None,
            };

            match reason {
                Some(reason) => {
                    warn!(
                        model = %model,
                        errors,
                        total = records.len(),
                        error_rate = rate.unwrap_or(f64::NAN),
                        "Excluding model from primary aggregate"
                    );
                    outcome.excluded.push(ExcludedModel {
                        model: model.clone(),
                        total_responses: records.len(),
                        error_responses: errors,
                        error_rate: rate,
                        reason,
                    });
                    outcome.excluded_records.insert(model, records);
                }
                None => {
                    debug!(model = %model, errors, total = records.len(), "Model passed reliability filter");
                    outcome.kept.insert(model, records);
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::Consolidator;

    fn record(model: &str, is_error: Option<bool>, prediction: &str) -> ResponseRecord {
        ResponseRecord {
            model: model.to_string(),
            is_error,
            prediction: prediction.to_string(),
            ..ResponseRecord::default()
        }
    }

    fn default_predicate() -> ErrorPatternPredicate {
        ErrorPatternPredicate::new(&RankingConfig::default().invalid_patterns)
    }

    #[test]
    fn test_pattern_predicate() {
        let predicate = default_predicate();
        assert!(predicate.is_invalid(""));
        assert!(predicate.is_invalid("   "));
        assert!(predicate.is_invalid("Request TIMEOUT after 30s"));
        assert!(predicate.is_invalid("Rate limit exceeded"));
        assert!(!predicate.is_invalid("The capital of France is Paris."));
    }

    #[test]
    fn test_pattern_predicate_flags_erro_prefix() {
        let predicate = default_predicate();
        assert!(predicate.is_invalid(
            "[ERRO]: Conteúdo bloqueado por filtros de segurança para gemini"
        ));
        assert!(predicate.is_invalid("[ERRO]: Timeout após 3 tentativas"));

        let record = record("gemini", None, "[ERRO]: resposta vazia do modelo");
        assert!(is_error(&record, &predicate));
    }

    #[test]
    fn test_explicit_flag_wins_over_predicate() {
        let predicate = default_predicate();
        assert!(!is_error(&record("m", Some(false), "error handling in Rust"), &predicate));
        assert!(is_error(&record("m", Some(true), "Paris"), &predicate));
        assert!(is_error(&record("m", None, "connection refused"), &predicate));
    }

    #[test]
    fn test_filter_excludes_above_threshold() {
        let predicate = default_predicate();
        let config = RankingConfig::default();
        let filter = ReliabilityFilter::new(&config, &predicate);

        let mut records = Vec::new();
        // flaky: 3 errors out of 5 -> 0.6
        for i in 0..5 {
            records.push(record("flaky", Some(i < 3), "answer"));
        }
        // steady: 2 errors out of 5 -> 0.4, exactly at the threshold
        for i in 0..5 {
            records.push(record("steady", Some(i < 2), "answer"));
        }

        let outcome = filter.filter(Consolidator::new().consolidate(records));
        assert!(outcome.kept.contains_key("steady"));
        assert!(!outcome.kept.contains_key("flaky"));
        assert_eq!(outcome.excluded.len(), 1);

        let excluded = &outcome.excluded[0];
        assert_eq!(excluded.model, "flaky");
        assert_eq!(excluded.error_responses, 3);
        assert_eq!(excluded.error_rate, Some(0.6));
        assert_eq!(excluded.reason, ExclusionReason::ErrorRateAboveThreshold);
        assert_eq!(outcome.excluded_records["flaky"].len(), 5);
    }

    #[test]
    fn test_filter_excludes_model_without_records() {
        let predicate = default_predicate();
        let config = RankingConfig::default();
        let filter = ReliabilityFilter::new(&config, &predicate);

        let mut consolidated = ConsolidatedRecords::default();
        consolidated.by_model.insert("ghost".to_string(), Vec::new());

        let outcome = filter.filter(consolidated);
        assert!(outcome.kept.is_empty());
        assert_eq!(outcome.excluded[0].reason, ExclusionReason::NoResponses);
        assert_eq!(outcome.excluded[0].error_rate, None);
    }

    #[test]
    fn test_error_rate_uses_predicate_when_unflagged() {
        let predicate = default_predicate();
        let config = RankingConfig::default();
        let filter = ReliabilityFilter::new(&config, &predicate);

        let records = vec![
            record("m", None, "Paris"),
            record("m", None, "Exception: traceback follows"),
            record("m", None, ""),
            record("m", None, "Rome"),
        ];
        assert_eq!(filter.error_rate(&records), (2, Some(0.5)));
    }
}
