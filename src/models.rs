use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Metric family used for category scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Text-similarity metrics
    Academic,
    /// Validity, length and consistency metrics
    Operational,
    /// Multiple-choice benchmark accuracies
    Benchmark,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Academic, Category::Operational, Category::Benchmark];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Academic => "Academic Score",
            Category::Operational => "Operational Score",
            Category::Benchmark => "Benchmark Score",
        }
    }
}

/// Identity of one raw or normalized metric column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Bleu,
    Rouge1,
    Rouge2,
    RougeL,
    BertScore,
    ValidResponses,
    ValidityRate,
    MeanLength,
    MeanWords,
    LengthConsistency,
    /// Accuracy on the named benchmark
    Benchmark(String),
}

impl Metric {
    /// Per-response similarity scores carried by the records
    pub const SIMILARITY: [Metric; 5] = [
        Metric::Bleu,
        Metric::Rouge1,
        Metric::Rouge2,
        Metric::RougeL,
        Metric::BertScore,
    ];

    /// Metrics derived from response counts and lengths, always computable
    pub const OPERATIONAL: [Metric; 5] = [
        Metric::ValidResponses,
        Metric::ValidityRate,
        Metric::MeanLength,
        Metric::MeanWords,
        Metric::LengthConsistency,
    ];

    pub fn label(&self) -> String {
        match self {
            Metric::Bleu => "BLEU".to_string(),
            Metric::Rouge1 => "ROUGE-1".to_string(),
            Metric::Rouge2 => "ROUGE-2".to_string(),
            Metric::RougeL => "ROUGE-L".to_string(),
            Metric::BertScore => "BERTScore".to_string(),
            Metric::ValidResponses => "Valid Responses".to_string(),
            Metric::ValidityRate => "Validity Rate".to_string(),
            Metric::MeanLength => "Mean Length".to_string(),
            Metric::MeanWords => "Mean Words".to_string(),
            Metric::LengthConsistency => "Length Consistency".to_string(),
            Metric::Benchmark(id) => format!("{} Accuracy", id.to_uppercase()),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Metric::Bleu | Metric::Rouge1 | Metric::Rouge2 | Metric::RougeL | Metric::BertScore => {
                Category::Academic
            }
            Metric::ValidResponses
            | Metric::ValidityRate
            | Metric::MeanLength
            | Metric::MeanWords
            | Metric::LengthConsistency => Category::Operational,
            Metric::Benchmark(_) => Category::Benchmark,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// Serialized by label so metric-keyed maps stay valid JSON objects
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

/// Any scalar a run file may hold in a numeric or boolean column
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<LenientValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(LenientValue::Number(n)) => Some(n),
        Some(LenientValue::Text(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(lenient_f64(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64))
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<LenientValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(LenientValue::Bool(b)) => Some(b),
        Some(LenientValue::Number(n)) if n.is_finite() => Some(n != 0.0),
        Some(LenientValue::Text(text)) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<LenientValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(LenientValue::Text(text)) => text,
        Some(LenientValue::Number(n)) => n.to_string(),
        Some(LenientValue::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Some(lenient_string(deserializer)?).filter(|s| !s.trim().is_empty()))
}

/// One collected model response with its already-computed metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub model: String,
    /// Run the record was collected in
    #[serde(default, alias = "execucao", deserialize_with = "lenient_opt_string")]
    pub run: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prompt: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reference: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prediction: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_error: Option<bool>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub response_length: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub word_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bleu_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rouge1_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rouge2_score: Option<f64>,
    #[serde(default, rename = "rougeL_score", deserialize_with = "lenient_f64")]
    pub rouge_l_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub bertscore_f1: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub benchmark: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub question_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub benchmark_correct: Option<bool>,
}

impl ResponseRecord {
    /// Similarity score for `metric`, absent when missing or non-finite
    pub fn metric(&self, metric: &Metric) -> Option<f64> {
        let value = match metric {
            Metric::Bleu => self.bleu_score,
            Metric::Rouge1 => self.rouge1_score,
            Metric::Rouge2 => self.rouge2_score,
            Metric::RougeL => self.rouge_l_score,
            Metric::BertScore => self.bertscore_f1,
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// Response length in characters
    pub fn length(&self) -> u64 {
        self.response_length
            .unwrap_or_else(|| self.prediction.chars().count() as u64)
    }

    /// Response length in whitespace-separated words
    pub fn words(&self) -> u64 {
        self.word_count
            .unwrap_or_else(|| self.prediction.split_whitespace().count() as u64)
    }
}

/// Mean and sample standard deviation of one series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl MetricStats {
    /// Statistics over the finite values; all zero when none are left
    ///
    /// Running (Welford) updates keep the mean of a constant series exactly
    /// equal to that constant, whatever the series length.
    pub fn from_values(values: &[f64]) -> Self {
        let mut count = 0usize;
        let mut mean = 0.0;
        let mut m2 = 0.0;

        for value in values.iter().copied().filter(|v| v.is_finite()) {
            count += 1;
            let delta = value - mean;
            mean += delta / count as f64;
            m2 += delta * (value - mean);
        }

        if count == 0 {
            return Self::default();
        }

        let std = if count < 2 {
            0.0
        } else {
            (m2 / (count - 1) as f64).max(0.0).sqrt()
        };

        Self { mean, std, count }
    }
}

/// Accuracy on one multiple-choice benchmark
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkAccuracy {
    pub benchmark: String,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub accuracy: f64,
    /// Accuracy per subject, for records that name one
    pub subjects: BTreeMap<String, f64>,
}

/// Overall health of a model judged by its validity rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ValidityStatus {
    pub fn from_rate(rate: f64) -> Self {
        if rate > 0.9 {
            ValidityStatus::Excellent
        } else if rate > 0.7 {
            ValidityStatus::Good
        } else if rate > 0.5 {
            ValidityStatus::Fair
        } else {
            ValidityStatus::Poor
        }
    }
}

/// How stable response lengths are, from the coefficient of variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyRating {
    High,
    Moderate,
    Low,
}

impl ConsistencyRating {
    pub fn from_cv(cv_percent: f64) -> Self {
        if cv_percent < 20.0 {
            ConsistencyRating::High
        } else if cv_percent < 40.0 {
            ConsistencyRating::Moderate
        } else {
            ConsistencyRating::Low
        }
    }
}

/// Per-model statistics over the consolidated runs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelAggregate {
    pub model: String,
    pub runs: Vec<String>,
    pub total_responses: usize,
    pub valid_responses: usize,
    pub validity_rate: f64,
    /// Similarity metrics observed in at least one valid response
    pub metrics: BTreeMap<Metric, MetricStats>,
    pub length: MetricStats,
    pub words: MetricStats,
    /// Coefficient of variation of response length, in percent
    pub length_cv: Option<f64>,
    pub benchmarks: BTreeMap<String, BenchmarkAccuracy>,
}

impl ModelAggregate {
    /// `max(0, 100 - CV%)`, zero when the CV is undefined
    pub fn length_consistency(&self) -> f64 {
        match self.length_cv {
            Some(cv) => (100.0 - cv).max(0.0),
            None => 0.0,
        }
    }

    /// Raw (pre-normalization) value of one metric column
    pub fn raw_value(&self, metric: &Metric) -> Option<f64> {
        if self.valid_responses == 0 {
            return Some(0.0);
        }

        match metric {
            Metric::Bleu | Metric::Rouge1 | Metric::Rouge2 | Metric::RougeL | Metric::BertScore => {
                self.metrics.get(metric).map(|s| s.mean)
            }
            Metric::ValidResponses => Some(self.valid_responses as f64),
            Metric::ValidityRate => Some(self.validity_rate),
            Metric::MeanLength => Some(self.length.mean),
            Metric::MeanWords => Some(self.words.mean),
            Metric::LengthConsistency => Some(self.length_consistency()),
            Metric::Benchmark(id) => self.benchmarks.get(id).map(|b| b.accuracy),
        }
    }

    pub fn validity_status(&self) -> ValidityStatus {
        ValidityStatus::from_rate(self.validity_rate)
    }

    pub fn consistency_rating(&self) -> Option<ConsistencyRating> {
        self.length_cv.map(ConsistencyRating::from_cv)
    }
}

/// Why a model was left out of the primary aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    NoResponses,
    ErrorRateAboveThreshold,
}

/// A model filtered out by reliability, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedModel {
    pub model: String,
    pub total_responses: usize,
    pub error_responses: usize,
    pub error_rate: Option<f64>,
    pub reason: ExclusionReason,
}

/// Normalized values for one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub model: String,
    pub values: BTreeMap<Metric, f64>,
}

/// Model × metric matrix with every value in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedMetricTable {
    pub metrics: Vec<Metric>,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedMetricTable {
    pub fn has_metric(&self, metric: &Metric) -> bool {
        self.metrics.contains(metric)
    }

    pub fn get(&self, model: &str, metric: &Metric) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| row.model == model)
            .and_then(|row| row.values.get(metric).copied())
    }

    /// (model, value) pairs of one column in row order
    pub fn column(&self, metric: &Metric) -> Vec<(&str, f64)> {
        self.rows
            .iter()
            .filter_map(|row| row.values.get(metric).map(|v| (row.model.as_str(), *v)))
            .collect()
    }

    pub fn metrics_in(&self, category: Category) -> Vec<&Metric> {
        self.metrics
            .iter()
            .filter(|m| m.category() == category)
            .collect()
    }
}

/// Category means; `None` when the category has no metric columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryScores {
    pub academic: Option<f64>,
    pub operational: Option<f64>,
    pub benchmark: Option<f64>,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> Option<f64> {
        match category {
            Category::Academic => self.academic,
            Category::Operational => self.operational,
            Category::Benchmark => self.benchmark,
        }
    }

    pub fn set(&mut self, category: Category, score: Option<f64>) {
        match category {
            Category::Academic => self.academic = score,
            Category::Operational => self.operational = score,
            Category::Benchmark => self.benchmark = score,
        }
    }
}

/// Combined scores and penalties for one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub model: String,
    pub valid_responses: usize,
    pub category_scores: CategoryScores,
    /// Mean of every categorised normalized metric
    pub mean_score: f64,
    /// Fixed weight table over individual normalized metrics
    pub weighted_score: f64,
    /// Score the penalties are applied to
    pub base_score: f64,
    pub reliability_factor: f64,
    pub sample_penalty: f64,
    /// `reliability_factor * sample_penalty`
    pub penalty_factor: f64,
    pub final_score: f64,
}

/// One row of a ranking table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub model: String,
    pub score: f64,
    pub rank: usize,
}

/// Models ordered by one metric or category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingTable {
    pub name: String,
    pub entries: Vec<RankingEntry>,
}

impl RankingTable {
    pub fn leader(&self) -> Option<&RankingEntry> {
        self.entries.first()
    }

    #[cfg(test)]
    pub fn rank_of(&self, model: &str) -> Option<usize> {
        self.entries.iter().find(|e| e.model == model).map(|e| e.rank)
    }
}

/// Overall ranking row with the penalty actually applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallRankingEntry {
    pub model: String,
    pub score: f64,
    pub rank: usize,
    pub base_score: f64,
    pub penalty_factor: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_json_with_malformed_values() {
        let json = r#"{
            "model": "llama",
            "prediction": "Paris is the capital",
            "reference": "Paris",
            "is_error": "False",
            "bleu_score": "not a number",
            "rouge1_score": "0.5",
            "rougeL_score": 0.25,
            "bertscore_f1": {"nested": true},
            "response_length": null,
            "benchmark_correct": 1
        }"#;

        let record: ResponseRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.model, "llama");
        assert_eq!(record.is_error, Some(false));
        assert_eq!(record.bleu_score, None);
        assert_eq!(record.rouge1_score, Some(0.5));
        assert_eq!(record.rouge_l_score, Some(0.25));
        assert_eq!(record.bertscore_f1, None);
        assert_eq!(record.response_length, None);
        assert_eq!(record.benchmark_correct, Some(true));
        assert!(record.run.is_none());
        assert!(record.prompt.is_empty());
    }

    #[test]
    fn test_record_null_prediction_is_empty() {
        let record: ResponseRecord =
            serde_json::from_str(r#"{"model": "m", "prediction": null}"#).unwrap();
        assert_eq!(record.prediction, "");
        assert_eq!(record.length(), 0);
        assert_eq!(record.words(), 0);
    }

    #[test]
    fn test_record_metric_drops_non_finite() {
        let record = ResponseRecord {
            bleu_score: Some(f64::NAN),
            rouge2_score: Some(f64::INFINITY),
            bertscore_f1: Some(0.8),
            ..ResponseRecord::default()
        };
        assert_eq!(record.metric(&Metric::Bleu), None);
        assert_eq!(record.metric(&Metric::Rouge2), None);
        assert_eq!(record.metric(&Metric::BertScore), Some(0.8));
        assert_eq!(record.metric(&Metric::ValidityRate), None);
    }

    #[test]
    fn test_record_derived_length_and_words() {
        let record = ResponseRecord {
            prediction: "três palavras aqui".to_string(),
            ..ResponseRecord::default()
        };
        assert_eq!(record.length(), 18);
        assert_eq!(record.words(), 3);

        let explicit = ResponseRecord {
            prediction: "ignored".to_string(),
            response_length: Some(120),
            word_count: Some(20),
            ..ResponseRecord::default()
        };
        assert_eq!(explicit.length(), 120);
        assert_eq!(explicit.words(), 20);
    }

    #[test]
    fn test_metric_stats() {
        let stats = MetricStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        // sample std: sqrt(32 / 7)
        assert!((stats.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_metric_stats_constant_series_is_exact() {
        for n in [1, 3, 4, 7, 10, 20, 33] {
            let stats = MetricStats::from_values(&vec![0.1; n]);
            assert_eq!(stats.mean, 0.1, "mean drifted for {n} values");
            assert_eq!(stats.std, 0.0);
            assert_eq!(stats.count, n);
        }
        assert_eq!(
            MetricStats::from_values(&[0.1; 3]).mean,
            MetricStats::from_values(&[0.1; 10]).mean
        );
    }

    #[test]
    fn test_metric_stats_degenerate() {
        assert_eq!(MetricStats::from_values(&[]), MetricStats::default());

        let single = MetricStats::from_values(&[0.7, f64::NAN]);
        assert_eq!(single.count, 1);
        assert_eq!(single.mean, 0.7);
        assert_eq!(single.std, 0.0);
    }

    #[test]
    fn test_metric_labels_and_categories() {
        assert_eq!(Metric::RougeL.label(), "ROUGE-L");
        assert_eq!(Metric::Benchmark("mmlu".into()).label(), "MMLU Accuracy");
        assert_eq!(Metric::BertScore.category(), Category::Academic);
        assert_eq!(Metric::LengthConsistency.category(), Category::Operational);
        assert_eq!(
            Metric::Benchmark("hellaswag".into()).category(),
            Category::Benchmark
        );
        assert_eq!(
            serde_json::to_string(&Metric::ValidityRate).unwrap(),
            "\"Validity Rate\""
        );
    }

    #[test]
    fn test_raw_value_zero_valid_defaults_to_zero() {
        let aggregate = ModelAggregate {
            model: "broken".to_string(),
            total_responses: 4,
            ..ModelAggregate::default()
        };
        assert_eq!(aggregate.raw_value(&Metric::Bleu), Some(0.0));
        assert_eq!(aggregate.raw_value(&Metric::ValidityRate), Some(0.0));
        assert_eq!(aggregate.raw_value(&Metric::Benchmark("mmlu".into())), Some(0.0));
    }

    #[test]
    fn test_raw_value_absent_metric() {
        let aggregate = ModelAggregate {
            model: "m".to_string(),
            total_responses: 2,
            valid_responses: 2,
            validity_rate: 1.0,
            length_cv: Some(25.0),
            ..ModelAggregate::default()
        };
        assert_eq!(aggregate.raw_value(&Metric::Bleu), None);
        assert_eq!(aggregate.raw_value(&Metric::ValidResponses), Some(2.0));
        assert_eq!(aggregate.raw_value(&Metric::LengthConsistency), Some(75.0));
        assert_eq!(aggregate.consistency_rating(), Some(ConsistencyRating::Moderate));
    }

    #[test]
    fn test_length_consistency_floor() {
        let aggregate = ModelAggregate {
            length_cv: Some(140.0),
            ..ModelAggregate::default()
        };
        assert_eq!(aggregate.length_consistency(), 0.0);
        assert_eq!(aggregate.consistency_rating(), Some(ConsistencyRating::Low));
    }

    #[test]
    fn test_validity_status_thresholds() {
        assert_eq!(ValidityStatus::from_rate(0.95), ValidityStatus::Excellent);
        assert_eq!(ValidityStatus::from_rate(0.9), ValidityStatus::Good);
        assert_eq!(ValidityStatus::from_rate(0.6), ValidityStatus::Fair);
        assert_eq!(ValidityStatus::from_rate(0.5), ValidityStatus::Poor);
    }

    #[test]
    fn test_normalized_table_lookup() {
        let mut values = BTreeMap::new();
        values.insert(Metric::Bleu, 0.5);
        let table = NormalizedMetricTable {
            metrics: vec![Metric::Bleu],
            rows: vec![NormalizedRow {
                model: "a".to_string(),
                values,
            }],
        };

        assert_eq!(table.get("a", &Metric::Bleu), Some(0.5));
        assert_eq!(table.get("b", &Metric::Bleu), None);
        assert_eq!(table.column(&Metric::Bleu), vec![("a", 0.5)]);
        assert_eq!(table.metrics_in(Category::Academic).len(), 1);
        assert!(table.metrics_in(Category::Operational).is_empty());

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["rows"][0]["values"]["BLEU"], 0.5);
    }
}
