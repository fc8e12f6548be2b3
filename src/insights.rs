use crate::config::{ModelGroup, RankingConfig};
use crate::models::{CompositeScore, Metric, NormalizedMetricTable, OverallRankingEntry};
use serde::Serialize;
use tracing::debug;

/// Pearson correlation coefficient of two equally long series
///
/// Undefined for fewer than two points, mismatched lengths or a series
/// without variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }

    let r = covariance / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    StrongPositive,
    Moderate,
    Weak,
}

impl CorrelationStrength {
    pub fn classify(coefficient: f64) -> Self {
        if coefficient > 0.7 {
            CorrelationStrength::StrongPositive
        } else if coefficient > 0.3 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            CorrelationStrength::StrongPositive => "academic and operational scores agree strongly",
            CorrelationStrength::Moderate => "academic and operational scores are moderately related",
            CorrelationStrength::Weak => "academic and operational scores are largely independent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryCorrelation {
    pub coefficient: f64,
    pub strength: CorrelationStrength,
}

/// Model with the highest normalized value of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standout {
    pub title: String,
    pub metric: Metric,
    pub model: String,
    pub value: f64,
}

/// Mean final score of the ranked models matching one configured group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupScore {
    pub group: String,
    pub members: Vec<String>,
    pub mean_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    pub correlation: Option<CategoryCorrelation>,
    pub standouts: Vec<Standout>,
    pub recommended: Option<String>,
    /// Empty unless at least two groups have members
    pub groups: Vec<GroupScore>,
}

const STANDOUTS: [(&str, Metric); 4] = [
    ("Most consistent", Metric::LengthConsistency),
    ("Highest fidelity", Metric::BertScore),
    ("Most reliable", Metric::ValidityRate),
    ("Most detailed", Metric::MeanLength),
];

/// Read-only observations over the scored candidate set
pub struct InsightAnalyzer<'a> {
    groups: &'a [ModelGroup],
}

impl<'a> InsightAnalyzer<'a> {
    pub fn new(config: &'a RankingConfig) -> Self {
        Self {
            groups: &config.groups,
        }
    }

    /// Academic vs operational agreement across models reporting both
    pub fn correlation(&self, composites: &[CompositeScore]) -> Option<CategoryCorrelation> {
        let (academic, operational): (Vec<f64>, Vec<f64>) = composites
            .iter()
            .filter_map(|c| {
                Some((c.category_scores.academic?, c.category_scores.operational?))
            })
            .unzip();

        let coefficient = pearson(&academic, &operational)?;
        Some(CategoryCorrelation {
            coefficient,
            strength: CorrelationStrength::classify(coefficient),
        })
    }

    pub fn standouts(&self, table: &NormalizedMetricTable) -> Vec<Standout> {
        STANDOUTS
            .iter()
            .filter(|(_, metric)| table.has_metric(metric))
            .filter_map(|(title, metric)| {
                let (model, value) = table.column(metric).into_iter().max_by(|a, b| {
                    // on equal values the lexicographically first model wins
                    a.1.total_cmp(&b.1).then_with(|| b.0.cmp(a.0))
                })?;
                Some(Standout {
                    title: title.to_string(),
                    metric: metric.clone(),
                    model: model.to_string(),
                    value,
                })
            })
            .collect()
    }

    pub fn group_comparison(&self, composites: &[CompositeScore]) -> Vec<GroupScore> {
        let scores: Vec<GroupScore> = self
            .groups
            .iter()
            .filter_map(|group| {
                let patterns: Vec<String> =
                    group.patterns.iter().map(|p| p.to_lowercase()).collect();
                let members: Vec<&CompositeScore> = composites
                    .iter()
                    .filter(|c| {
                        let id = c.model.to_lowercase();
                        patterns.iter().any(|p| id.contains(p.as_str()))
                    })
                    .collect();
                if members.is_empty() {
                    return None;
                }

                let mean_score =
                    members.iter().map(|c| c.final_score).sum::<f64>() / members.len() as f64;
                Some(GroupScore {
                    group: group.name.clone(),
                    members: members.iter().map(|c| c.model.clone()).collect(),
                    mean_score,
                })
            })
            .collect();

        if scores.len() < 2 { Vec::new() } else { scores }
    }

    pub fn analyze(
        &self,
        table: &NormalizedMetricTable,
        composites: &[CompositeScore],
        overall: &[OverallRankingEntry],
    ) -> Insights {
        let insights = Insights {
            correlation: self.correlation(composites),
            standouts: self.standouts(table),
            recommended: overall.first().map(|e| e.model.clone()),
            groups: self.group_comparison(composites),
        };

        if let Some(correlation) = &insights.correlation {
            debug!(
                coefficient = correlation.coefficient,
                "Correlation: {}",
                correlation.strength.describe()
            );
        }
        insights
    }
}
