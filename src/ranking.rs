use crate::models::{
    Category, CompositeScore, NormalizedMetricTable, OverallRankingEntry, RankingEntry,
    RankingTable,
};
use std::cmp::Ordering;

/// Non-finite scores rank as 0.0
fn sanitize(score: f64) -> f64 {
    if score.is_finite() { score } else { 0.0 }
}

/// Score descending, then model identifier ascending
fn by_score_then_model(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Rank (model, score) pairs; ranks are 1-based positions
pub fn rank_scores<S: Into<String>>(name: &str, scores: Vec<(S, f64)>) -> RankingTable {
    let mut scores: Vec<(String, f64)> = scores
        .into_iter()
        .map(|(model, score)| (model.into(), sanitize(score)))
        .collect();
    scores.sort_by(|a, b| by_score_then_model((a.0.as_str(), a.1), (b.0.as_str(), b.1)));

    RankingTable {
        name: name.to_string(),
        entries: scores
            .into_iter()
            .enumerate()
            .map(|(i, (model, score))| RankingEntry {
                model,
                score,
                rank: i + 1,
            })
            .collect(),
    }
}

/// Produces per-metric, per-category and overall rankings
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingGenerator;

impl RankingGenerator {
    pub fn new() -> Self {
        Self
    }

    /// One table per normalized metric column
    pub fn metric_rankings(&self, table: &NormalizedMetricTable) -> Vec<RankingTable> {
        table
            .metrics
            .iter()
            .map(|metric| rank_scores(&metric.label(), table.column(metric)))
            .collect()
    }

    /// One table per category that has at least one metric column
    pub fn category_rankings(&self, composites: &[CompositeScore]) -> Vec<RankingTable> {
        Category::ALL
            .into_iter()
            .filter_map(|category| {
                let scores: Vec<(&str, f64)> = composites
                    .iter()
                    .filter_map(|c| {
                        c.category_scores
                            .get(category)
                            .map(|score| (c.model.as_str(), score))
                    })
                    .collect();
                if scores.is_empty() {
                    None
                } else {
                    Some(rank_scores(category.label(), scores))
                }
            })
            .collect()
    }

    /// Ranking over the penalized final score
    ///
    /// Models without valid responses sort after every other model.
    pub fn overall_ranking(&self, composites: &[CompositeScore]) -> Vec<OverallRankingEntry> {
        let mut ordered: Vec<&CompositeScore> = composites.iter().collect();
        ordered.sort_by(|a, b| {
            let a_dead = a.valid_responses == 0;
            let b_dead = b.valid_responses == 0;
            a_dead.cmp(&b_dead).then_with(|| {
                by_score_then_model(
                    (a.model.as_str(), sanitize(a.final_score)),
                    (b.model.as_str(), sanitize(b.final_score)),
                )
            })
        });

        ordered
            .into_iter()
            .enumerate()
            .map(|(i, c)| OverallRankingEntry {
                model: c.model.clone(),
                score: sanitize(c.final_score),
                rank: i + 1,
                base_score: sanitize(c.base_score),
                penalty_factor: c.penalty_factor,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryScores;
    use proptest::prelude::*;

    fn composite(
        model: &str,
        valid: usize,
        final_score: f64,
        academic: Option<f64>,
    ) -> CompositeScore {
        CompositeScore {
            model: model.to_string(),
            valid_responses: valid,
            category_scores: CategoryScores {
                academic,
                operational: Some(0.5),
                benchmark: None,
            },
            mean_score: final_score,
            weighted_score: final_score,
            base_score: final_score,
            reliability_factor: 1.0,
            sample_penalty: 1.0,
            penalty_factor: 1.0,
            final_score,
        }
    }

    #[test]
    fn test_rank_scores_descending() {
        let table = rank_scores("BLEU", vec![("a", 0.2), ("b", 0.9), ("c", 0.5)]);
        let order: Vec<(&str, usize)> = table
            .entries
            .iter()
            .map(|e| (e.model.as_str(), e.rank))
            .collect();
        assert_eq!(order, vec![("b", 1), ("c", 2), ("a", 3)]);
        assert_eq!(table.leader().unwrap().model, "b");
        assert_eq!(table.rank_of("a"), Some(3));
    }

    #[test]
    fn test_ties_break_by_model_identifier() {
        let forward = rank_scores("x", vec![("zeta", 1.0), ("alpha", 1.0), ("mid", 0.5)]);
        let backward = rank_scores("x", vec![("mid", 0.5), ("alpha", 1.0), ("zeta", 1.0)]);
        assert_eq!(forward, backward);
        assert_eq!(forward.entries[0].model, "alpha");
        assert_eq!(forward.entries[1].model, "zeta");
        assert_eq!(forward.entries[1].rank, 2);
    }

    #[test]
    fn test_non_finite_scores_rank_as_zero() {
        let table = rank_scores("x", vec![("nan", f64::NAN), ("low", 0.1)]);
        assert_eq!(table.entries[0].model, "low");
        assert_eq!(table.entries[1].score, 0.0);
    }

    #[test]
    fn test_category_rankings_skip_empty_categories() {
        let composites = vec![
            composite("a", 10, 0.5, Some(0.9)),
            composite("b", 10, 0.7, Some(0.1)),
        ];
        let tables = RankingGenerator::new().category_rankings(&composites);
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Academic Score", "Operational Score"]);
        assert_eq!(tables[0].leader().unwrap().model, "a");
    }

    #[test]
    fn test_overall_ranking_puts_zero_valid_last() {
        let composites = vec![
            composite("aaa-dead", 0, 0.0, Some(0.0)),
            composite("zzz-weak", 12, 0.0, Some(0.0)),
            composite("mid", 12, 0.4, Some(0.2)),
        ];
        let ranking = RankingGenerator::new().overall_ranking(&composites);
        let order: Vec<&str> = ranking.iter().map(|e| e.model.as_str()).collect();
        assert_eq!(order, vec!["mid", "zzz-weak", "aaa-dead"]);
        assert_eq!(ranking[2].rank, 3);
        assert_eq!(ranking[0].penalty_factor, 1.0);
    }

    proptest! {
        #[test]
        fn prop_ranks_are_contiguous(scores in prop::collection::vec(0.0f64..1.0, 0..30)) {
            let pairs: Vec<(String, f64)> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| (format!("model-{i:02}"), *s))
                .collect();
            let table = rank_scores("prop", pairs);

            for (i, entry) in table.entries.iter().enumerate() {
                prop_assert_eq!(entry.rank, i + 1);
            }
            for pair in table.entries.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score > pair[1].score {
                    prop_assert!(pair[0].rank < pair[1].rank);
                }
            }
        }
    }
}
