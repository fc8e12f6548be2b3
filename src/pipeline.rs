use crate::aggregate::Aggregator;
use crate::composite::CompositeScorer;
use crate::config::RankingConfig;
use crate::consolidate::Consolidator;
use crate::insights::{InsightAnalyzer, Insights};
use crate::models::{
    Category, CompositeScore, ExcludedModel, ModelAggregate, NormalizedMetricTable,
    OverallRankingEntry, RankingTable, ResponseRecord,
};
use crate::normalize::Normalizer;
use crate::ranking::RankingGenerator;
use crate::reliability::{ErrorPatternPredicate, InvalidityPredicate, ReliabilityFilter};
use serde::Serialize;
use tracing::{info, warn};

/// Everything one analysis produces
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankingReport {
    /// Run identifiers seen in the input
    pub runs: Vec<String>,
    pub metric_rankings: Vec<RankingTable>,
    pub category_rankings: Vec<RankingTable>,
    pub overall_ranking: Vec<OverallRankingEntry>,
    pub normalized: NormalizedMetricTable,
    pub composites: Vec<CompositeScore>,
    pub aggregates: Vec<ModelAggregate>,
    pub excluded: Vec<ExcludedModel>,
    pub insights: Insights,
}

impl RankingReport {
    #[cfg(test)]
    pub fn metric_ranking(&self, name: &str) -> Option<&RankingTable> {
        self.metric_rankings.iter().find(|t| t.name == name)
    }

    pub fn category_ranking(&self, category: Category) -> Option<&RankingTable> {
        self.category_rankings
            .iter()
            .find(|t| t.name == category.label())
    }

    #[cfg(test)]
    pub fn aggregate(&self, model: &str) -> Option<&ModelAggregate> {
        self.aggregates.iter().find(|a| a.model == model)
    }

    pub fn is_empty(&self) -> bool {
        self.overall_ranking.is_empty()
    }
}

/// Runs consolidation through insights over one record set
pub struct RankingPipeline {
    config: RankingConfig,
    predicate: Box<dyn InvalidityPredicate>,
}

impl RankingPipeline {
    pub fn new(config: RankingConfig) -> Self {
        let predicate = Box::new(ErrorPatternPredicate::new(&config.invalid_patterns));
        Self::with_predicate(config, predicate)
    }

    /// Pipeline with a custom prediction-based error detection
    pub fn with_predicate(config: RankingConfig, predicate: Box<dyn InvalidityPredicate>) -> Self {
        Self { config, predicate }
    }

    pub fn run(&self, records: Vec<ResponseRecord>) -> RankingReport {
        let predicate = self.predicate.as_ref();

        let consolidated = Consolidator::new().consolidate(records);
        if consolidated.is_empty() {
            warn!("No records to rank");
        }
        let runs: Vec<String> = consolidated.runs().into_iter().map(String::from).collect();
        info!(
            models = consolidated.model_count(),
            records = consolidated.total_records(),
            runs = runs.len(),
            "Consolidated records"
        );

        let outcome = ReliabilityFilter::new(&self.config, predicate).filter(consolidated);
        info!(
            kept = outcome.kept.len(),
            excluded = outcome.excluded.len(),
            "Applied reliability filter"
        );

        let aggregates = Aggregator::new(predicate).aggregate_all(&outcome.kept);
        let normalized = Normalizer::new().normalize(&aggregates);
        info!(
            models = normalized.rows.len(),
            metrics = normalized.metrics.len(),
            "Normalized metrics"
        );

        let composites = CompositeScorer::new(&self.config).score_all(&normalized, &aggregates);

        let generator = RankingGenerator::new();
        let metric_rankings = generator.metric_rankings(&normalized);
        let category_rankings = generator.category_rankings(&composites);
        let overall_ranking = generator.overall_ranking(&composites);
        info!(
            tables = metric_rankings.len() + category_rankings.len() + 1,
            "Generated rankings"
        );

        let insights =
            InsightAnalyzer::new(&self.config).analyze(&normalized, &composites, &overall_ranking);

        RankingReport {
            runs,
            metric_rankings,
            category_rankings,
            overall_ranking,
            normalized,
            composites,
            aggregates,
            excluded: outcome.excluded,
            insights,
        }
    }
}
