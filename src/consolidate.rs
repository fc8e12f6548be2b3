use crate::models::ResponseRecord;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Records from every run grouped by model, models in identifier order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidatedRecords {
    pub by_model: BTreeMap<String, Vec<ResponseRecord>>,
}

impl ConsolidatedRecords {
    pub fn is_empty(&self) -> bool {
        self.by_model.is_empty()
    }

    pub fn model_count(&self) -> usize {
        self.by_model.len()
    }

    pub fn total_records(&self) -> usize {
        self.by_model.values().map(Vec::len).sum()
    }

    /// Distinct run identifiers across all models
    pub fn runs(&self) -> BTreeSet<&str> {
        self.by_model
            .values()
            .flatten()
            .filter_map(|r| r.run.as_deref())
            .collect()
    }
}

/// Groups raw per-response records by model identity
#[derive(Debug, Clone, Copy, Default)]
pub struct Consolidator;

impl Consolidator {
    pub fn new() -> Self {
        Self
    }

    /// Group records by model, keeping each model's records in input order
    pub fn consolidate<I>(&self, records: I) -> ConsolidatedRecords
    where
        I: IntoIterator<Item = ResponseRecord>,
    {
        let mut by_model: BTreeMap<String, Vec<ResponseRecord>> = BTreeMap::new();

        for record in records {
            by_model.entry(record.model.clone()).or_default().push(record);
        }

        for (model, records) in &by_model {
            debug!(model = %model, records = records.len(), "Consolidated model records");
        }

        ConsolidatedRecords { by_model }
    }
}
