use crate::config::Config;
use crate::loader::load_runs;
use crate::pipeline::{RankingPipeline, RankingReport};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main runner that loads the run files and ranks the models in them
pub struct Runner {
    config: Config,
    extra_runs: Vec<PathBuf>,
}

impl Runner {
    /// Create a new runner with the given configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            extra_runs: Vec::new(),
        }
    }

    /// Rank these run files in addition to the configured ones
    pub fn with_runs(mut self, runs: Vec<PathBuf>) -> Self {
        self.extra_runs.extend(runs);
        self
    }

    /// Load every run, rank the models and store the report if configured
    pub fn run(&self) -> Result<RankingReport> {
        self.config
            .ranking
            .validate()
            .context("Invalid ranking config")?;

        let run_files = self.existing_run_files();
        if run_files.is_empty() {
            bail!("No run files to rank: configure `runs` or pass --run");
        }

        let records = load_runs(&run_files)?;
        info!(files = run_files.len(), records = records.len(), "Loaded all runs");

        let pipeline = RankingPipeline::new(self.config.ranking.clone());
        let report = pipeline.run(records);

        self.store_results_if_configured(&report)?;
        Ok(report)
    }

    /// Configured and extra run files that exist; missing ones are skipped
    fn existing_run_files(&self) -> Vec<PathBuf> {
        self.config
            .runs
            .iter()
            .chain(&self.extra_runs)
            .filter(|path| {
                let exists = path.exists();
                if !exists {
                    warn!(path = %path.display(), "Run file not found, skipping");
                }
                exists
            })
            .cloned()
            .collect()
    }

    /// Store results if storage path is configured
    fn store_results_if_configured(&self, report: &RankingReport) -> Result<()> {
        if let Some(storage_path) = &self.config.storage_path {
            self.store_results(report, storage_path)?;
        }
        Ok(())
    }

    /// Store results to a JSON file
    fn store_results(&self, report: &RankingReport, path: &str) -> Result<()> {
        let json_content = self.serialize_results(report)?;
        self.ensure_directory_exists(path)?;
        self.write_results_file(path, &json_content)?;
        info!(path, "Results stored");

        Ok(())
    }

    /// Serialize results to JSON
    fn serialize_results(&self, report: &RankingReport) -> Result<String> {
        serde_json::to_string_pretty(report).context("Failed to serialize results to JSON")
    }

    /// Ensure the directory for the results file exists
    fn ensure_directory_exists(&self, path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }

    /// Write results to file
    fn write_results_file(&self, path: &str, content: &str) -> Result<()> {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write results to: {}", path))
    }
}
