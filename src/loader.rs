use crate::models::ResponseRecord;
use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::{debug, info};

/// Load the per-response records of one run file (`.json` or `.csv`)
///
/// Records without a run identifier get the file stem, so records from
/// different files stay distinguishable after consolidation.
pub fn load_run(path: &Path) -> Result<Vec<ResponseRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let mut records = match extension.as_deref() {
        Some("json") => load_json(path)?,
        Some("csv") => load_csv(path)?,
        _ => bail!("Unsupported run file format: {}", path.display()),
    };

    let run_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    for record in &mut records {
        if record.run.is_none() {
            record.run = Some(run_name.clone());
        }
    }

    info!(path = %path.display(), records = records.len(), "Loaded run file");
    Ok(records)
}

/// Load and concatenate several run files in order
pub fn load_runs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ResponseRecord>> {
    let mut all_records = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let records =
            load_run(path).with_context(|| format!("Failed to load run: {}", path.display()))?;
        all_records.extend(records);
    }
    Ok(all_records)
}

fn load_json(path: &Path) -> Result<Vec<ResponseRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON records: {}", path.display()))
}

fn load_csv(path: &Path) -> Result<Vec<ResponseRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?;

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<ResponseRecord>().enumerate() {
        let record = row.with_context(|| {
            format!("Failed to parse CSV row {} in {}", index + 2, path.display())
        })?;
        records.push(record);
    }
    debug!(path = %path.display(), rows = records.len(), "Parsed CSV rows");

    Ok(records)
}
