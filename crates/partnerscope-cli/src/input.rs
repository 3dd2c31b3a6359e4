use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use partnerscope_core::RawRecord;
use rayon::prelude::*;
use serde_json::{Map, Value};

/// Load every file in parallel and concatenate rows in argument order.
pub fn load_raw_records(paths: &[PathBuf]) -> Result<Vec<RawRecord>> {
    let per_file: Vec<Vec<RawRecord>> = paths
        .par_iter()
        .map(|path| load_file(path))
        .collect::<Result<_>>()?;

    let rows: Vec<RawRecord> = per_file.into_iter().flatten().collect();
    tracing::debug!(files = paths.len(), rows = rows.len(), "loaded input rows");
    Ok(rows)
}

pub fn load_file(path: &Path) -> Result<Vec<RawRecord>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => load_csv(path),
        Some("json") => load_json(path),
        _ => bail!(
            "unsupported input file {} (expected .csv or .json)",
            path.display()
        ),
    }
}

fn load_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read header row of {}", path.display()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("{}: malformed row {}", path.display(), line + 2))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows.push(RawRecord::from_pairs(
            headers
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| (header.clone(), Value::String(cell.to_string()))),
        ));
    }
    Ok(rows)
}

fn load_json(path: &Path) -> Result<Vec<RawRecord>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let rows: Vec<Map<String, Value>> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of objects", path.display()))?;
    Ok(rows.into_iter().map(RawRecord::from).collect())
}
