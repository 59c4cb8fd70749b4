//! Result persistence
//!
//! Writes one CSV of per-sample records and one JSON of aggregate metrics
//! per run, under timestamped filenames so repeated runs never clobber
//! each other.

use crate::harness::{BenchmarkRecord, BenchmarkRun};
use crate::metrics::BenchmarkMetrics;
use chrono::Utc;
use maillens_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Files produced by one export.
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub records_csv: PathBuf,
    pub metrics_json: PathBuf,
}

/// Export a run's records and metrics into `dir`, creating it if needed.
pub fn export_run(dir: impl AsRef<Path>, run: &BenchmarkRun) -> Result<ExportPaths> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let records_csv = dir.join(format!("benchmark_results_{timestamp}.csv"));
    let metrics_json = dir.join(format!("benchmark_metrics_{timestamp}.json"));

    write_records_csv(&records_csv, &run.records)?;
    write_metrics_json(&metrics_json, &run.metrics)?;

    info!(
        records = %records_csv.display(),
        metrics = %metrics_json.display(),
        "Benchmark results exported"
    );
    Ok(ExportPaths {
        records_csv,
        metrics_json,
    })
}

/// One CSV row per record, headers from the record's field names.
pub fn write_records_csv(path: &Path, records: &[BenchmarkRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| Error::csv(format!("Failed to open {}: {e}", path.display())))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| Error::csv(format!("Failed to write record: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| Error::csv(format!("Failed to flush {}: {e}", path.display())))?;
    Ok(())
}

/// Pretty-printed metrics JSON.
pub fn write_metrics_json(path: &Path, metrics: &BenchmarkMetrics) -> Result<()> {
    let json = serde_json::to_string_pretty(metrics)?;
    std::fs::write(path, json)?;
    Ok(())
}
