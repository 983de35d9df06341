//! Cluster report writers

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geocluster_core::{ClusterOutcome, ClusterParams, ClusterSummary, ClusteringStats};
use serde::Serialize;
use tracing::info;

use crate::config::ReportFormat;
use crate::error::{Error, Result};

/// CSV header row
pub const CSV_HEADER: [&str; 3] = ["Average Longitude", "Average Latitude", "Number of Points"];

/// JSON report document
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub source: &'a str,
    pub params: &'a ClusterParams,
    pub stats: &'a ClusteringStats,
    pub clusters: &'a [ClusterSummary],
}

/// Write one CSV row per summary, in the given order
pub fn write_csv<W: Write>(writer: W, summaries: &[ClusterSummary]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for summary in summaries {
        csv_writer.write_record([
            summary.centroid.x.to_string(),
            summary.centroid.y.to_string(),
            summary.size.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the summaries and run statistics as pretty JSON
pub fn write_json<W: Write>(
    mut writer: W,
    outcome: &ClusterOutcome,
    params: &ClusterParams,
) -> Result<()> {
    let report = JsonReport {
        source: &outcome.name,
        params,
        stats: &outcome.stats,
        clusters: &outcome.summaries,
    };
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the report for one run to `path`
pub fn write_report(
    path: &Path,
    format: ReportFormat,
    outcome: &ClusterOutcome,
    params: &ClusterParams,
) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| Error::file(dir, e))?;
    }
    let file = File::create(path).map_err(|e| Error::file(path, e))?;
    let writer = BufWriter::new(file);

    match format {
        ReportFormat::Csv => write_csv(writer, &outcome.summaries)?,
        ReportFormat::Json => write_json(writer, outcome, params)?,
    }

    info!(
        path = %path.display(),
        format = format.extension(),
        rows = outcome.summaries.len(),
        "Wrote cluster report"
    );
    Ok(())
}
