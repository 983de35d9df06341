//! Configuration for the geocluster command
//!
//! Precedence: command-line flags, then the TOML file given with `--config`,
//! then the defaults below.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use geocluster_core::{BoundingBox, ClusterParams};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// DBSCAN parameters
    pub clustering: ClusterParams,
    /// Trip record source
    pub input: InputConfig,
    /// Report sink
    pub output: OutputConfig,
    /// Run limits
    pub run: RunConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.clustering.validate()?;
        self.input.validate()
    }
}

/// What to do with a record that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRecordPolicy {
    /// Abort the whole load
    #[default]
    Fail,
    /// Drop the record and count it
    Skip,
}

/// Pickup hour filter, `[from_hour, to_hour)`; wraps past midnight when
/// `from_hour > to_hour`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub from_hour: u32,
    pub to_hour: u32,
}

impl HourWindow {
    pub fn validate(&self) -> Result<()> {
        if self.from_hour > 23 || self.to_hour > 24 {
            return Err(Error::config(format!(
                "hour window {}..{} is out of range (0..24)",
                self.from_hour, self.to_hour
            )));
        }
        if self.from_hour == self.to_hour {
            return Err(Error::config("hour window is empty"));
        }
        Ok(())
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.from_hour < self.to_hour {
            hour >= self.from_hour && hour < self.to_hour
        } else {
            hour >= self.from_hour || hour < self.to_hour
        }
    }
}

/// Trip record CSV layout (zero-based column indices)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// First row is a header
    pub has_headers: bool,
    /// Field delimiter
    pub delimiter: char,
    pub pickup_time_column: usize,
    pub trip_distance_column: usize,
    pub pickup_lon_column: usize,
    pub pickup_lat_column: usize,
    pub dropoff_lon_column: usize,
    pub dropoff_lat_column: usize,
    /// chrono format of the pickup timestamp
    pub time_format: String,
    /// Malformed record handling
    pub on_invalid: InvalidRecordPolicy,
    /// Only keep pickups inside this hour window
    pub hour_window: Option<HourWindow>,
    /// Only keep pickups inside this region (edges included)
    pub region: Option<BoundingBox>,
}

impl Default for InputConfig {
    fn default() -> Self {
        // Column layout of the 2009 NYC yellow cab trip files
        Self {
            has_headers: true,
            delimiter: ',',
            pickup_time_column: 4,
            trip_distance_column: 7,
            pickup_lon_column: 8,
            pickup_lat_column: 9,
            dropoff_lon_column: 12,
            dropoff_lat_column: 13,
            time_format: "%Y-%m-%d %H:%M:%S".to_string(),
            on_invalid: InvalidRecordPolicy::Fail,
            hour_window: None,
            region: None,
        }
    }
}

impl InputConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(window) = &self.hour_window {
            window.validate()?;
        }
        if let Some(region) = &self.region {
            validate_region(region)?;
        }
        self.delimiter_byte()?;
        Ok(())
    }

    /// The delimiter as the single byte the CSV reader expects
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            return Err(Error::config(format!(
                "delimiter must be an ASCII character, got '{}'",
                self.delimiter
            )));
        }
        Ok(self.delimiter as u8)
    }
}

fn validate_region(region: &BoundingBox) -> Result<()> {
    let corners = [region.min, region.max];
    if !corners.iter().all(|p| p.is_finite()) {
        return Err(Error::config("region corners must be finite"));
    }
    if region.width() < 0.0 || region.height() < 0.0 {
        return Err(Error::config(format!(
            "region SW corner ({}, {}) is not south-west of NE corner ({}, {})",
            region.min.x, region.min.y, region.max.x, region.max.y
        )));
    }
    Ok(())
}

/// Parse `min_lon,min_lat,max_lon,max_lat` into a region
pub fn parse_region(text: &str) -> Result<BoundingBox> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()
        .map_err(|e| Error::config(format!("region '{}': {}", text, e)))?;

    match values.as_slice() {
        &[min_x, min_y, max_x, max_y] => {
            let region = BoundingBox {
                min: (min_x, min_y).into(),
                max: (max_x, max_y).into(),
            };
            validate_region(&region)?;
            Ok(region)
        }
        _ => Err(Error::config(format!(
            "region '{}' must be min_lon,min_lat,max_lon,max_lat",
            text
        ))),
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

/// Report sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report path; with several inputs, the directory of this path receives
    /// one `<input stem>.clusters.<ext>` file per input
    pub path: PathBuf,
    pub format: ReportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("clusters.csv"),
            format: ReportFormat::Csv,
        }
    }
}

impl OutputConfig {
    /// Report path for `input`, one of `total` inputs
    pub fn path_for(&self, input: &Path, total: usize) -> PathBuf {
        if total <= 1 {
            return self.path.clone();
        }
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        dir.join(format!("{}.clusters.{}", stem, self.format.extension()))
    }

    /// Report path for every input, in input order
    ///
    /// Inputs sharing a file stem are told apart by their parent directory
    /// name (`jan/trips.csv` becomes `jan_trips.clusters.csv`). Two inputs
    /// that still map to the same report are rejected.
    pub fn report_paths(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let total = inputs.len();
        let plain: Vec<PathBuf> = inputs.iter().map(|i| self.path_for(i, total)).collect();

        let mut counts: HashMap<&Path, usize> = HashMap::new();
        for path in &plain {
            *counts.entry(path.as_path()).or_default() += 1;
        }

        let mut paths = Vec::with_capacity(total);
        for (input, path) in inputs.iter().zip(&plain) {
            if counts[path.as_path()] == 1 {
                paths.push(path.clone());
                continue;
            }
            let parent = input
                .parent()
                .and_then(Path::file_name)
                .map(|s| s.to_string_lossy().into_owned());
            let qualified = match (parent, path.file_name()) {
                (Some(parent), Some(name)) => {
                    path.with_file_name(format!("{}_{}", parent, name.to_string_lossy()))
                }
                _ => path.clone(),
            };
            paths.push(qualified);
        }

        let mut seen = HashSet::new();
        for (input, path) in inputs.iter().zip(&paths) {
            if !seen.insert(path) {
                return Err(Error::config(format!(
                    "report for '{}' would overwrite {}",
                    input.display(),
                    path.display()
                )));
            }
        }
        Ok(paths)
    }
}

/// Run limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Cancel clustering after this many seconds
    pub timeout_secs: Option<u64>,
    /// Show a progress bar on stderr
    pub progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            progress: true,
        }
    }
}
