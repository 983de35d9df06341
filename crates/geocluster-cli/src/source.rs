//! Trip record loading
//!
//! Reads taxi trip CSV files and keeps the pickup location of each trip as
//! the point to cluster. Rows that cannot be parsed either abort the load or
//! are skipped and counted, depending on [`InvalidRecordPolicy`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDateTime, Timelike};
use geocluster_core::{BoundingBox, Point};
use tracing::{debug, info, warn};

use crate::config::{InputConfig, InvalidRecordPolicy};
use crate::error::{Error, Result};

/// One taxi trip
#[derive(Debug, Clone, PartialEq)]
pub struct TripRecord {
    pub pickup_time: Option<NaiveDateTime>,
    pub pickup: Point,
    pub dropoff: Option<Point>,
    pub trip_distance: Option<f64>,
}

/// Result of loading one source
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<TripRecord>,
    /// Malformed rows dropped under the skip policy
    pub skipped: usize,
    /// Valid rows outside the pickup hour window or region
    pub filtered_out: usize,
    /// Bounds of the kept pickup locations
    pub bounds: Option<BoundingBox>,
}

impl LoadReport {
    /// Pickup locations, in file order
    pub fn points(&self) -> Vec<Point> {
        self.records.iter().map(|r| r.pickup).collect()
    }
}

/// Load trip records from a CSV file
pub fn load_trip_records(path: &Path, config: &InputConfig) -> Result<LoadReport> {
    let file = File::open(path).map_err(|e| Error::file(path, e))?;
    read_trip_records(file, &path.display().to_string(), config)
}

/// Load trip records from any reader; `source_name` labels errors and logs
pub fn read_trip_records<R: Read>(
    reader: R,
    source_name: &str,
    config: &InputConfig,
) -> Result<LoadReport> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(config.has_headers)
        .delimiter(config.delimiter_byte()?)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut report = LoadReport::default();

    for row in csv_reader.records() {
        let parsed = match row {
            Ok(row) => {
                let line = row.position().map(|p| p.line()).unwrap_or(0);
                parse_record(&row, config).map_err(|message| {
                    Error::invalid_record(source_name, line, message)
                })
            }
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or(0);
                Err(Error::invalid_record(source_name, line, err.to_string()))
            }
        };

        let record = match (parsed, config.on_invalid) {
            (Ok(record), _) => record,
            (Err(err), InvalidRecordPolicy::Fail) => return Err(err),
            (Err(err), InvalidRecordPolicy::Skip) => {
                debug!(error = %err, "Skipping record");
                report.skipped += 1;
                continue;
            }
        };

        if let Some(window) = &config.hour_window {
            let in_window = record
                .pickup_time
                .map(|t| window.contains(t.hour()))
                .unwrap_or(false);
            if !in_window {
                report.filtered_out += 1;
                continue;
            }
        }

        if let Some(region) = &config.region {
            if !region.contains(&record.pickup) {
                report.filtered_out += 1;
                continue;
            }
        }

        match report.bounds.as_mut() {
            Some(bounds) => bounds.extend(&record.pickup),
            None => {
                report.bounds = Some(BoundingBox {
                    min: record.pickup,
                    max: record.pickup,
                })
            }
        }
        report.records.push(record);
    }

    if report.skipped > 0 {
        warn!(
            source = source_name,
            skipped = report.skipped,
            "Skipped malformed trip records"
        );
    }
    info!(
        source = source_name,
        records = report.records.len(),
        skipped = report.skipped,
        filtered_out = report.filtered_out,
        "Loaded trip records"
    );

    Ok(report)
}

fn parse_record(row: &csv::StringRecord, config: &InputConfig) -> std::result::Result<TripRecord, String> {
    let pickup = Point::new(
        required_f64(row, config.pickup_lon_column, "pickup longitude")?,
        required_f64(row, config.pickup_lat_column, "pickup latitude")?,
    );

    let dropoff = match (
        optional_f64(row, config.dropoff_lon_column),
        optional_f64(row, config.dropoff_lat_column),
    ) {
        (Some(x), Some(y)) => Some(Point::new(x, y)),
        _ => None,
    };

    let pickup_time = row
        .get(config.pickup_time_column)
        .and_then(|s| NaiveDateTime::parse_from_str(s, &config.time_format).ok());

    if config.hour_window.is_some() && pickup_time.is_none() {
        return Err(format!(
            "pickup time in column {} does not match '{}'",
            config.pickup_time_column, config.time_format
        ));
    }

    Ok(TripRecord {
        pickup_time,
        pickup,
        dropoff,
        trip_distance: optional_f64(row, config.trip_distance_column),
    })
}

fn required_f64(row: &csv::StringRecord, column: usize, what: &str) -> std::result::Result<f64, String> {
    let raw = row
        .get(column)
        .ok_or_else(|| format!("missing {} (column {})", what, column))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{} '{}' is not a number", what, raw))?;
    if !value.is_finite() {
        return Err(format!("{} '{}' is not finite", what, raw));
    }
    Ok(value)
}

fn optional_f64(row: &csv::StringRecord, column: usize) -> Option<f64> {
    row.get(column)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HourWindow;

    const HEADER: &str = "vendor_name,Trip_Pickup_DateTime_unused,x,y,Trip_Pickup_DateTime,Trip_Dropoff_DateTime,Passenger_Count,Trip_Distance,Start_Lon,Start_Lat,Rate_Code,store_and_forward,End_Lon,End_Lat";

    fn row(time: &str, lon: &str, lat: &str) -> String {
        format!(
            "VTS,,,,{},2009-01-15 10:10:00,1,2.5,{},{},,,-73.95,40.78",
            time, lon, lat
        )
    }

    fn csv_text(rows: &[String]) -> String {
        let mut text = HEADER.to_string();
        for r in rows {
            text.push('\n');
            text.push_str(r);
        }
        text
    }

    #[test]
    fn test_reads_pickup_points() {
        let text = csv_text(&[
            row("2009-01-15 09:05:00", "-73.9851", "40.7589"),
            row("2009-01-15 09:07:00", "-73.9772", "40.7527"),
        ]);
        let report = read_trip_records(text.as_bytes(), "trips.csv", &InputConfig::default()).unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(
            report.points(),
            vec![Point::new(-73.9851, 40.7589), Point::new(-73.9772, 40.7527)]
        );
        let first = &report.records[0];
        assert_eq!(first.dropoff, Some(Point::new(-73.95, 40.78)));
        assert_eq!(first.trip_distance, Some(2.5));
        assert_eq!(first.pickup_time.map(|t| t.hour()), Some(9));

        let bounds = report.bounds.unwrap();
        assert_eq!(bounds.min, Point::new(-73.9851, 40.7527));
        assert_eq!(bounds.max, Point::new(-73.9772, 40.7589));
    }

    #[test]
    fn test_fail_policy_reports_line() {
        let text = csv_text(&[
            row("2009-01-15 09:05:00", "-73.9851", "40.7589"),
            row("2009-01-15 09:07:00", "abc", "40.7527"),
        ]);
        let err = read_trip_records(text.as_bytes(), "trips.csv", &InputConfig::default()).unwrap_err();

        match err {
            Error::InvalidRecord { source_name, line, message } => {
                assert_eq!(source_name, "trips.csv");
                assert_eq!(line, 3);
                assert!(message.contains("pickup longitude"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_skip_policy_counts() {
        let text = csv_text(&[
            row("2009-01-15 09:05:00", "-73.9851", "40.7589"),
            row("2009-01-15 09:07:00", "", "40.7527"),
            "VTS,short".to_string(),
            row("2009-01-15 09:09:00", "-73.9911", "NaN"),
        ]);
        let config = InputConfig {
            on_invalid: InvalidRecordPolicy::Skip,
            ..Default::default()
        };
        let report = read_trip_records(text.as_bytes(), "trips.csv", &config).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped, 3);
    }

    #[test]
    fn test_hour_window_filter() {
        let text = csv_text(&[
            row("2009-01-15 08:59:59", "-73.98", "40.75"),
            row("2009-01-15 09:00:00", "-73.97", "40.75"),
            row("2009-01-15 20:59:00", "-73.96", "40.75"),
            row("2009-01-15 21:00:00", "-73.95", "40.75"),
        ]);
        let config = InputConfig {
            hour_window: Some(HourWindow { from_hour: 9, to_hour: 21 }),
            ..Default::default()
        };
        let report = read_trip_records(text.as_bytes(), "trips.csv", &config).unwrap();

        assert_eq!(report.points(), vec![Point::new(-73.97, 40.75), Point::new(-73.96, 40.75)]);
        assert_eq!(report.filtered_out, 2);
    }

    #[test]
    fn test_region_filter() {
        let text = csv_text(&[
            row("2009-01-15 09:00:00", "-73.9851", "40.7589"),
            row("2009-01-15 09:01:00", "-73.7781", "40.6413"),
            row("2009-01-15 09:02:00", "-74.0", "40.8"),
            row("2009-01-15 09:03:00", "-73.92", "40.75"),
        ]);
        let config = InputConfig {
            region: Some(BoundingBox {
                min: Point::new(-74.0, 40.7),
                max: Point::new(-73.93, 40.8),
            }),
            ..Default::default()
        };
        let report = read_trip_records(text.as_bytes(), "trips.csv", &config).unwrap();

        // Corners count as inside
        assert_eq!(
            report.points(),
            vec![Point::new(-73.9851, 40.7589), Point::new(-74.0, 40.8)]
        );
        assert_eq!(report.filtered_out, 2);
        assert_eq!(report.bounds.unwrap().max, Point::new(-73.9851, 40.8));
    }

    #[test]
    fn test_rejects_non_ascii_delimiter() {
        let config = InputConfig {
            delimiter: 'ü',
            ..Default::default()
        };
        let err = read_trip_records(HEADER.as_bytes(), "trips.csv", &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_custom_layout_without_headers() {
        let config = InputConfig {
            has_headers: false,
            delimiter: ';',
            pickup_lon_column: 0,
            pickup_lat_column: 1,
            ..Default::default()
        };
        let report = read_trip_records("1.5;2.5\n3.0;4.0\n".as_bytes(), "inline", &config).unwrap();

        assert_eq!(report.points(), vec![Point::new(1.5, 2.5), Point::new(3.0, 4.0)]);
        assert_eq!(report.records[0].dropoff, None);
        assert_eq!(report.records[0].pickup_time, None);
    }

    #[test]
    fn test_empty_file() {
        let report = read_trip_records(HEADER.as_bytes(), "empty.csv", &InputConfig::default()).unwrap();
        assert!(report.records.is_empty());
        assert!(report.bounds.is_none());
    }
}
