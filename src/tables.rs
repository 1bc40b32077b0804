//! CSV table loading
//!
//! Reads the tracking and cycle tables from CSV. Columns are matched by
//! header name; extra columns are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::cycle::validate_cycle;
use crate::error::ComputeError;
use crate::types::{CycleRecord, TrackingEvent};

/// File name of the tracking table inside a data directory
pub const TRACKING_FILE: &str = "tracking.csv";

/// File name of the cycle table inside a data directory
pub const CYCLES_FILE: &str = "cycles.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a calendar day, dropping any time-of-day component
pub fn parse_date(raw: &str) -> Result<NaiveDate, ComputeError> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.date())
        .ok_or_else(|| ComputeError::DateParse(format!("Unrecognized date '{}'", trimmed)))
}

/// Serde adapter for date columns
pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

fn read_records<T, R>(reader: R) -> Result<Vec<T>, ComputeError>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

/// Read tracking events from any CSV source
pub fn read_tracking<R: Read>(reader: R) -> Result<Vec<TrackingEvent>, ComputeError> {
    let events: Vec<TrackingEvent> = read_records(reader)?;
    debug!("Read {} tracking events", events.len());
    Ok(events)
}

/// Read cycle records from any CSV source, validating each cycle
pub fn read_cycles<R: Read>(reader: R) -> Result<Vec<CycleRecord>, ComputeError> {
    let cycles: Vec<CycleRecord> = read_records(reader)?;
    for cycle in &cycles {
        validate_cycle(cycle)?;
    }
    debug!("Read {} cycles", cycles.len());
    Ok(cycles)
}

/// Load the tracking table from a file
pub fn load_tracking(path: &Path) -> Result<Vec<TrackingEvent>, ComputeError> {
    info!("Loading tracking table from {}", path.display());
    read_tracking(File::open(path)?)
}

/// Load the cycle table from a file
pub fn load_cycles(path: &Path) -> Result<Vec<CycleRecord>, ComputeError> {
    info!("Loading cycle table from {}", path.display());
    read_cycles(File::open(path)?)
}
