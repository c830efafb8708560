use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{NaiveDateTime, NaiveTime, SubsecRound};
use flate2::read::GzDecoder;
use log::{error, info};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("cannot open input {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("invalid value '{value}' in column '{column}'")]
    InvalidValue { column: String, value: String },
}

/// A row that could not be parsed.  `line` is the 1-based line in the file,
/// the header being line 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

/// The rows parsed from one input file, plus the ones that were skipped.
#[derive(Debug)]
pub struct InputBatch<T> {
    pub rows: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> InputBatch<T> {
    pub fn new() -> Self {
        InputBatch {
            rows: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Record a parse failure and log it, the row is not loaded.
    pub(crate) fn reject(&mut self, line: u64, reason: String) {
        error!("Skipping malformed row at line {}: {}", line, reason);
        self.rejected.push(RejectedRow { line, reason });
    }

    pub(crate) fn log_summary(&self, what: &str) {
        info!(
            "read {} {} rows, rejected {}",
            self.rows.len(),
            what,
            self.rejected.len()
        );
    }
}

impl<T> Default for InputBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Open a CSV file for reading.  Files ending in `.gz` are decompressed on the fly.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read>, InputError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

pub(crate) fn csv_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(rdr)
}

/// Fail if any of the `required` columns is absent from the header row.
pub(crate) fn check_headers(
    headers: &csv::StringRecord,
    required: &[String],
) -> Result<(), InputError> {
    for name in required {
        if !headers.iter().any(|h| h == name) {
            return Err(InputError::MissingColumn(name.clone()));
        }
    }
    Ok(())
}

/// Line number of a csv error, falling back to `fallback` when the error
/// carries no position.
pub(crate) fn error_line(err: &csv::Error, fallback: u64) -> u64 {
    match err.position() {
        Some(pos) => pos.line(),
        None => fallback,
    }
}

/// Parse an optional float.  Empty cells are `None`.
pub(crate) fn parse_optional_f64(column: &str, value: &str) -> Result<Option<f64>, InputError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| InputError::InvalidValue {
            column: column.to_string(),
            value: value.to_string(),
        })
}

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Both databases keep fractional seconds down to the microsecond.
pub const SUBSEC_DIGITS: u16 = 6;

/// Parse a measurement timestamp, either ISO-like or the raw station format
/// `05/22/2015 03:00:00 PM`.  Digits past the microsecond are dropped.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|ts| ts.trunc_subsecs(SUBSEC_DIGITS))
}

/// Parse a time of day, `HH:MM:SS[.f]`, truncated to the microsecond.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .ok()
        .map(|t| t.trunc_subsecs(SUBSEC_DIGITS))
}

pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s)))
}

pub(crate) fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_time(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", s)))
}
