use std::collections::HashMap;
use std::io::Read;

use crate::dimension::{Dimension, Statistic, Stats};
use crate::input::{check_headers, csv_reader, error_line, parse_optional_f64, InputBatch, InputError};

/// Summary statistics of one source file from one station, a row of the
/// `aggregated_data` table.  Keyed by `(station_name, file_name)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub station_name: String,
    pub file_name: String,
    /// Indexed by [`Dimension::index`].
    pub stats: [Stats; 14],
}

impl AggregateRecord {
    pub fn new(station_name: impl Into<String>, file_name: impl Into<String>) -> AggregateRecord {
        AggregateRecord {
            station_name: station_name.into(),
            file_name: file_name.into(),
            stats: [Stats::default(); 14],
        }
    }

    pub fn stats(&self, dimension: Dimension) -> &Stats {
        &self.stats[dimension.index()]
    }

    pub fn stats_mut(&mut self, dimension: Dimension) -> &mut Stats {
        &mut self.stats[dimension.index()]
    }

    /// The 56 statistic values in column order: min, max, mean, std for each dimension.
    pub fn values(&self) -> Vec<Option<f64>> {
        Dimension::ALL
            .iter()
            .flat_map(|dim| {
                let stats = self.stats(*dim);
                Statistic::ALL.map(|s| stats.get(s))
            })
            .collect()
    }
}

const STATION_COLUMN: &str = "data_source";
const FILE_COLUMN: &str = "file_name";

/// Column name of a statistic in the aggregation output, e.g. "Air Temperature_min".
pub fn stat_label(dimension: Dimension, statistic: Statistic) -> String {
    format!("{}_{}", dimension.label(), statistic.suffix())
}

fn required_columns() -> Vec<String> {
    let mut columns = vec![STATION_COLUMN.to_string(), FILE_COLUMN.to_string()];
    for dim in Dimension::ALL {
        for stat in Statistic::ALL {
            columns.push(stat_label(dim, stat));
        }
    }
    columns
}

fn field<'a>(record: &'a csv::StringRecord, index: &HashMap<String, usize>, name: &str) -> &'a str {
    index.get(name).and_then(|&i| record.get(i)).unwrap_or("")
}

fn parse_record(
    record: &csv::StringRecord,
    index: &HashMap<String, usize>,
) -> Result<AggregateRecord, InputError> {
    let get = |name: &str| field(record, index, name);

    let station_name = get(STATION_COLUMN);
    if station_name.is_empty() {
        return Err(InputError::InvalidValue {
            column: STATION_COLUMN.to_string(),
            value: String::new(),
        });
    }
    let mut row = AggregateRecord::new(station_name, get(FILE_COLUMN));
    for dim in Dimension::ALL {
        for stat in Statistic::ALL {
            let column = stat_label(dim, stat);
            let value = parse_optional_f64(&column, get(&column))?;
            row.stats_mut(dim).set(stat, value);
        }
    }
    Ok(row)
}

/// Read the per-file aggregates CSV.  Rows that don't parse are logged and
/// returned in `rejected`; a missing column fails the whole file.
pub fn read_aggregates<R: Read>(rdr: R) -> Result<InputBatch<AggregateRecord>, InputError> {
    let mut rdr = csv_reader(rdr);
    let headers = rdr.headers()?.clone();
    check_headers(&headers, &required_columns())?;
    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();

    let mut batch = InputBatch::new();
    for (i, record) in rdr.records().enumerate() {
        let fallback = i as u64 + 2;
        match record {
            Ok(record) => {
                let line = record.position().map(|p| p.line()).unwrap_or(fallback);
                match parse_record(&record, &index) {
                    Ok(row) => batch.rows.push(row),
                    Err(e) => batch.reject(line, e.to_string()),
                }
            }
            Err(e) => {
                let line = error_line(&e, fallback);
                batch.reject(line, e.to_string());
            }
        }
    }
    batch.log_summary("aggregate");
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::*;

    fn line(station: &str, file: &str, value: &str) -> String {
        let mut values = vec![station.to_string(), file.to_string()];
        for _ in 0..56 {
            values.push(value.to_string());
        }
        values.join(",")
    }

    #[test]
    fn read_file() -> Result<(), Box<dyn Error>> {
        let data = [
            required_columns().join(","),
            line("Oak Street Weather Station", "oak_2016.csv", "3.25"),
            line("Foster Weather Station", "foster_2016.csv", ""),
        ]
        .iter()
        .join("\n");
        let batch = read_aggregates(data.as_bytes())?;
        assert_eq!(batch.rows.len(), 2);
        let oak = &batch.rows[0];
        assert_eq!(oak.file_name, "oak_2016.csv");
        assert_eq!(oak.stats(Dimension::SolarRadiation).std, Some(3.25));
        assert_eq!(oak.values().len(), 56);
        let foster = &batch.rows[1];
        assert!(foster.values().iter().all(|v| v.is_none()));
        Ok(())
    }

    #[test]
    fn columns_may_come_in_any_order() -> Result<(), Box<dyn Error>> {
        let mut columns = required_columns();
        columns.swap(0, 1);
        let mut values = vec!["f.csv".to_string(), "Station".to_string()];
        values.extend((0..56).map(|i| i.to_string()));
        let data = format!("{}\n{}\n", columns.join(","), values.join(","));
        let batch = read_aggregates(data.as_bytes())?;
        let row = &batch.rows[0];
        assert_eq!(row.station_name, "Station");
        assert_eq!(row.file_name, "f.csv");
        assert_eq!(row.stats(Dimension::AirTemperature).min, Some(0.0));
        assert_eq!(row.stats(Dimension::BatteryLife).std, Some(55.0));
        Ok(())
    }

    #[test]
    fn malformed_value_rejects_row() -> Result<(), Box<dyn Error>> {
        let data = [
            required_columns().join(","),
            line("A", "a.csv", "1"),
            line("B", "b.csv", "n/a"),
            line("", "c.csv", "1"),
        ]
        .iter()
        .join("\n");
        let batch = read_aggregates(data.as_bytes())?;
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(
            batch.rejected.iter().map(|r| r.line).collect::<Vec<_>>(),
            vec![3, 4]
        );
        Ok(())
    }

    #[test]
    fn missing_column() {
        let data = "data_source,file_name\nA,a.csv\n";
        let res = read_aggregates(data.as_bytes());
        assert!(matches!(res, Err(InputError::MissingColumn(c)) if c == "Air Temperature_min"));
    }
}
