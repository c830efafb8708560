use itertools::Itertools;
use lazy_static::lazy_static;

use crate::dimension::{Dimension, Statistic};

pub const MEASUREMENT_TABLE: &str = "preprocessed_data";
pub const AGGREGATE_TABLE: &str = "aggregated_data";

/// SQL flavour of a backend.  The two only differ in column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    DuckDb,
}

impl Dialect {
    /// Postgres `FLOAT` is 8 bytes, DuckDB's is 4.
    fn float_type(&self) -> &'static str {
        match self {
            Dialect::Postgres => "FLOAT",
            Dialect::DuckDb => "DOUBLE",
        }
    }

    fn created_at_type(&self) -> &'static str {
        match self {
            Dialect::Postgres => "TIMESTAMP",
            Dialect::DuckDb => "TIMESTAMPTZ",
        }
    }
}

pub fn create_measurement_table(dialect: Dialect) -> String {
    let sensors = Dimension::ALL
        .iter()
        .map(|dim| format!("    {} {},", dim.column(), dialect.float_type()))
        .join("\n");
    format!(
        r#"CREATE TABLE IF NOT EXISTS preprocessed_data (
    measurement_id VARCHAR(255) PRIMARY KEY,
    station_name VARCHAR(255) NOT NULL,
    measurement_timestamp TIMESTAMP NOT NULL,
    date DATE NOT NULL,
    time TIME NOT NULL,
{}
    created_at {} DEFAULT CURRENT_TIMESTAMP
);"#,
        sensors,
        dialect.created_at_type()
    )
}

pub fn create_aggregate_table(dialect: Dialect) -> String {
    let stats = aggregate_stat_columns()
        .iter()
        .map(|column| format!("    {} {},", column, dialect.float_type()))
        .join("\n");
    format!(
        r#"CREATE TABLE IF NOT EXISTS aggregated_data (
    station_name VARCHAR(255) NOT NULL,
    file_name VARCHAR(255),
{}
    PRIMARY KEY (station_name, file_name)
);"#,
        stats
    )
}

pub const CREATE_MEASUREMENT_STATION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_preprocessed_station_name ON preprocessed_data (station_name);";

pub const CREATE_MEASUREMENT_TIME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_preprocessed_timestamp ON preprocessed_data (date, time);";

pub const CREATE_AGGREGATE_STATION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_agg_station_name ON aggregated_data (station_name);";

pub const CREATE_AGGREGATE_FILE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_agg_file_name ON aggregated_data (file_name);";

/// All the DDL statements, in execution order.  Every statement is idempotent.
pub fn schema_statements(dialect: Dialect) -> Vec<String> {
    vec![
        create_measurement_table(dialect),
        CREATE_MEASUREMENT_STATION_INDEX.to_string(),
        CREATE_MEASUREMENT_TIME_INDEX.to_string(),
        create_aggregate_table(dialect),
        CREATE_AGGREGATE_STATION_INDEX.to_string(),
        CREATE_AGGREGATE_FILE_INDEX.to_string(),
    ]
}

/// `air_temperature_min, air_temperature_max, ..., battery_life_std`
pub fn aggregate_stat_columns() -> Vec<String> {
    Dimension::ALL
        .iter()
        .flat_map(|dim| {
            Statistic::ALL
                .into_iter()
                .map(move |stat| format!("{}_{}", dim.column(), stat.suffix()))
        })
        .collect()
}

/// Fetch one measurement by id.  DuckDB returns the temporal columns as text.
pub fn select_measurement(dialect: Dialect) -> String {
    let temporal = match dialect {
        Dialect::Postgres => r#"measurement_timestamp, "date", "time""#,
        Dialect::DuckDb => {
            r#"CAST(measurement_timestamp AS VARCHAR), CAST("date" AS VARCHAR), CAST("time" AS VARCHAR)"#
        }
    };
    let sensors = Dimension::ALL.iter().map(|dim| dim.column()).join(", ");
    format!(
        "SELECT measurement_id, station_name, {}, {} FROM preprocessed_data WHERE measurement_id = $1;",
        temporal, sensors
    )
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("${}", i)).join(", ")
}

lazy_static! {
    /// Single-row insert into `preprocessed_data`, 19 positional parameters.
    pub static ref INSERT_MEASUREMENT: String = {
        let mut columns = vec![
            "measurement_id".to_string(),
            "station_name".to_string(),
            "measurement_timestamp".to_string(),
            "date".to_string(),
            "time".to_string(),
        ];
        columns.extend(Dimension::ALL.iter().map(|dim| dim.column().to_string()));
        format!(
            "INSERT INTO preprocessed_data ({}) VALUES ({}) ON CONFLICT (measurement_id) DO NOTHING;",
            columns.join(", "),
            placeholders(columns.len())
        )
    };

    /// Single-row insert into `aggregated_data`, 58 positional parameters.
    pub static ref INSERT_AGGREGATE: String = {
        let mut columns = vec!["station_name".to_string(), "file_name".to_string()];
        columns.extend(aggregate_stat_columns());
        format!(
            "INSERT INTO aggregated_data ({}) VALUES ({}) ON CONFLICT (station_name, file_name) DO NOTHING;",
            columns.join(", "),
            placeholders(columns.len())
        )
    };

    pub static ref SELECT_AGGREGATE: String = format!(
        "SELECT station_name, file_name, {} FROM aggregated_data WHERE station_name = $1 AND file_name = $2;",
        aggregate_stat_columns().join(", ")
    );
}
