pub mod duckdb_store;
pub mod postgres_store;
pub mod schema;

use std::fmt;

use postgres::error::SqlState;
use thiserror::Error;

use crate::aggregate::AggregateRecord;
use crate::config::DbTarget;
use crate::measurement::Measurement;
use schema::Dialect;

pub use duckdb_store::DuckStore;
pub use postgres_store::PgStore;

/// Error raised by the database driver.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error(transparent)]
    Postgres(#[from] postgres::Error),
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),
    #[error("{0}")]
    Message(String),
}

impl BackendError {
    /// True if the error is a primary key / unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            BackendError::Postgres(e) => e.code() == Some(&SqlState::UNIQUE_VIOLATION),
            BackendError::DuckDb(e) => e.to_string().contains("Duplicate key"),
            BackendError::Message(m) => m.contains("Duplicate key"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Measurements,
    Aggregates,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Measurements => schema::MEASUREMENT_TABLE,
            Table::Aggregates => schema::AGGREGATE_TABLE,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A live connection to one of the supported databases.
///
/// Inserts return the number of rows written, so `0` means the row was
/// dropped by the `ON CONFLICT ... DO NOTHING` clause.
pub trait Store {
    fn dialect(&self) -> Dialect;

    /// Short description for log lines, never contains the password.
    fn describe(&self) -> String;

    /// Run one statement without parameters, used for DDL.
    fn execute(&mut self, sql: &str) -> Result<(), BackendError>;

    /// Start the batch transaction.
    fn begin(&mut self) -> Result<(), BackendError>;

    /// Insert one row.  A failing row must leave the batch usable for the
    /// rows that follow.
    fn insert_measurement(&mut self, row: &Measurement) -> Result<u64, BackendError>;

    fn insert_aggregate(&mut self, row: &AggregateRecord) -> Result<u64, BackendError>;

    fn commit(&mut self) -> Result<(), BackendError>;

    fn measurement(&mut self, measurement_id: &str) -> Result<Option<Measurement>, BackendError>;

    fn aggregate(
        &mut self,
        station_name: &str,
        file_name: &str,
    ) -> Result<Option<AggregateRecord>, BackendError>;

    fn count(&mut self, table: Table) -> Result<u64, BackendError>;

    fn close(self: Box<Self>) -> Result<(), BackendError>;
}

/// Open a connection to the configured database.
pub fn connect(target: &DbTarget) -> Result<Box<dyn Store>, BackendError> {
    match target {
        DbTarget::Postgres(config) => Ok(Box::new(PgStore::connect(config)?)),
        DbTarget::DuckDb { path } => Ok(Box::new(DuckStore::open(path)?)),
    }
}
