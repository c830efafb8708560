use std::fmt::Debug;

use log::{debug, error, info};

use crate::db::Table;
use crate::loader::{BatchSummary, LoaderError};

/// Receives the loader's progress events.  The loader never logs directly,
/// so callers decide where these end up.
pub trait Reporter {
    fn connected(&mut self, backend: &str);

    fn connect_failed(&mut self, error: &LoaderError);

    fn schema_ready(&mut self);

    fn schema_failed(&mut self, error: &LoaderError);

    /// A row was dropped by the conflict-ignore clause.
    fn row_skipped(&mut self, table: Table, row: &dyn Debug);

    fn row_failed(&mut self, table: Table, row: &dyn Debug, error: &LoaderError);

    fn batch_done(&mut self, summary: &BatchSummary);

    fn closed(&mut self, backend: &str);

    /// An error that stopped a whole step of the workflow.
    fn fatal(&mut self, error: &LoaderError);
}

/// Forwards loader events to the `log` facade.
#[derive(Debug, Clone)]
pub struct LogReporter {
    target: String,
}

impl LogReporter {
    pub fn new(target: impl Into<String>) -> LogReporter {
        LogReporter {
            target: target.into(),
        }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        LogReporter::new("seabreeze::loader")
    }
}

impl Reporter for LogReporter {
    fn connected(&mut self, backend: &str) {
        info!(target: self.target.as_str(), "Connected to {}", backend);
    }

    fn connect_failed(&mut self, error: &LoaderError) {
        error!(target: self.target.as_str(), "Failed to connect to the database. Error: {}", error);
    }

    fn schema_ready(&mut self) {
        info!(target: self.target.as_str(), "Tables and indexes created successfully!");
    }

    fn schema_failed(&mut self, error: &LoaderError) {
        error!(target: self.target.as_str(), "Error creating tables and indexes: {}", error);
    }

    fn row_skipped(&mut self, table: Table, row: &dyn Debug) {
        debug!(target: self.target.as_str(), "Row already in {}, skipped: {:?}", table, row);
    }

    fn row_failed(&mut self, _table: Table, row: &dyn Debug, error: &LoaderError) {
        error!(target: self.target.as_str(), "Error inserting row: {:?}. Error: {}", row, error);
    }

    fn batch_done(&mut self, summary: &BatchSummary) {
        info!(
            target: self.target.as_str(),
            "Data inserted into {} table: {} new, {} already present, {} failed",
            summary.table,
            summary.inserted,
            summary.skipped,
            summary.failed
        );
    }

    fn closed(&mut self, backend: &str) {
        info!(target: self.target.as_str(), "Database connection closed ({})", backend);
    }

    fn fatal(&mut self, error: &LoaderError) {
        error!(target: self.target.as_str(), "Fatal error in main workflow: {}", error);
    }
}
