use std::fmt::Debug;

use thiserror::Error;

use crate::aggregate::AggregateRecord;
use crate::config::DbTarget;
use crate::db::{self, BackendError, Store, Table};
use crate::measurement::Measurement;
use crate::reporter::{LogReporter, Reporter};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("failed to connect to the database: {0}")]
    Connection(#[source] BackendError),
    #[error("schema setup failed: {0}")]
    Schema(#[source] BackendError),
    #[error("{0}")]
    RowInsert(#[source] BackendError),
    #[error("duplicate entry: {0}")]
    UniqueViolation(#[source] BackendError),
    #[error("cannot start the batch transaction: {0}")]
    Transaction(#[source] BackendError),
    #[error("commit failed: {0}")]
    Commit(#[source] BackendError),
    #[error("closing the connection failed: {0}")]
    Close(#[source] BackendError),
    #[error("cannot {operation} when the loader is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: LoaderState,
    },
}

impl LoaderError {
    fn from_row(e: BackendError) -> LoaderError {
        if e.is_unique_violation() {
            LoaderError::UniqueViolation(e)
        } else {
            LoaderError::RowInsert(e)
        }
    }
}

/// `Disconnected → Connected → SchemaReady → Loading → Closed`.  A loader
/// only moves forward; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoaderState {
    Disconnected,
    Connected,
    SchemaReady,
    Loading,
    Closed,
}

/// Outcome of one insert batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub table: Table,
    /// Rows written.
    pub inserted: usize,
    /// Rows whose key was already present.
    pub skipped: usize,
    /// Rows rejected by the database.
    pub failed: usize,
}

impl BatchSummary {
    fn new(table: Table) -> BatchSummary {
        BatchSummary {
            table,
            inserted: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.skipped + self.failed
    }
}

/// What [`Loader::run`] got done.  A `None` batch did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub state: LoaderState,
    pub measurements: Option<BatchSummary>,
    pub aggregates: Option<BatchSummary>,
}

/// Loads measurements and aggregates through one database connection.
///
/// Rows are inserted one at a time.  A row the database rejects is reported
/// and skipped, the rest of the batch still goes in, and the batch is
/// committed once at the end whatever happened to individual rows.
///
/// The connection is released by [`Loader::close`], or when the loader is
/// dropped.
pub struct Loader<R: Reporter = LogReporter> {
    store: Option<Box<dyn Store>>,
    description: String,
    state: LoaderState,
    reporter: R,
}

impl<R: Reporter> Loader<R> {
    /// Open a connection.  On failure the error is reported and returned, no
    /// loader exists and nothing else can run.
    pub fn connect(target: &DbTarget, mut reporter: R) -> Result<Loader<R>, LoaderError> {
        match db::connect(target) {
            Ok(store) => Ok(Loader::with_store(store, reporter)),
            Err(e) => {
                let err = LoaderError::Connection(e);
                reporter.connect_failed(&err);
                Err(err)
            }
        }
    }

    /// Wrap an already open store.
    pub fn with_store(store: Box<dyn Store>, mut reporter: R) -> Loader<R> {
        let description = store.describe();
        reporter.connected(&description);
        Loader {
            store: Some(store),
            description,
            state: LoaderState::Connected,
            reporter,
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Direct access to the connection, `None` once closed.
    pub fn store(&mut self) -> Option<&mut Box<dyn Store>> {
        self.store.as_mut()
    }

    fn check_state(
        &self,
        operation: &'static str,
        allowed: &[LoaderState],
    ) -> Result<(), LoaderError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(LoaderError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Create both tables and their indexes if they don't exist yet.  Safe to
    /// call more than once.  A failure is reported, the loader stays
    /// `Connected` and inserts may still be attempted.
    pub fn ensure_schema(&mut self) -> Result<(), LoaderError> {
        self.check_state(
            "create the schema",
            &[LoaderState::Connected, LoaderState::SchemaReady],
        )?;
        let store = match self.store.as_mut() {
            Some(store) => store,
            None => {
                return Err(LoaderError::InvalidState {
                    operation: "create the schema",
                    state: self.state,
                })
            }
        };
        let statements = db::schema::schema_statements(store.dialect());
        for sql in &statements {
            if let Err(e) = store.execute(sql) {
                let err = LoaderError::Schema(e);
                self.reporter.schema_failed(&err);
                return Err(err);
            }
        }
        self.state = LoaderState::SchemaReady;
        self.reporter.schema_ready();
        Ok(())
    }

    /// Insert measurements, ignoring ids already in `preprocessed_data`.
    pub fn insert_measurements(&mut self, rows: &[Measurement]) -> Result<BatchSummary, LoaderError> {
        self.insert_batch(Table::Measurements, rows, |store, row| {
            store.insert_measurement(row)
        })
    }

    /// Insert aggregates, ignoring `(station_name, file_name)` pairs already
    /// in `aggregated_data`.
    pub fn insert_aggregates(
        &mut self,
        rows: &[AggregateRecord],
    ) -> Result<BatchSummary, LoaderError> {
        self.insert_batch(Table::Aggregates, rows, |store, row| {
            store.insert_aggregate(row)
        })
    }

    fn insert_batch<T, F>(&mut self, table: Table, rows: &[T], insert: F) -> Result<BatchSummary, LoaderError>
    where
        T: Debug,
        F: Fn(&mut Box<dyn Store>, &T) -> Result<u64, BackendError>,
    {
        let operation = "insert rows";
        self.check_state(
            operation,
            &[
                LoaderState::Connected,
                LoaderState::SchemaReady,
                LoaderState::Loading,
            ],
        )?;
        let store = match self.store.as_mut() {
            Some(store) => store,
            None => {
                return Err(LoaderError::InvalidState {
                    operation,
                    state: self.state,
                })
            }
        };
        self.state = LoaderState::Loading;
        store.begin().map_err(LoaderError::Transaction)?;

        let mut summary = BatchSummary::new(table);
        for row in rows {
            match insert(store, row) {
                Ok(0) => {
                    summary.skipped += 1;
                    self.reporter.row_skipped(table, row);
                }
                Ok(_) => summary.inserted += 1,
                Err(e) => {
                    summary.failed += 1;
                    self.reporter.row_failed(table, row, &LoaderError::from_row(e));
                }
            }
        }

        store.commit().map_err(LoaderError::Commit)?;
        self.reporter.batch_done(&summary);
        Ok(summary)
    }

    /// Release the connection.  Closing twice is a no-op.
    pub fn close(&mut self) -> Result<(), LoaderError> {
        let store = match self.store.take() {
            Some(store) => store,
            None => return Ok(()),
        };
        self.state = LoaderState::Closed;
        store.close().map_err(LoaderError::Close)?;
        self.reporter.closed(&self.description);
        Ok(())
    }

    /// Schema, measurements, aggregates, then close.  Errors are reported
    /// and never stop the connection from being closed.
    pub fn run(&mut self, measurements: &[Measurement], aggregates: &[AggregateRecord]) -> RunReport {
        match self.ensure_schema() {
            // already reported, loading goes on regardless
            Ok(()) | Err(LoaderError::Schema(_)) => {}
            Err(e) => self.reporter.fatal(&e),
        }

        let measurements = match self.insert_measurements(measurements) {
            Ok(summary) => Some(summary),
            Err(e) => {
                self.reporter.fatal(&e);
                None
            }
        };
        let aggregates = match self.insert_aggregates(aggregates) {
            Ok(summary) => Some(summary),
            Err(e) => {
                self.reporter.fatal(&e);
                None
            }
        };
        if let Err(e) = self.close() {
            self.reporter.fatal(&e);
        }
        RunReport {
            state: self.state,
            measurements,
            aggregates,
        }
    }
}

impl<R: Reporter> Drop for Loader<R> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            self.reporter.fatal(&e);
        }
    }
}

/// Connect to `target` and run the whole load, logging through `reporter`.
/// If the connection fails nothing runs and the report stays `Disconnected`.
pub fn run_with<R: Reporter>(
    target: &DbTarget,
    reporter: R,
    measurements: &[Measurement],
    aggregates: &[AggregateRecord],
) -> RunReport {
    match Loader::connect(target, reporter) {
        Ok(mut loader) => loader.run(measurements, aggregates),
        Err(_) => RunReport {
            state: LoaderState::Disconnected,
            measurements: None,
            aggregates: None,
        },
    }
}

/// [`run_with`] using the `log` facade.
pub fn run(target: &DbTarget, measurements: &[Measurement], aggregates: &[AggregateRecord]) -> RunReport {
    run_with(target, LogReporter::default(), measurements, aggregates)
}
