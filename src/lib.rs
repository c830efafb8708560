pub mod aggregate;
pub mod config;
pub mod db;
pub mod dimension;
pub mod input;
pub mod loader;
pub mod measurement;
pub mod reporter;

#[cfg(test)]
mod tests;

pub use aggregate::{read_aggregates, AggregateRecord};
pub use config::{ConnectionConfig, DbTarget};
pub use dimension::{Dimension, Statistic, Stats};
pub use loader::{run, run_with, BatchSummary, Loader, LoaderError, LoaderState, RunReport};
pub use measurement::{read_measurements, Measurement};
pub use reporter::{LogReporter, Reporter};
