use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{error, info};

use seabreeze::config::{self, Backend, DbTarget};
use seabreeze::input::open_input;
use seabreeze::{read_aggregates, read_measurements, AggregateRecord, Measurement};

#[derive(Parser, Debug)]
#[command(version, about = "Load preprocessed weather station data into the database", long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod.  Reads `.env/<env>.env` if present.
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Preprocessed measurements, a CSV file (optionally .gz)
    #[arg(short, long)]
    measurements: Option<PathBuf>,

    /// Per-file aggregates, a CSV file (optionally .gz)
    #[arg(short, long)]
    aggregates: Option<PathBuf>,

    /// Override SEABREEZE_BACKEND, `postgres` or `duckdb`
    #[arg(long)]
    backend: Option<Backend>,

    /// DuckDB file to write to, implies `--backend duckdb`
    #[arg(long)]
    duckdb: Option<String>,

    /// Append log lines to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut builder = env_logger::builder();
    builder.filter_level(log::LevelFilter::Info);
    if let Some(path) = log_file {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn target(args: &Args) -> Result<DbTarget, Box<dyn Error>> {
    if let Some(path) = &args.duckdb {
        return Ok(DbTarget::DuckDb { path: path.clone() });
    }
    match args.backend {
        Some(backend) => Ok(DbTarget::for_backend(backend, |key| std::env::var(key).ok())?),
        None => Ok(DbTarget::from_env()?),
    }
}

fn measurements(path: Option<&Path>) -> Result<Vec<Measurement>, Box<dyn Error>> {
    match path {
        Some(path) => {
            info!("reading measurements from {} ...", path.display());
            Ok(read_measurements(open_input(path)?)?.rows)
        }
        None => Ok(Vec::new()),
    }
}

fn aggregates(path: Option<&Path>) -> Result<Vec<AggregateRecord>, Box<dyn Error>> {
    match path {
        Some(path) => {
            info!("reading aggregates from {} ...", path.display());
            Ok(read_aggregates(open_input(path)?)?.rows)
        }
        None => Ok(Vec::new()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;

    config::load_env_file(&args.env)?;
    let target = target(&args)?;

    let measurements = measurements(args.measurements.as_deref())?;
    let aggregates = aggregates(args.aggregates.as_deref())?;

    let report = seabreeze::run(&target, &measurements, &aggregates);
    match (report.measurements, report.aggregates) {
        (Some(m), Some(a)) => info!(
            "done: {} measurements and {} aggregates inserted",
            m.inserted, a.inserted
        ),
        _ => error!("load did not complete, see the errors above"),
    }
    Ok(())
}
