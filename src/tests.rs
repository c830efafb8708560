use std::error::Error;
use std::path::PathBuf;

use itertools::Itertools;

use crate::db::{DuckStore, Store, Table};
use crate::{read_aggregates, read_measurements, DbTarget, Dimension, LoaderState, Statistic};

const MEASUREMENTS_HEADER: &str = "Station Name,Measurement Timestamp,Air Temperature,Wet Bulb Temperature,Humidity,Rain Intensity,Interval Rain,Total Rain,Precipitation Type,Wind Direction,Wind Speed,Maximum Wind Speed,Barometric Pressure,Solar Radiation,Heading,Battery Life,Measurement ID,date,time";

fn measurement_line(id: &str, hour: u32, humidity: &str) -> String {
    format!(
        "Oak Street Weather Station,2016-06-01 {hour:02}:00:00,19.4,16.2,{humidity},0,0,112.3,0,204,2.1,3.4,993.1,12,351,11.9,{id},2016-06-01,{hour:02}:00:00"
    )
}

fn archive_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("seabreeze_{}_{}.duckdb", name, std::process::id()))
}

fn aggregates_csv(rows: &[(&str, &str)]) -> String {
    let mut header = vec!["data_source".to_string(), "file_name".to_string()];
    for dim in Dimension::ALL {
        for stat in Statistic::ALL {
            header.push(format!("{}_{}", dim.label(), stat.suffix()));
        }
    }
    let lines = rows.iter().map(|(station, file)| {
        let mut values = vec![station.to_string(), file.to_string()];
        values.extend((0..56).map(|i| format!("{}.5", i)));
        values.join(",")
    });
    std::iter::once(header.join(",")).chain(lines).join("\n")
}

#[test]
fn load_csv_into_duckdb_archive() -> Result<(), Box<dyn Error>> {
    let path = archive_path("load");
    let _ = std::fs::remove_file(&path);

    let csv = [
        MEASUREMENTS_HEADER.to_string(),
        measurement_line("OakStreet201606010100", 1, "71"),
        measurement_line("OakStreet201606010200", 2, "72"),
        measurement_line("OakStreet201606010300", 3, "damp"),
        measurement_line("OakStreet201606010400", 4, "74"),
        measurement_line("OakStreet201606010500", 5, "75"),
    ]
    .iter()
    .join("\n");
    let measurements = read_measurements(csv.as_bytes())?;
    assert_eq!(measurements.rejected.len(), 1);
    let aggregates = read_aggregates(
        aggregates_csv(&[
            ("Oak Street Weather Station", "oak_2016.csv"),
            ("Foster Weather Station", "foster_2016.csv"),
        ])
        .as_bytes(),
    )?;

    let target = DbTarget::DuckDb {
        path: path.display().to_string(),
    };
    let report = crate::run(&target, &measurements.rows, &aggregates.rows);
    assert_eq!(report.state, LoaderState::Closed);
    assert_eq!(report.measurements.map(|s| s.inserted), Some(4));
    assert_eq!(report.aggregates.map(|s| s.inserted), Some(2));

    // loading the same files again changes nothing
    let report = crate::run(&target, &measurements.rows, &aggregates.rows);
    assert_eq!(report.measurements.map(|s| (s.inserted, s.skipped)), Some((0, 4)));
    assert_eq!(report.aggregates.map(|s| (s.inserted, s.skipped)), Some((0, 2)));

    let mut store = DuckStore::open(&path.display().to_string())?;
    assert_eq!(store.count(Table::Measurements)?, 4);
    assert_eq!(store.count(Table::Aggregates)?, 2);
    assert!(store.measurement("OakStreet201606010300")?.is_none());

    let m = store.measurement("OakStreet201606010400")?.unwrap();
    assert_eq!(m, measurements.rows[2]);
    assert_eq!(m.humidity, Some(74.0));
    assert_eq!(m.total_rain, Some(112.3));

    let agg = store
        .aggregate("Foster Weather Station", "foster_2016.csv")?
        .unwrap();
    assert_eq!(agg, aggregates.rows[1]);
    assert_eq!(agg.stats(Dimension::AirTemperature).min, Some(0.5));
    assert_eq!(agg.stats(Dimension::BatteryLife).std, Some(55.5));

    Box::new(store).close()?;
    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn n_unique_rows_match_field_by_field() -> Result<(), Box<dyn Error>> {
    let path = archive_path("unique");
    let _ = std::fs::remove_file(&path);

    let csv = std::iter::once(MEASUREMENTS_HEADER.to_string())
        .chain((0..24).map(|h| measurement_line(&format!("id-{}", h), h, &format!("{}", 50 + h))))
        .join("\n");
    let measurements = read_measurements(csv.as_bytes())?.rows;
    assert_eq!(measurements.len(), 24);

    let target = DbTarget::DuckDb {
        path: path.display().to_string(),
    };
    let report = crate::run(&target, &measurements, &[]);
    assert_eq!(report.measurements.map(|s| s.inserted), Some(24));

    let mut store = DuckStore::open(&path.display().to_string())?;
    assert_eq!(store.count(Table::Measurements)?, 24);
    for m in &measurements {
        assert_eq!(store.measurement(&m.measurement_id)?.as_ref(), Some(m));
    }
    Box::new(store).close()?;
    std::fs::remove_file(&path)?;
    Ok(())
}
