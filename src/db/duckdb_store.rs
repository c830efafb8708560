use chrono::NaiveDate;
use duckdb::{params, Connection, ToSql};
use log::debug;

use crate::aggregate::AggregateRecord;
use crate::db::schema::{self, Dialect, INSERT_AGGREGATE, INSERT_MEASUREMENT, SELECT_AGGREGATE};
use crate::db::{BackendError, Store, Table};
use crate::dimension::{Dimension, Statistic};
use crate::input::{parse_time, parse_timestamp};
use crate::measurement::Measurement;

/// A DuckDB archive, on disk or in memory.
///
/// DuckDB aborts the whole transaction on the first failed statement and has
/// no savepoints, so rows are written in autocommit mode.  `begin` and
/// `commit` are no-ops.
pub struct DuckStore {
    conn: Connection,
    path: String,
}

impl DuckStore {
    /// Open (or create) the database file at `path`.  Use `:memory:` for an
    /// in-memory database.
    pub fn open(path: &str) -> Result<DuckStore, BackendError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        Ok(DuckStore {
            conn,
            path: path.to_string(),
        })
    }

    pub fn open_in_memory() -> Result<DuckStore, BackendError> {
        DuckStore::open(":memory:")
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn invalid(column: &str, value: &str) -> BackendError {
    BackendError::Message(format!("cannot parse {} value '{}'", column, value))
}

fn measurement_from_row(row: &duckdb::Row<'_>) -> Result<Measurement, BackendError> {
    let ts: String = row.get(2)?;
    let date: String = row.get(3)?;
    let time: String = row.get(4)?;
    let mut m = Measurement::new(
        row.get::<usize, String>(0)?,
        row.get::<usize, String>(1)?,
        parse_timestamp(&ts).ok_or_else(|| invalid("measurement_timestamp", &ts))?,
    );
    m.date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| invalid("date", &date))?;
    m.time = parse_time(&time).ok_or_else(|| invalid("time", &time))?;
    for dim in Dimension::ALL {
        m.set_value(dim, row.get::<usize, Option<f64>>(5 + dim.index())?);
    }
    Ok(m)
}

fn aggregate_from_row(row: &duckdb::Row<'_>) -> Result<AggregateRecord, BackendError> {
    let mut record = AggregateRecord::new(
        row.get::<usize, String>(0)?,
        row.get::<usize, String>(1)?,
    );
    let mut i = 2;
    for dim in Dimension::ALL {
        for stat in Statistic::ALL {
            record.stats_mut(dim).set(stat, row.get::<usize, Option<f64>>(i)?);
            i += 1;
        }
    }
    Ok(record)
}

impl Store for DuckStore {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    fn describe(&self) -> String {
        format!("duckdb {}", self.path)
    }

    fn execute(&mut self, sql: &str) -> Result<(), BackendError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        debug!("duckdb rows are written in autocommit mode");
        Ok(())
    }

    fn insert_measurement(&mut self, row: &Measurement) -> Result<u64, BackendError> {
        let ts = row
            .measurement_timestamp
            .format("%Y-%m-%d %H:%M:%S%.f")
            .to_string();
        let date = row.date.format("%Y-%m-%d").to_string();
        let time = row.time.format("%H:%M:%S%.f").to_string();
        let values = row.values();

        let mut params: Vec<&dyn ToSql> = vec![&row.measurement_id, &row.station_name, &ts, &date, &time];
        params.extend(values.iter().map(|v| v as &dyn ToSql));
        let n = self.conn.execute(INSERT_MEASUREMENT.as_str(), params.as_slice())?;
        Ok(n as u64)
    }

    fn insert_aggregate(&mut self, row: &AggregateRecord) -> Result<u64, BackendError> {
        let values = row.values();
        let mut params: Vec<&dyn ToSql> = vec![&row.station_name, &row.file_name];
        params.extend(values.iter().map(|v| v as &dyn ToSql));
        let n = self.conn.execute(INSERT_AGGREGATE.as_str(), params.as_slice())?;
        Ok(n as u64)
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn measurement(&mut self, measurement_id: &str) -> Result<Option<Measurement>, BackendError> {
        let sql = schema::select_measurement(Dialect::DuckDb);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![measurement_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(measurement_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn aggregate(
        &mut self,
        station_name: &str,
        file_name: &str,
    ) -> Result<Option<AggregateRecord>, BackendError> {
        let mut stmt = self.conn.prepare(SELECT_AGGREGATE.as_str())?;
        let mut rows = stmt.query(params![station_name, file_name])?;
        match rows.next()? {
            Some(row) => Ok(Some(aggregate_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn count(&mut self, table: Table) -> Result<u64, BackendError> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.name()), [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn close(self: Box<Self>) -> Result<(), BackendError> {
        self.conn.close().map_err(|(_, e)| BackendError::DuckDb(e))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use chrono::NaiveDateTime;

    use super::*;

    fn store() -> Result<DuckStore, Box<dyn Error>> {
        let mut store = DuckStore::open_in_memory()?;
        for sql in schema::schema_statements(Dialect::DuckDb) {
            store.execute(&sql)?;
        }
        Ok(store)
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn measurement_roundtrip() -> Result<(), Box<dyn Error>> {
        let mut store = store()?;
        let mut m = Measurement::new("OakStreet201605221500", "Oak Street Weather Station", ts("2016-05-22 15:00:00"));
        m.air_temperature = Some(14.3);
        m.barometric_pressure = Some(993.2);
        m.battery_life = Some(11.9);
        assert_eq!(store.insert_measurement(&m)?, 1);

        let back = store.measurement("OakStreet201605221500")?;
        assert_eq!(back, Some(m));
        assert_eq!(store.measurement("missing")?, None);
        Ok(())
    }

    #[test]
    fn fractional_seconds_roundtrip() -> Result<(), Box<dyn Error>> {
        let mut store = store()?;
        let nanos = NaiveDateTime::parse_from_str("2016-06-01 01:00:00.123456789", "%Y-%m-%d %H:%M:%S%.f")?;
        let m = Measurement::new("Calumet201606010100", "Calumet Beach", nanos);
        assert_eq!(m.time.format("%H:%M:%S%.f").to_string(), "01:00:00.123456");
        assert_eq!(store.insert_measurement(&m)?, 1);
        assert_eq!(store.measurement("Calumet201606010100")?, Some(m));
        Ok(())
    }

    #[test]
    fn duplicate_measurement_is_ignored() -> Result<(), Box<dyn Error>> {
        let mut store = store()?;
        let first = Measurement::new("id-1", "Foster Weather Station", ts("2016-01-01 00:00:00"));
        let mut second = first.clone();
        second.station_name = "63rd Street Weather Station".to_string();

        assert_eq!(store.insert_measurement(&first)?, 1);
        assert_eq!(store.insert_measurement(&second)?, 0);
        assert_eq!(store.count(Table::Measurements)?, 1);
        let kept = store.measurement("id-1")?.unwrap();
        assert_eq!(kept.station_name, "Foster Weather Station");
        Ok(())
    }

    #[test]
    fn aggregate_roundtrip() -> Result<(), Box<dyn Error>> {
        let mut store = store()?;
        let mut agg = AggregateRecord::new("Foster Weather Station", "foster_2016.csv");
        agg.stats_mut(Dimension::Humidity).min = Some(21.0);
        agg.stats_mut(Dimension::Humidity).std = Some(4.75);
        agg.stats_mut(Dimension::BatteryLife).max = Some(12.2);
        assert_eq!(store.insert_aggregate(&agg)?, 1);
        assert_eq!(store.insert_aggregate(&agg)?, 0);

        let back = store.aggregate("Foster Weather Station", "foster_2016.csv")?;
        assert_eq!(back, Some(agg));
        assert_eq!(store.count(Table::Aggregates)?, 1);
        Ok(())
    }

    #[test]
    fn created_at_is_filled_in() -> Result<(), Box<dyn Error>> {
        let mut store = store()?;
        let m = Measurement::new("id-2", "Foster Weather Station", ts("2016-01-01 00:00:00"));
        store.insert_measurement(&m)?;
        let missing: i64 = store.connection().query_row(
            "SELECT COUNT(*) FROM preprocessed_data WHERE created_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(missing, 0);
        Ok(())
    }
}
