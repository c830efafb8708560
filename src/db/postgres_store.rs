use log::debug;
use postgres::types::ToSql;
use postgres::{Client, NoTls};

use crate::aggregate::AggregateRecord;
use crate::config::ConnectionConfig;
use crate::db::schema::{self, Dialect, INSERT_AGGREGATE, INSERT_MEASUREMENT, SELECT_AGGREGATE};
use crate::db::{BackendError, Store, Table};
use crate::dimension::{Dimension, Statistic};
use crate::measurement::Measurement;

const ROW_SAVEPOINT: &str = "seabreeze_row";

/// A blocking connection to the Postgres database.
///
/// Between `begin` and `commit` every insert runs inside its own savepoint,
/// a failed row is rolled back to it and the transaction stays usable.
pub struct PgStore {
    client: Client,
    description: String,
    in_transaction: bool,
}

impl PgStore {
    pub fn connect(config: &ConnectionConfig) -> Result<PgStore, BackendError> {
        let mut pg = postgres::Config::new();
        pg.dbname(&config.dbname)
            .user(&config.user)
            .host(&config.host)
            .port(config.port);
        if let Some(password) = &config.password {
            pg.password(password);
        }
        let client = pg.connect(NoTls)?;
        Ok(PgStore {
            client,
            description: format!(
                "postgres {}@{}:{}/{}",
                config.user, config.host, config.port, config.dbname
            ),
            in_transaction: false,
        })
    }

    /// Run one parameterized insert, isolated by a savepoint when inside
    /// the batch transaction.
    fn insert(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, BackendError> {
        if !self.in_transaction {
            return Ok(self.client.execute(sql, params)?);
        }
        self.client
            .batch_execute(&format!("SAVEPOINT {}", ROW_SAVEPOINT))?;
        match self.client.execute(sql, params) {
            Ok(n) => {
                self.client
                    .batch_execute(&format!("RELEASE SAVEPOINT {}", ROW_SAVEPOINT))?;
                Ok(n)
            }
            Err(e) => {
                self.client
                    .batch_execute(&format!("ROLLBACK TO SAVEPOINT {}", ROW_SAVEPOINT))?;
                Err(e.into())
            }
        }
    }
}

impl Store for PgStore {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    fn execute(&mut self, sql: &str) -> Result<(), BackendError> {
        self.client.batch_execute(sql)?;
        Ok(())
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        if !self.in_transaction {
            self.client.batch_execute("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn insert_measurement(&mut self, row: &Measurement) -> Result<u64, BackendError> {
        let values = row.values();
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![
            &row.measurement_id,
            &row.station_name,
            &row.measurement_timestamp,
            &row.date,
            &row.time,
        ];
        params.extend(values.iter().map(|v| v as &(dyn ToSql + Sync)));
        self.insert(INSERT_MEASUREMENT.as_str(), &params)
    }

    fn insert_aggregate(&mut self, row: &AggregateRecord) -> Result<u64, BackendError> {
        let values = row.values();
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&row.station_name, &row.file_name];
        params.extend(values.iter().map(|v| v as &(dyn ToSql + Sync)));
        self.insert(INSERT_AGGREGATE.as_str(), &params)
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        if self.in_transaction {
            self.in_transaction = false;
            self.client.batch_execute("COMMIT")?;
        } else {
            debug!("commit without an open transaction, nothing to do");
        }
        Ok(())
    }

    fn measurement(&mut self, measurement_id: &str) -> Result<Option<Measurement>, BackendError> {
        let sql = schema::select_measurement(Dialect::Postgres);
        let row = match self.client.query_opt(sql.as_str(), &[&measurement_id])? {
            Some(row) => row,
            None => return Ok(None),
        };
        let mut m = Measurement::new(
            row.try_get::<_, String>(0)?,
            row.try_get::<_, String>(1)?,
            row.try_get(2)?,
        );
        m.date = row.try_get(3)?;
        m.time = row.try_get(4)?;
        for dim in Dimension::ALL {
            m.set_value(dim, row.try_get::<_, Option<f64>>(5 + dim.index())?);
        }
        Ok(Some(m))
    }

    fn aggregate(
        &mut self,
        station_name: &str,
        file_name: &str,
    ) -> Result<Option<AggregateRecord>, BackendError> {
        let row = match self
            .client
            .query_opt(SELECT_AGGREGATE.as_str(), &[&station_name, &file_name])?
        {
            Some(row) => row,
            None => return Ok(None),
        };
        let mut record = AggregateRecord::new(
            row.try_get::<_, String>(0)?,
            row.try_get::<_, String>(1)?,
        );
        let mut i = 2;
        for dim in Dimension::ALL {
            for stat in Statistic::ALL {
                record.stats_mut(dim).set(stat, row.try_get::<_, Option<f64>>(i)?);
                i += 1;
            }
        }
        Ok(Some(record))
    }

    fn count(&mut self, table: Table) -> Result<u64, BackendError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let row = self.client.query_one(sql.as_str(), &[])?;
        let n: i64 = row.try_get(0)?;
        Ok(n as u64)
    }

    fn close(self: Box<Self>) -> Result<(), BackendError> {
        // an uncommitted batch is rolled back by the server when the session ends
        self.client.close()?;
        Ok(())
    }
}
