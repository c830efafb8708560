use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error("unknown backend '{0}', expected 'postgres' or 'duckdb'")]
    InvalidBackend(String),
    #[error("cannot load environment file {path}: {source}")]
    EnvFile {
        path: String,
        #[source]
        source: dotenvy::Error,
    },
}

/// Credentials for the Postgres database.
#[derive(Clone, PartialEq)]
pub struct ConnectionConfig {
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            dbname: "SeaBreeze".to_string(),
            user: "SeaBreeze".to_string(),
            password: None,
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl ConnectionConfig {
    /// Read the `SEABREEZE_DB_*` variables, falling back to the defaults.
    pub fn from_env() -> Result<ConnectionConfig, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<ConnectionConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = ConnectionConfig::default();
        let port = match lookup("SEABREEZE_DB_PORT") {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(p.clone()))?,
            None => default.port,
        };
        Ok(ConnectionConfig {
            dbname: lookup("SEABREEZE_DB_NAME").unwrap_or(default.dbname),
            user: lookup("SEABREEZE_DB_USER").unwrap_or(default.user),
            password: lookup("SEABREEZE_DB_PASSWORD").filter(|p| !p.is_empty()),
            host: lookup("SEABREEZE_DB_HOST").unwrap_or(default.host),
            port,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    DuckDb,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "duckdb" => Ok(Backend::DuckDb),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

pub const DEFAULT_DUCKDB_PATH: &str = "seabreeze.duckdb";

/// Where the loader writes to.
#[derive(Debug, Clone, PartialEq)]
pub enum DbTarget {
    Postgres(ConnectionConfig),
    /// A DuckDB file, or `:memory:`.
    DuckDb { path: String },
}

impl DbTarget {
    pub fn from_env() -> Result<DbTarget, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<DbTarget, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("SEABREEZE_BACKEND") {
            Some(b) => b.parse::<Backend>()?,
            None => Backend::Postgres,
        };
        Self::for_backend(backend, lookup)
    }

    /// Target for a backend chosen up front, e.g. on the command line.
    pub fn for_backend<F>(backend: Backend, lookup: F) -> Result<DbTarget, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match backend {
            Backend::Postgres => Ok(DbTarget::Postgres(ConnectionConfig::from_lookup(lookup)?)),
            Backend::DuckDb => Ok(DbTarget::DuckDb {
                path: lookup("SEABREEZE_DUCKDB_PATH").unwrap_or_else(|| DEFAULT_DUCKDB_PATH.to_string()),
            }),
        }
    }
}

/// Load `.env/<env>.env` into the process environment.  A missing file is
/// not an error, variables may come from the environment directly.
pub fn load_env_file(env: &str) -> Result<(), ConfigError> {
    let path = format!(".env/{}.env", env);
    if !Path::new(&path).exists() {
        return Ok(());
    }
    dotenvy::from_path(Path::new(&path))
        .map(|_| ())
        .map_err(|source| ConfigError::EnvFile { path, source })
}
