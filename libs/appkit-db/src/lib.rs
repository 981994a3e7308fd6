//! Database abstraction for the application stack.
//!
//! Provides a unified handle over SQLite and PostgreSQL through SeaORM,
//! typed connection options, a small unit-of-work layer (queued entity
//! operations with scoped flush) and a translation-aware repository
//! wrapper. Schema provisioning for tests and deployment runs through
//! `sea-orm-migration` migrators.

pub mod schema;
pub mod translatable;
pub mod uow;

pub use schema::SchemaProvisioner;
pub use translatable::{
    Criteria, FieldMap, OrderBy, SortDir, Translatable, TranslatableError,
    TranslatableRepository, TranslatedQuery, TranslationHints, TranslationSpec,
};
pub use uow::{EntityKey, UnitOfWork};

use std::path::Path;
use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

/// Connection options covering the common pool knobs.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// For `SQLite` file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            create_sqlite_dirs: true,
        }
    }
}

/// Main handle: engine + SeaORM connection.
#[derive(Debug, Clone)]
pub struct DbHandle {
    engine: DbEngine,
    conn: DatabaseConnection,
    dsn: String,
}

impl DbHandle {
    /// Detect engine by DSN scheme prefix. The tail (credentials etc.) is
    /// never touched.
    ///
    /// # Errors
    /// Returns `DbError::UnknownDsn` if the scheme is not recognized.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();

        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_owned()))
        }
    }

    /// Connect and build a handle.
    ///
    /// In-memory SQLite databases are pinned to a single pooled connection,
    /// otherwise every checkout would see its own empty database.
    ///
    /// # Errors
    /// Returns an error if the DSN is invalid or the connection fails.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;

        if engine == DbEngine::Sqlite && opts.create_sqlite_dirs && !is_memory_dsn(dsn) {
            if let Some(parent) = sqlite_file_path(dsn).as_deref().and_then(Path::parent) {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let mut options = ConnectOptions::new(dsn.to_owned());
        if let Some(max) = opts.max_conns {
            options.max_connections(max);
        }
        if let Some(min) = opts.min_conns {
            options.min_connections(min);
        }
        if let Some(timeout) = opts.acquire_timeout {
            options.acquire_timeout(timeout);
        }
        if engine == DbEngine::Sqlite && is_memory_dsn(dsn) {
            options.max_connections(1).min_connections(1);
        }
        options.sqlx_logging(false);

        let conn = Database::connect(options).await?;
        tracing::debug!(dsn = %redact_credentials_in_dsn(dsn), ?engine, "database connected");

        Ok(Self {
            engine,
            conn,
            dsn: dsn.to_owned(),
        })
    }

    #[inline]
    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    #[inline]
    #[must_use]
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    #[inline]
    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Round-trip health check.
    ///
    /// # Errors
    /// Surfaces the underlying connection error.
    pub async fn ping(&self) -> Result<()> {
        self.conn.ping().await.map_err(Into::into)
    }

    /// Close the underlying pool.
    ///
    /// # Errors
    /// Surfaces the underlying close error.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await.map_err(Into::into)
    }
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// File path of a SQLite DSN (`sqlite://var/data/app.db?...` → `var/data/app.db`).
fn sqlite_file_path(dsn: &str) -> Option<std::path::PathBuf> {
    let rest = dsn
        .trim_start()
        .strip_prefix("sqlite://")
        .or_else(|| dsn.trim_start().strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        return None;
    }
    Some(std::path::PathBuf::from(path))
}

/// Redact the password in a DSN for logging.
#[must_use]
pub fn redact_credentials_in_dsn(dsn: &str) -> String {
    let Some(scheme_end) = dsn.find("://") else {
        return dsn.to_owned();
    };
    let rest = &dsn[scheme_end + 3..];
    let Some(at) = rest.find('@') else {
        return dsn.to_owned();
    };
    let creds = &rest[..at];
    match creds.find(':') {
        Some(colon) => format!(
            "{}://{}:***@{}",
            &dsn[..scheme_end],
            &creds[..colon],
            &rest[at + 1..]
        ),
        None => dsn.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_recognizes_supported_schemes() {
        assert_eq!(
            DbHandle::detect("postgres://u:p@localhost/db").unwrap(),
            DbEngine::Postgres
        );
        assert_eq!(
            DbHandle::detect("postgresql://localhost/db").unwrap(),
            DbEngine::Postgres
        );
        assert_eq!(
            DbHandle::detect("sqlite::memory:").unwrap(),
            DbEngine::Sqlite
        );
        assert_eq!(
            DbHandle::detect("sqlite://data/app.db").unwrap(),
            DbEngine::Sqlite
        );
        assert!(matches!(
            DbHandle::detect("mysql://localhost/db"),
            Err(DbError::UnknownDsn(_))
        ));
    }

    #[test]
    fn sqlite_file_path_strips_scheme_and_query() {
        assert_eq!(
            sqlite_file_path("sqlite://var/app.db?mode=rwc"),
            Some(std::path::PathBuf::from("var/app.db"))
        );
        assert_eq!(
            sqlite_file_path("sqlite:var/app.db"),
            Some(std::path::PathBuf::from("var/app.db"))
        );
        assert_eq!(sqlite_file_path("sqlite://"), None);
    }

    #[test]
    fn memory_dsns_are_detected() {
        assert!(is_memory_dsn("sqlite::memory:"));
        assert!(is_memory_dsn("sqlite://file.db?mode=memory"));
        assert!(!is_memory_dsn("sqlite://data/app.db"));
    }

    #[test]
    fn redaction_hides_passwords_only() {
        assert_eq!(
            redact_credentials_in_dsn("postgres://app:secret@db/prod"),
            "postgres://app:***@db/prod"
        );
        assert_eq!(
            redact_credentials_in_dsn("postgres://db/prod"),
            "postgres://db/prod"
        );
        assert_eq!(redact_credentials_in_dsn("sqlite::memory:"), "sqlite::memory:");
    }

    #[tokio::test]
    async fn connect_and_ping_in_memory_sqlite() {
        let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
            .await
            .unwrap();
        assert_eq!(db.engine(), DbEngine::Sqlite);
        assert_eq!(db.dsn(), "sqlite::memory:");
        db.ping().await.unwrap();
        db.close().await.unwrap();
    }
}
