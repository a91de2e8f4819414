//! Database connection handling
//!
//! The client factory turns the raw `DATABASE_URL` value into a
//! [`DatabaseClient`]. Construction is synchronous and infallible; the sqlx pool
//! is opened on first use, which is where a missing or malformed connection
//! string surfaces.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{
    postgres::PgPoolOptions, sqlite::SqlitePoolOptions, Pool, Postgres, Sqlite,
};
use tokio::sync::OnceCell;

use crate::config::{redact_url, Config, DatabaseConfig, Dialect, EnvSource, DATABASE_URL_ENV};
use crate::error::{Error, Result};

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Builds client handles from a connection string
pub trait ClientFactory {
    type Client;

    /// Create a client bound to `connection_string`, exactly as given
    fn create(&self, connection_string: Option<String>) -> Self::Client;
}

/// Read `DATABASE_URL` from `env` and hand it to `factory` unchanged
pub fn create_client<F, E>(factory: &F, env: &E) -> F::Client
where
    F: ClientFactory + ?Sized,
    E: EnvSource + ?Sized,
{
    let connection_string = env.var(DATABASE_URL_ENV);

    tracing::debug!(
        present = connection_string.is_some(),
        empty = connection_string.as_deref().map_or(false, str::is_empty),
        "Creating database client"
    );

    factory.create(connection_string)
}

/// Factory producing sqlx-backed clients
#[derive(Debug, Clone, Default)]
pub struct SqlxClientFactory {
    dialect: Dialect,
    options: DatabaseConfig,
}

impl SqlxClientFactory {
    pub fn new(dialect: Dialect, options: DatabaseConfig) -> Self {
        Self { dialect, options }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.migrations.dialect, config.database.clone())
    }
}

impl ClientFactory for SqlxClientFactory {
    type Client = DatabaseClient;

    fn create(&self, connection_string: Option<String>) -> DatabaseClient {
        DatabaseClient::new(connection_string, self.dialect, self.options.clone())
    }
}

/// Pool of whichever backend the client talks to
#[derive(Debug, Clone)]
pub enum DatabasePool {
    Postgres(Pool<Postgres>),
    Sqlite(Pool<Sqlite>),
}

/// Database client handle
///
/// Cheap to clone; clones share the same lazily opened pool.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    connection_string: Option<String>,
    dialect: Dialect,
    options: DatabaseConfig,
    pool: OnceCell<DatabasePool>,
}

impl DatabaseClient {
    /// Create a client bound to `connection_string` without connecting
    pub fn new(connection_string: Option<String>, dialect: Dialect, options: DatabaseConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                connection_string,
                dialect,
                options,
                pool: OnceCell::new(),
            }),
        }
    }

    /// The connection string this client was created with
    pub fn connection_string(&self) -> Option<&str> {
        self.inner.connection_string.as_deref()
    }

    pub fn dialect(&self) -> Dialect {
        self.inner.dialect
    }

    /// Whether the pool has been opened
    pub fn is_connected(&self) -> bool {
        self.inner.pool.initialized()
    }

    /// Get the pool, opening it on first use
    pub async fn pool(&self) -> Result<&DatabasePool> {
        self.inner.pool.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<DatabasePool> {
        let url = self
            .inner
            .connection_string
            .as_deref()
            .ok_or(Error::MissingConnectionString)?;

        let pool_size = self.inner.options.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        let timeout =
            Duration::from_secs(self.inner.options.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));

        tracing::info!(
            dialect = %self.inner.dialect,
            url = %redact_url(url),
            pool_size,
            "Opening database pool"
        );

        match self.inner.dialect {
            Dialect::Postgresql => {
                let pool = PgPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(url)
                    .await?;

                Ok(DatabasePool::Postgres(pool))
            }
            Dialect::Sqlite => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(url)
                    .await?;

                Ok(DatabasePool::Sqlite(pool))
            }
        }
    }

    /// Execute a raw SQL statement, returning the number of affected rows
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let rows = match self.pool().await? {
            DatabasePool::Postgres(pool) => sqlx::query(sql).execute(pool).await?.rows_affected(),
            DatabasePool::Sqlite(pool) => sqlx::query(sql).execute(pool).await?.rows_affected(),
        };

        Ok(rows)
    }

    /// Close the pool if it was opened
    pub async fn close(&self) {
        match self.inner.pool.get() {
            Some(DatabasePool::Postgres(pool)) => pool.close().await,
            Some(DatabasePool::Sqlite(pool)) => pool.close().await,
            None => {}
        }
    }
}
