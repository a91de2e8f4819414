//! dashboard_db: the users schema, database client and migrations behind the dashboard
//!
//! The `users` table is declared once as a Rust struct (`db::schema::User`). From
//! that descriptor the crate renders DDL, writes migration files that sqlx can
//! apply, and builds the queries of the `UserStore`. The connection string comes
//! from `DATABASE_URL` and is handed to the client untouched.

extern crate self as dashboard_db;

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::{Config, Dialect, MigrationConfig};
pub use dashboard_db_macros::Table;
pub use db::connection::{ClientFactory, DatabaseClient, SqlxClientFactory};
pub use db::schema::{declared_schema, users, NewUser, User};
pub use db::users::UserStore;
pub use error::{Error, Result};
pub use schema::{MigrationGenerator, SchemaDiff, TableModel};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}

use db::migrations::{self, GeneratedMigration, Snapshot};
use schema::DatabaseSchema;

/// Initialize from a configuration file, with credentials from the process environment
pub fn init(config_path: &str) -> Result<DashboardDb> {
    let config = config::load_from_file(config_path, &config::ProcessEnv)?;
    Ok(DashboardDb::new(config))
}

/// Configuration plus the client built from it
pub struct DashboardDb {
    config: Config,
    client: DatabaseClient,
}

impl DashboardDb {
    /// Build the client from the configured credentials; nothing connects yet
    pub fn new(config: Config) -> Self {
        let factory = SqlxClientFactory::from_config(&config);
        let client = factory.create(config.migrations.db_credentials.url.clone());

        Self { config, client }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &DatabaseClient {
        &self.client
    }

    /// Diff between the last generated snapshot and the declared schema
    pub fn schema_diff(&self) -> Result<SchemaDiff> {
        let snapshot = migrations::latest_snapshot(&self.config.migrations.out)?;
        Ok(self.diff_against(snapshot.as_ref()))
    }

    /// Generate a migration for pending schema changes
    ///
    /// Returns `None` when the declared schema matches the last snapshot.
    pub fn generate_migration(&self, name: Option<&str>) -> Result<Option<GeneratedMigration>> {
        let migrations_config = &self.config.migrations;
        let snapshot = migrations::latest_snapshot(&migrations_config.out)?;
        let diff = self.diff_against(snapshot.as_ref());

        if diff.is_empty() {
            tracing::info!("Schema is in sync with the last generated migration");
            return Ok(None);
        }

        let statements = MigrationGenerator::new(migrations_config).generate_migration_sql(&diff)?;
        let name = name.unwrap_or(if snapshot.is_some() { "schema_update" } else { "init" });

        migrations::write_migration(migrations_config, name, &statements, &declared_schema()).map(Some)
    }

    fn diff_against(&self, snapshot: Option<&Snapshot>) -> SchemaDiff {
        let empty = DatabaseSchema::new();
        let current = snapshot.map_or(&empty, |snapshot| &snapshot.schema);

        SchemaDiff::generate(current, &declared_schema(), &self.config.migrations)
    }

    /// Apply generated migrations to the database
    pub async fn apply_migrations(&self) -> Result<usize> {
        migrations::apply_migrations(&self.client, &self.config.migrations).await
    }
}
