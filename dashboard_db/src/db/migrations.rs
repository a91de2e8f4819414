//! Migration management
//!
//! Generated migrations are plain `{version}_{name}.sql` files in the `out`
//! directory, the layout `sqlx::migrate::Migrator` reads. Each one is paired with
//! a schema snapshot under `out/meta` that the next diff starts from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::migrate::Migrator;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Dialect, MigrationConfig};
use crate::db::connection::{DatabaseClient, DatabasePool};
use crate::error::{Error, Result};
use crate::schema::types::DatabaseSchema;
use crate::utils::naming::format_file_name;

const META_DIR: &str = "meta";
const SNAPSHOT_SUFFIX: &str = "_snapshot.json";

/// Schema state recorded alongside a generated migration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: String,
    pub dialect: Dialect,
    pub schema_source: PathBuf,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub schema: DatabaseSchema,
}

/// Files written for one generated migration
#[derive(Debug, Clone)]
pub struct GeneratedMigration {
    pub version: String,
    pub path: PathBuf,
    pub snapshot_path: PathBuf,
}

/// List migration files in `out`, oldest first
pub fn migration_files(out: &Path) -> Result<Vec<PathBuf>> {
    if !out.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(out)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "sql"))
        .collect();

    files.sort();
    Ok(files)
}

/// Load the most recent snapshot, if any migration has been generated
pub fn latest_snapshot(out: &Path) -> Result<Option<Snapshot>> {
    let meta_dir = out.join(META_DIR);
    if !meta_dir.exists() {
        return Ok(None);
    }

    let mut snapshots: Vec<PathBuf> = fs::read_dir(&meta_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.ends_with(SNAPSHOT_SUFFIX))
        })
        .collect();

    snapshots.sort();

    match snapshots.last() {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(Some(serde_json::from_str(&content)?))
        }
        None => Ok(None),
    }
}

/// Write a migration file and the snapshot of `schema` it produces
pub fn write_migration(
    config: &MigrationConfig,
    name: &str,
    statements: &[String],
    schema: &DatabaseSchema,
) -> Result<GeneratedMigration> {
    if statements.is_empty() {
        return Err(Error::MigrationError("Refusing to write an empty migration".to_string()));
    }

    let meta_dir = config.out.join(META_DIR);
    fs::create_dir_all(&meta_dir)?;

    let sequence = migration_files(&config.out)?.len();
    let version = generate_migration_version(sequence);

    let name = match format_file_name(name) {
        sanitized if sanitized.is_empty() => "migration".to_string(),
        sanitized => sanitized,
    };

    let sql = statements.join("\n");
    let path = config.out.join(format!("{}_{}.sql", version, name));
    fs::write(&path, &sql)?;

    let snapshot = Snapshot {
        version: version.clone(),
        dialect: config.dialect,
        schema_source: config.schema.clone(),
        checksum: format!("{:x}", md5::compute(sql.as_bytes())),
        created_at: Utc::now(),
        schema: schema.clone(),
    };
    let snapshot_path = meta_dir.join(format!("{}{}", version, SNAPSHOT_SUFFIX));
    fs::write(&snapshot_path, serde_json::to_string_pretty(&snapshot)?)?;

    tracing::info!(
        version = %version,
        path = %path.display(),
        statements = statements.len(),
        "Generated migration"
    );

    Ok(GeneratedMigration {
        version,
        path,
        snapshot_path,
    })
}

/// Apply pending migrations from `config.out` through sqlx's migrator
///
/// Returns the number of migration files found.
pub async fn apply_migrations(client: &DatabaseClient, config: &MigrationConfig) -> Result<usize> {
    if !config.out.exists() {
        return Err(Error::MigrationError(format!(
            "Migrations directory does not exist: {}",
            config.out.display()
        )));
    }

    let migrator = Migrator::new(config.out.clone()).await?;
    let available = migrator.iter().count();

    tracing::info!(
        directory = %config.out.display(),
        migrations = available,
        "Applying migrations"
    );

    match client.pool().await? {
        DatabasePool::Postgres(pool) => migrator.run(pool).await?,
        DatabasePool::Sqlite(pool) => migrator.run(pool).await?,
    }

    tracing::info!("Migrations applied successfully");
    Ok(available)
}

/// Migration version: UTC timestamp followed by a 4-digit sequence number
fn generate_migration_version(sequence: usize) -> String {
    let now = Utc::now();
    format!("{}{:04}", now.format("%Y%m%d%H%M%S"), sequence)
}
