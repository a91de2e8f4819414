//! End-to-end tests: generate migrations, apply them to SQLite, use the store

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use dashboard_db::config::{Config, DatabaseConfig, DbCredentials, Dialect, MigrationConfig};
use dashboard_db::db::migrations;
use dashboard_db::schema::DatabaseSchema;
use dashboard_db::{declared_schema, DashboardDb, Error, NewUser, UserStore};

fn sqlite_app(out: &Path) -> DashboardDb {
    DashboardDb::new(Config {
        migrations: MigrationConfig {
            out: out.to_path_buf(),
            dialect: Dialect::Sqlite,
            db_credentials: DbCredentials {
                url: Some("sqlite::memory:".to_string()),
            },
            ..MigrationConfig::default()
        },
        database: DatabaseConfig {
            pool_size: Some(1),
            timeout_seconds: Some(5),
        },
        logging: None,
    })
}

#[test]
fn test_generate_writes_migration_and_snapshot() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("drizzle");
    let app = sqlite_app(&out);

    let generated = app.generate_migration(None).unwrap().expect("initial migration");

    assert!(generated.path.exists());
    assert!(generated.snapshot_path.exists());
    let file_name = generated.path.file_name().unwrap().to_str().unwrap().to_string();
    assert_eq!(file_name, format!("{}_init.sql", generated.version));

    let sql = fs::read_to_string(&generated.path).unwrap();
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"users\""));

    let snapshot = migrations::latest_snapshot(&out).unwrap().unwrap();
    assert_eq!(snapshot.version, generated.version);
    assert_eq!(snapshot.dialect, Dialect::Sqlite);
    assert_eq!(snapshot.schema, declared_schema());
    assert_eq!(snapshot.checksum, format!("{:x}", md5::compute(sql.as_bytes())));
}

#[test]
fn test_generate_is_idempotent_without_changes() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("drizzle");
    let app = sqlite_app(&out);

    assert!(app.generate_migration(Some("init")).unwrap().is_some());
    assert!(app.schema_diff().unwrap().is_empty());
    assert!(app.generate_migration(Some("again")).unwrap().is_none());

    assert_eq!(migrations::migration_files(&out).unwrap().len(), 1);
}

#[test]
fn test_generate_after_history_diffs_from_latest_snapshot() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("drizzle");
    let app = sqlite_app(&out);

    let bootstrap = migrations::write_migration(
        &app.config().migrations,
        "bootstrap",
        &["SELECT 1;".to_string()],
        &DatabaseSchema::new(),
    )
    .unwrap();

    let generated = app.generate_migration(None).unwrap().expect("users table is pending");
    let file_name = generated.path.file_name().unwrap().to_str().unwrap().to_string();
    assert_eq!(file_name, format!("{}_schema_update.sql", generated.version));
    assert!(generated.version > bootstrap.version);

    let sql = fs::read_to_string(&generated.path).unwrap();
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"users\""));
    assert!(app.schema_diff().unwrap().is_empty());
}

#[test]
fn test_write_migration_rejects_empty_statements() {
    let dir = tempdir().unwrap();
    let config = MigrationConfig {
        out: dir.path().to_path_buf(),
        ..MigrationConfig::default()
    };

    let result = migrations::write_migration(&config, "noop", &[], &declared_schema());
    assert!(matches!(result, Err(Error::MigrationError(_))));
}

#[tokio::test]
async fn test_apply_requires_generated_migrations() {
    let dir = tempdir().unwrap();
    let app = sqlite_app(&dir.path().join("missing"));

    let result = app.apply_migrations().await;
    assert!(matches!(result, Err(Error::MigrationError(_))));
}

#[tokio::test]
async fn test_apply_and_use_store() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("drizzle");
    let app = sqlite_app(&out);

    app.generate_migration(None).unwrap();
    assert_eq!(app.apply_migrations().await.unwrap(), 1);
    // applying again is a no-op
    assert_eq!(app.apply_migrations().await.unwrap(), 1);

    let store = app.client();

    let ada = store
        .create_user(&NewUser::new("Ada", 36, "ada@example.com"))
        .await
        .unwrap();
    let alan = store
        .create_user(&NewUser::new("Alan", 41, "alan@example.com"))
        .await
        .unwrap();

    assert!(alan.id > ada.id);
    assert_eq!(ada.name, "Ada");
    assert_eq!(ada.age, 36);

    assert_eq!(store.get_user(ada.id).await.unwrap(), Some(ada.clone()));
    assert_eq!(
        store.find_user_by_email("alan@example.com").await.unwrap(),
        Some(alan.clone())
    );
    assert_eq!(store.find_user_by_email("nobody@example.com").await.unwrap(), None);
    assert_eq!(store.list_users().await.unwrap(), vec![ada.clone(), alan.clone()]);

    let updated = store
        .update_user(ada.id, &NewUser::new("Ada Lovelace", 37, "ada@example.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, ada.id);
    assert_eq!(updated.name, "Ada Lovelace");
    assert_eq!(updated.age, 37);

    assert_eq!(
        store
            .update_user(9999, &NewUser::new("Ghost", 1, "ghost@example.com"))
            .await
            .unwrap(),
        None
    );

    assert!(store.delete_user(alan.id).await.unwrap());
    assert!(!store.delete_user(alan.id).await.unwrap());
    assert_eq!(store.list_users().await.unwrap(), vec![updated]);

    store.close().await;
}

#[tokio::test]
async fn test_duplicate_email_is_a_unique_violation() {
    let dir = tempdir().unwrap();
    let app = sqlite_app(&dir.path().join("drizzle"));

    app.generate_migration(None).unwrap();
    app.apply_migrations().await.unwrap();

    let store = app.client();
    store
        .create_user(&NewUser::new("Grace", 85, "grace@example.com"))
        .await
        .unwrap();

    let duplicate = store
        .create_user(&NewUser::new("Other Grace", 30, "grace@example.com"))
        .await;

    assert!(matches!(duplicate, Err(Error::UniqueViolation(_))));
    assert_eq!(store.list_users().await.unwrap().len(), 1);
}
