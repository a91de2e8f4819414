//! Tests for schema diffs and DDL generation

use pretty_assertions::assert_eq;

use dashboard_db::config::{Dialect, MigrationConfig};
use dashboard_db::schema::{Column, ColumnType, DatabaseSchema, Table};
use dashboard_db::{declared_schema, users, Error, MigrationGenerator, SchemaDiff};

fn config(dialect: Dialect) -> MigrationConfig {
    MigrationConfig {
        dialect,
        ..MigrationConfig::default()
    }
}

fn users_with(extra: Option<Column>, drop: &[&str]) -> DatabaseSchema {
    let mut table = Table::new("users");
    for column in &users().columns {
        if !drop.contains(&column.name.as_str()) {
            table.add_column(column.clone());
        }
    }
    if let Some(column) = extra {
        table.add_column(column);
    }

    let mut schema = DatabaseSchema::new();
    schema.add_table(table.finalize());
    schema
}

#[test]
fn test_postgres_create_users() {
    let config = config(Dialect::Postgresql);
    let sql = MigrationGenerator::new(&config).create_table_sql(users());

    assert_eq!(
        sql,
        "CREATE TABLE IF NOT EXISTS \"users\" (\n\
         \t\"id\" integer PRIMARY KEY GENERATED ALWAYS AS IDENTITY,\n\
         \t\"name\" varchar(255) NOT NULL,\n\
         \t\"age\" integer NOT NULL,\n\
         \t\"email\" varchar(255) NOT NULL,\n\
         \tCONSTRAINT \"users_email_unique\" UNIQUE(\"email\")\n\
         );\n"
    );
}

#[test]
fn test_sqlite_create_users() {
    let config = config(Dialect::Sqlite);
    let sql = MigrationGenerator::new(&config).create_table_sql(users());

    assert_eq!(
        sql,
        "CREATE TABLE IF NOT EXISTS \"users\" (\n\
         \t\"id\" integer PRIMARY KEY AUTOINCREMENT NOT NULL,\n\
         \t\"name\" text(255) NOT NULL,\n\
         \t\"age\" integer NOT NULL,\n\
         \t\"email\" text(255) NOT NULL\n\
         );\n\
         CREATE UNIQUE INDEX IF NOT EXISTS \"users_email_unique\" ON \"users\" (\"email\");\n"
    );
}

#[test]
fn test_identity_by_default_column() {
    let column = Column::new("id", ColumnType::BigInt).primary_key().identity_by_default();

    let postgres = config(Dialect::Postgresql);
    assert_eq!(
        MigrationGenerator::new(&postgres).column_definition(&column, true),
        "\"id\" bigint PRIMARY KEY GENERATED BY DEFAULT AS IDENTITY"
    );

    let sqlite = config(Dialect::Sqlite);
    assert_eq!(
        MigrationGenerator::new(&sqlite).column_definition(&column, true),
        "\"id\" integer PRIMARY KEY AUTOINCREMENT NOT NULL"
    );
}

#[test]
fn test_composite_primary_key_is_a_table_constraint() {
    let mut table = Table::new("memberships");
    table.add_column(Column::new("user_id", ColumnType::Integer).primary_key());
    table.add_column(Column::new("team_id", ColumnType::Integer).primary_key());
    let table = table.finalize();

    let config = config(Dialect::Postgresql);
    let sql = MigrationGenerator::new(&config).create_table_sql(&table);

    assert!(sql.contains("\t\"user_id\" integer NOT NULL,\n"));
    assert!(sql.contains("CONSTRAINT \"memberships_pkey\" PRIMARY KEY(\"user_id\", \"team_id\")"));
}

#[test]
fn test_diff_from_nothing_creates_users() {
    let config = config(Dialect::Postgresql);
    let diff = SchemaDiff::generate(&DatabaseSchema::new(), &declared_schema(), &config);

    assert_eq!(diff.tables_to_create.len(), 1);
    assert_eq!(diff.tables_to_create[0].name, "users");
    assert!(diff.columns_to_add.is_empty());

    let migrations = MigrationGenerator::new(&config).generate_migration_sql(&diff).unwrap();
    assert_eq!(migrations.len(), 1);
    assert!(migrations[0].starts_with("CREATE TABLE IF NOT EXISTS \"users\""));
}

#[test]
fn test_identical_schemas_have_empty_diff() {
    let config = config(Dialect::Postgresql);
    let diff = SchemaDiff::generate(&declared_schema(), &declared_schema(), &config);

    assert!(diff.is_empty());
}

#[test]
fn test_added_column() {
    let config = config(Dialect::Postgresql);
    let target = users_with(
        Some(Column::new("nickname", ColumnType::Varchar { length: 64 }).nullable(true).unique()),
        &[],
    );

    let diff = SchemaDiff::generate(&declared_schema(), &target, &config);
    assert_eq!(diff.columns_to_add["users"].len(), 1);

    let migrations = MigrationGenerator::new(&config).generate_migration_sql(&diff).unwrap();
    assert_eq!(
        migrations,
        vec![
            "ALTER TABLE \"users\" ADD COLUMN \"nickname\" varchar(64);\n\
             ALTER TABLE \"users\" ADD CONSTRAINT \"users_nickname_unique\" UNIQUE(\"nickname\");\n"
                .to_string()
        ]
    );
}

#[test]
fn test_removed_column_requires_permission() {
    let target = users_with(None, &["age"]);

    let diff = SchemaDiff::generate(&declared_schema(), &target, &config(Dialect::Postgresql));
    assert!(diff.is_empty());

    let permissive = MigrationConfig {
        allow_column_removal: true,
        ..config(Dialect::Postgresql)
    };
    let diff = SchemaDiff::generate(&declared_schema(), &target, &permissive);
    assert_eq!(diff.columns_to_drop["users"], vec!["age".to_string()]);

    let migrations = MigrationGenerator::new(&permissive).generate_migration_sql(&diff).unwrap();
    assert_eq!(migrations, vec!["ALTER TABLE \"users\" DROP COLUMN \"age\";\n".to_string()]);
}

#[test]
fn test_removed_table_requires_permission() {
    let config = config(Dialect::Postgresql);
    let diff = SchemaDiff::generate(&declared_schema(), &DatabaseSchema::new(), &config);
    assert!(diff.is_empty());

    let permissive = MigrationConfig {
        allow_table_removal: true,
        ..config
    };
    let diff = SchemaDiff::generate(&declared_schema(), &DatabaseSchema::new(), &permissive);
    assert_eq!(diff.tables_to_drop, vec!["users".to_string()]);
}

#[test]
fn test_altered_column_on_postgres() {
    let mut current = users().clone();
    current.columns[2] = Column::new("age", ColumnType::SmallInt).nullable(true);
    let current = DatabaseSchema::from_tables([&current]);

    let config = config(Dialect::Postgresql);
    let diff = SchemaDiff::generate(&current, &declared_schema(), &config);
    assert_eq!(diff.columns_to_alter["users"][0].column_name, "age");

    let migrations = MigrationGenerator::new(&config).generate_migration_sql(&diff).unwrap();
    assert_eq!(
        migrations,
        vec![
            "ALTER TABLE \"users\" ALTER COLUMN \"age\" SET DATA TYPE integer;\n\
             ALTER TABLE \"users\" ALTER COLUMN \"age\" SET NOT NULL;\n"
                .to_string()
        ]
    );
}

#[test]
fn test_altered_column_is_rejected_on_sqlite() {
    let mut current = users().clone();
    current.columns[3].is_unique = false;
    let current = DatabaseSchema::from_tables([&current]);

    let config = config(Dialect::Sqlite);
    let diff = SchemaDiff::generate(&current, &declared_schema(), &config);
    let result = MigrationGenerator::new(&config).generate_migration_sql(&diff);

    assert!(matches!(result, Err(Error::MigrationError(_))));
}
