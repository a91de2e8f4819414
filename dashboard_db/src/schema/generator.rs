//! Migration generator
//!
//! Renders DDL statements for a [`SchemaDiff`] in the configured dialect.

use crate::config::{Dialect, MigrationConfig};
use crate::error::{Error, Result};
use crate::schema::diff::{ColumnChange, SchemaDiff};
use crate::schema::types::{Column, ColumnType, Generated, Table};
use crate::utils::naming::quote_identifier;

/// Migration SQL generator
pub struct MigrationGenerator<'a> {
    config: &'a MigrationConfig,
}

impl<'a> MigrationGenerator<'a> {
    /// Create a new migration generator
    pub fn new(config: &'a MigrationConfig) -> Self {
        Self { config }
    }

    fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Generate migration SQL from a schema diff
    ///
    /// One entry per affected table; an entry may hold several statements.
    pub fn generate_migration_sql(&self, diff: &SchemaDiff) -> Result<Vec<String>> {
        let mut migrations = Vec::new();

        for table in &diff.tables_to_create {
            migrations.push(self.create_table_sql(table));
        }

        for table_name in &diff.tables_to_drop {
            migrations.push(format!("DROP TABLE IF EXISTS {};\n", quote_identifier(table_name)));
        }

        for (table_name, columns) in &diff.columns_to_add {
            migrations.push(self.add_columns_sql(table_name, columns)?);
        }

        for (table_name, column_names) in &diff.columns_to_drop {
            migrations.push(self.drop_columns_sql(table_name, column_names));
        }

        for (table_name, changes) in &diff.columns_to_alter {
            migrations.push(self.alter_columns_sql(table_name, changes)?);
        }

        Ok(migrations)
    }

    /// Generate SQL to create a table
    pub fn create_table_sql(&self, table: &Table) -> String {
        match self.dialect() {
            Dialect::Postgresql => self.postgres_create_table_sql(table),
            Dialect::Sqlite => self.sqlite_create_table_sql(table),
        }
    }

    fn postgres_create_table_sql(&self, table: &Table) -> String {
        let inline_pk = table.has_single_column_primary_key();

        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|column| format!("\t{}", self.column_definition(column, inline_pk)))
            .collect();

        if let Some(pk) = table.primary_key.as_ref().filter(|_| !inline_pk) {
            definitions.push(format!(
                "\tCONSTRAINT {} PRIMARY KEY({})",
                quote_identifier(pk.name.as_deref().unwrap_or(&format!("{}_pkey", table.name))),
                quote_list(&pk.columns)
            ));
        }

        for column in table.unique_columns() {
            definitions.push(format!(
                "\tCONSTRAINT {} UNIQUE({})",
                quote_identifier(&table.unique_constraint_name(&column.name)),
                quote_identifier(&column.name)
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
            quote_identifier(&table.name),
            definitions.join(",\n")
        )
    }

    fn sqlite_create_table_sql(&self, table: &Table) -> String {
        let inline_pk = table.has_single_column_primary_key();

        let mut definitions: Vec<String> = table
            .columns
            .iter()
            .map(|column| format!("\t{}", self.column_definition(column, inline_pk)))
            .collect();

        if let Some(pk) = table.primary_key.as_ref().filter(|_| !inline_pk) {
            definitions.push(format!("\tPRIMARY KEY({})", quote_list(&pk.columns)));
        }

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);\n",
            quote_identifier(&table.name),
            definitions.join(",\n")
        );

        for column in table.unique_columns() {
            sql.push_str(&self.sqlite_unique_index_sql(table, &column.name));
        }

        sql
    }

    fn sqlite_unique_index_sql(&self, table: &Table, column: &str) -> String {
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({});\n",
            quote_identifier(&table.unique_constraint_name(column)),
            quote_identifier(&table.name),
            quote_identifier(column)
        )
    }

    /// Render a column definition
    ///
    /// `inline_pk` places `PRIMARY KEY` on the column itself, which only
    /// applies to single-column keys.
    pub fn column_definition(&self, column: &Column, inline_pk: bool) -> String {
        let inline_pk = inline_pk && column.primary_key;
        let mut parts = vec![quote_identifier(&column.name), self.type_sql(&column.data_type)];

        if inline_pk {
            parts.push("PRIMARY KEY".to_string());
        }

        match (self.dialect(), column.generated) {
            (Dialect::Postgresql, Some(Generated::AlwaysAsIdentity)) => {
                parts.push("GENERATED ALWAYS AS IDENTITY".to_string())
            }
            (Dialect::Postgresql, Some(Generated::ByDefaultAsIdentity)) => {
                parts.push("GENERATED BY DEFAULT AS IDENTITY".to_string())
            }
            (Dialect::Sqlite, Some(_)) if inline_pk => parts.push("AUTOINCREMENT".to_string()),
            _ => {}
        }

        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {}", default));
        }

        // postgres implies NOT NULL for an inline primary key
        let implied_not_null = inline_pk && self.dialect() == Dialect::Postgresql;
        if !column.nullable && !implied_not_null {
            parts.push("NOT NULL".to_string());
        }

        parts.join(" ")
    }

    /// SQL type name in the configured dialect
    pub fn type_sql(&self, data_type: &ColumnType) -> String {
        match self.dialect() {
            Dialect::Postgresql => data_type.to_string(),
            Dialect::Sqlite => match data_type {
                ColumnType::SmallInt
                | ColumnType::Integer
                | ColumnType::BigInt
                | ColumnType::Boolean => "integer".to_string(),
                ColumnType::Real | ColumnType::DoublePrecision => "real".to_string(),
                ColumnType::Text => "text".to_string(),
                ColumnType::Varchar { length } => format!("text({})", length),
            },
        }
    }

    fn add_columns_sql(&self, table_name: &str, columns: &[Column]) -> Result<String> {
        let table = quote_identifier(table_name);
        let mut sql = String::new();

        for column in columns {
            if column.primary_key {
                return Err(Error::MigrationError(format!(
                    "Cannot add primary key column {}.{} to an existing table",
                    table_name, column.name
                )));
            }

            let keyword = match self.dialect() {
                Dialect::Postgresql => "ADD COLUMN",
                Dialect::Sqlite => "ADD",
            };
            sql.push_str(&format!(
                "ALTER TABLE {} {} {};\n",
                table,
                keyword,
                self.column_definition(column, false)
            ));

            if column.is_unique {
                sql.push_str(&self.add_unique_sql(table_name, &column.name));
            }
        }

        Ok(sql)
    }

    fn add_unique_sql(&self, table_name: &str, column: &str) -> String {
        let constraint = Table::new(table_name).unique_constraint_name(column);
        match self.dialect() {
            Dialect::Postgresql => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE({});\n",
                quote_identifier(table_name),
                quote_identifier(&constraint),
                quote_identifier(column)
            ),
            Dialect::Sqlite => self.sqlite_unique_index_sql(&Table::new(table_name), column),
        }
    }

    fn drop_columns_sql(&self, table_name: &str, column_names: &[String]) -> String {
        column_names
            .iter()
            .map(|column| {
                format!(
                    "ALTER TABLE {} DROP COLUMN {};\n",
                    quote_identifier(table_name),
                    quote_identifier(column)
                )
            })
            .collect()
    }

    fn alter_columns_sql(&self, table_name: &str, changes: &[ColumnChange]) -> Result<String> {
        if self.dialect() == Dialect::Sqlite {
            let columns: Vec<&str> = changes.iter().map(|c| c.column_name.as_str()).collect();
            return Err(Error::MigrationError(format!(
                "SQLite cannot alter columns in place ({}.{})",
                table_name,
                columns.join(", ")
            )));
        }

        let table = quote_identifier(table_name);
        let mut sql = String::new();

        for change in changes {
            let column = quote_identifier(&change.column_name);
            let (from, to) = (&change.from, &change.to);

            if from.primary_key != to.primary_key || from.generated != to.generated {
                return Err(Error::MigrationError(format!(
                    "Changing the primary key or identity of {}.{} is not supported",
                    table_name, change.column_name
                )));
            }

            if from.data_type != to.data_type {
                sql.push_str(&format!(
                    "ALTER TABLE {} ALTER COLUMN {} SET DATA TYPE {};\n",
                    table,
                    column,
                    self.type_sql(&to.data_type)
                ));
            }

            if from.nullable != to.nullable {
                let action = if to.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
                sql.push_str(&format!("ALTER TABLE {} ALTER COLUMN {} {};\n", table, column, action));
            }

            if from.default != to.default {
                match &to.default {
                    Some(default) => sql.push_str(&format!(
                        "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {};\n",
                        table, column, default
                    )),
                    None => sql.push_str(&format!(
                        "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT;\n",
                        table, column
                    )),
                }
            }

            if from.is_unique != to.is_unique {
                if to.is_unique {
                    sql.push_str(&self.add_unique_sql(table_name, &change.column_name));
                } else {
                    let constraint = Table::new(table_name).unique_constraint_name(&change.column_name);
                    sql.push_str(&format!(
                        "ALTER TABLE {} DROP CONSTRAINT {};\n",
                        table,
                        quote_identifier(&constraint)
                    ));
                }
            }
        }

        Ok(sql)
    }
}

fn quote_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ")
}
