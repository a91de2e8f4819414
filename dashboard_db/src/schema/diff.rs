//! Schema difference calculator
//!
//! Compares the last generated snapshot with the declared schema.

use std::collections::{BTreeMap, HashMap};

use crate::config::MigrationConfig;
use crate::schema::types::{Column, DatabaseSchema, Table};

/// Represents changes needed to move from one schema to another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    pub tables_to_create: Vec<Table>,
    pub tables_to_drop: Vec<String>,
    pub columns_to_add: BTreeMap<String, Vec<Column>>,
    pub columns_to_drop: BTreeMap<String, Vec<String>>,
    pub columns_to_alter: BTreeMap<String, Vec<ColumnChange>>,
}

/// Represents a column change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChange {
    pub column_name: String,
    pub from: Column,
    pub to: Column,
}

impl SchemaDiff {
    /// Generate a schema diff between two database schemas
    pub fn generate(
        current_schema: &DatabaseSchema,
        target_schema: &DatabaseSchema,
        config: &MigrationConfig,
    ) -> Self {
        let tables_to_create = target_schema
            .tables
            .values()
            .filter(|table| !current_schema.tables.contains_key(&table.name))
            .cloned()
            .collect();

        let tables_to_drop = if config.allow_table_removal {
            current_schema
                .tables
                .keys()
                .filter(|&name| !target_schema.tables.contains_key(name))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let mut columns_to_add = BTreeMap::new();
        let mut columns_to_drop = BTreeMap::new();
        let mut columns_to_alter = BTreeMap::new();

        for (table_name, target_table) in &target_schema.tables {
            let Some(current_table) = current_schema.tables.get(table_name) else {
                continue;
            };

            let current_columns: HashMap<&str, &Column> = current_table
                .columns
                .iter()
                .map(|col| (col.name.as_str(), col))
                .collect();

            let target_columns: HashMap<&str, &Column> = target_table
                .columns
                .iter()
                .map(|col| (col.name.as_str(), col))
                .collect();

            let add_columns: Vec<Column> = target_table
                .columns
                .iter()
                .filter(|col| !current_columns.contains_key(col.name.as_str()))
                .cloned()
                .collect();

            if !add_columns.is_empty() {
                columns_to_add.insert(table_name.clone(), add_columns);
            }

            if config.allow_column_removal {
                let drop_columns: Vec<String> = current_table
                    .columns
                    .iter()
                    .filter(|col| !target_columns.contains_key(col.name.as_str()))
                    .map(|col| col.name.clone())
                    .collect();

                if !drop_columns.is_empty() {
                    columns_to_drop.insert(table_name.clone(), drop_columns);
                }
            }

            let alter_columns: Vec<ColumnChange> = target_table
                .columns
                .iter()
                .filter_map(|target_col| {
                    let current_col = current_columns.get(target_col.name.as_str())?;
                    Self::column_needs_alteration(current_col, target_col).then(|| ColumnChange {
                        column_name: target_col.name.clone(),
                        from: (*current_col).clone(),
                        to: target_col.clone(),
                    })
                })
                .collect();

            if !alter_columns.is_empty() {
                columns_to_alter.insert(table_name.clone(), alter_columns);
            }
        }

        Self {
            tables_to_create,
            tables_to_drop,
            columns_to_add,
            columns_to_drop,
            columns_to_alter,
        }
    }

    /// Check if a column needs to be altered
    fn column_needs_alteration(current: &Column, target: &Column) -> bool {
        current.data_type != target.data_type
            || current.nullable != target.nullable
            || current.default != target.default
            || current.is_unique != target.is_unique
            || current.generated != target.generated
            || current.primary_key != target.primary_key
    }

    /// Check if the diff is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.tables_to_create.is_empty()
            && self.tables_to_drop.is_empty()
            && self.columns_to_add.is_empty()
            && self.columns_to_drop.is_empty()
            && self.columns_to_alter.is_empty()
    }
}
