//! Type definitions for database schema objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::naming;

/// Pattern used to name single-column unique constraints
pub const UNIQUE_CONSTRAINT_PATTERN: &str = "{table}_{columns}_unique";

/// Pattern used to name primary key constraints
pub const PRIMARY_KEY_PATTERN: &str = "{table}_pkey";

/// A model struct backed by a table descriptor
///
/// Implemented by `#[derive(Table)]`. The descriptor is built once and the same
/// reference is handed out on every call.
pub trait TableModel {
    /// Get the static table descriptor for this model
    fn table() -> &'static Table;
}

/// Represents a set of tables keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: BTreeMap<String, Table>,
}

impl DatabaseSchema {
    /// Create a new empty database schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from a list of table descriptors
    pub fn from_tables<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Self {
        let mut schema = Self::new();
        for table in tables {
            schema.add_table(table.clone());
        }
        schema
    }

    /// Add a table to the schema
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<PrimaryKey>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: None,
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Derive the primary key constraint from the columns flagged as primary key
    pub fn finalize(mut self) -> Self {
        let columns: Vec<String> = self
            .columns
            .iter()
            .filter(|column| column.primary_key)
            .map(|column| column.name.clone())
            .collect();

        self.primary_key = if columns.is_empty() {
            None
        } else {
            Some(PrimaryKey {
                name: Some(naming::format_name(
                    PRIMARY_KEY_PATTERN,
                    &[("table", self.name.as_str())],
                )),
                columns,
            })
        };

        self
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Columns that accept a value on insert, i.e. everything not generated by the server
    pub fn insertable_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|column| column.generated.is_none())
            .collect()
    }

    /// Columns carrying a uniqueness constraint
    pub fn unique_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|column| column.is_unique).collect()
    }

    /// Name of the unique constraint on a single column
    pub fn unique_constraint_name(&self, column: &str) -> String {
        naming::get_constraint_name(
            UNIQUE_CONSTRAINT_PATTERN,
            &self.name,
            "unique",
            &[column.to_string()],
        )
    }

    /// Whether the primary key covers exactly one column
    pub fn has_single_column_primary_key(&self) -> bool {
        self.primary_key
            .as_ref()
            .map_or(false, |pk| pk.columns.len() == 1)
    }
}

/// Logical column types understood by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Boolean,
    Text,
    Varchar { length: u32 },
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::SmallInt => write!(f, "smallint"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::BigInt => write!(f, "bigint"),
            ColumnType::Real => write!(f, "real"),
            ColumnType::DoublePrecision => write!(f, "double precision"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Varchar { length } => write!(f, "varchar({})", length),
        }
    }
}

/// How the server generates a column value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generated {
    AlwaysAsIdentity,
    ByDefaultAsIdentity,
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
    pub nullable: bool,
    pub default: Option<String>,
    pub primary_key: bool,
    pub is_unique: bool,
    pub generated: Option<Generated>,
}

impl Column {
    /// Create a new non-nullable column with the given name and type
    pub fn new(name: &str, data_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable: false,
            default: None,
            primary_key: false,
            is_unique: false,
            generated: None,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    /// Mark the column as part of the primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Add a uniqueness constraint
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Let the server assign values (`GENERATED ALWAYS AS IDENTITY`)
    pub fn identity(mut self) -> Self {
        self.generated = Some(Generated::AlwaysAsIdentity);
        self
    }

    /// Server-assigned values that inserts may override (`GENERATED BY DEFAULT AS IDENTITY`)
    pub fn identity_by_default(mut self) -> Self {
        self.generated = Some(Generated::ByDefaultAsIdentity);
        self
    }
}

/// Represents a primary key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
}
