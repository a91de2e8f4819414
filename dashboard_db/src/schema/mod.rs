//! Schema module
//!
//! Table metadata, schema comparison and DDL generation.

pub mod diff;
pub mod generator;
pub mod types;

// Re-export key types
pub use diff::{ColumnChange, SchemaDiff};
pub use generator::MigrationGenerator;
pub use types::{
    Column, ColumnType, DatabaseSchema, Generated, PrimaryKey, Table, TableModel,
};
