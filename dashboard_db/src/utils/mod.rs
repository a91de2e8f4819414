//! Utilities
//!
//! Naming helpers and logging setup shared across the crate.

pub mod logging;
pub mod naming;

pub use naming::{format_name, get_constraint_name, get_table_name, quote_identifier};
