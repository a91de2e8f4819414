//! Database module
//!
//! Connections, the users table and its data access, and migration files.

pub mod connection;
pub mod migrations;
pub mod schema;
pub mod users;

// Re-export key types
pub use connection::{create_client, ClientFactory, DatabaseClient, DatabasePool, SqlxClientFactory};
pub use schema::{declared_schema, users, NewUser, User};
pub use users::UserStore;
