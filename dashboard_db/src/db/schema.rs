//! Users table

use serde::{Deserialize, Serialize};

use crate::schema::{DatabaseSchema, Table as TableDescriptor, TableModel};
use crate::Table;

/// A row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, Table)]
#[table(name = "users")]
pub struct User {
    #[column(primary_key, identity)]
    pub id: i32,
    #[column(length = 255)]
    pub name: String,
    pub age: i32,
    #[column(length = 255, unique)]
    pub email: String,
}

/// Values for inserting or replacing a user; the id is assigned by the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub age: i32,
    pub email: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>, age: i32, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            email: email.into(),
        }
    }
}

/// The `users` table descriptor
pub fn users() -> &'static TableDescriptor {
    User::table()
}

/// Every table declared by this crate
pub fn declared_schema() -> DatabaseSchema {
    DatabaseSchema::from_tables([users()])
}
