//! User data access
//!
//! Statements are rendered from the `users` descriptor so the column list and
//! table name have a single source.

use async_trait::async_trait;

use crate::config::Dialect;
use crate::db::connection::{DatabaseClient, DatabasePool};
use crate::db::schema::{users, NewUser, User};
use crate::error::{Error, Result};
use crate::utils::naming::quote_identifier;

/// Storage operations on the `users` table
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user and return it with its assigned id
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn get_user(&self, id: i32) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users ordered by id
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Replace the values of an existing user; `None` when no row has that id
    async fn update_user(&self, id: i32, user: &NewUser) -> Result<Option<User>>;

    /// Delete a user, returning whether a row was removed
    async fn delete_user(&self, id: i32) -> Result<bool>;
}

/// SQL statements for the `users` table in one dialect
struct UserQueries {
    dialect: Dialect,
    table: String,
    select_columns: String,
    key: String,
    email: String,
}

impl UserQueries {
    fn new(dialect: Dialect) -> Self {
        let table = users();
        let select_columns = table
            .column_names()
            .into_iter()
            .map(quote_identifier)
            .collect::<Vec<_>>()
            .join(", ");

        let key = table
            .primary_key
            .as_ref()
            .and_then(|pk| pk.columns.first())
            .map(|name| quote_identifier(name))
            .unwrap_or_else(|| quote_identifier("id"));

        Self {
            dialect,
            table: quote_identifier(&table.name),
            select_columns,
            key,
            email: quote_identifier("email"),
        }
    }

    fn insert(&self) -> String {
        let columns = users().insertable_columns();
        let names = columns
            .iter()
            .map(|column| quote_identifier(&column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let values = (1..=columns.len())
            .map(|i| self.dialect.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            self.table, names, values, self.select_columns
        )
    }

    fn select_by(&self, column: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.select_columns,
            self.table,
            column,
            self.dialect.placeholder(1)
        )
    }

    fn select_all(&self) -> String {
        format!(
            "SELECT {} FROM {} ORDER BY {}",
            self.select_columns, self.table, self.key
        )
    }

    fn update(&self) -> String {
        let columns = users().insertable_columns();
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                format!("{} = {}", quote_identifier(&column.name), self.dialect.placeholder(i + 1))
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
            self.table,
            assignments,
            self.key,
            self.dialect.placeholder(columns.len() + 1),
            self.select_columns
        )
    }

    fn delete(&self) -> String {
        format!(
            "DELETE FROM {} WHERE {} = {}",
            self.table,
            self.key,
            self.dialect.placeholder(1)
        )
    }
}

/// Map constraint violations to `UniqueViolation`, everything else passes through
fn map_write_error(error: sqlx::Error) -> Error {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            Error::UniqueViolation(db_error.message().to_string())
        }
        _ => Error::SqlxError(error),
    }
}

#[async_trait]
impl UserStore for DatabaseClient {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let sql = UserQueries::new(self.dialect()).insert();

        let result = match self.pool().await? {
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, User>(&sql)
                    .bind(user.name.as_str())
                    .bind(user.age)
                    .bind(user.email.as_str())
                    .fetch_one(pool)
                    .await
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, User>(&sql)
                    .bind(user.name.as_str())
                    .bind(user.age)
                    .bind(user.email.as_str())
                    .fetch_one(pool)
                    .await
            }
        };

        let created = result.map_err(map_write_error)?;
        tracing::debug!(user_id = created.id, "Created user");
        Ok(created)
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>> {
        let queries = UserQueries::new(self.dialect());
        let sql = queries.select_by(&queries.key);

        let user = match self.pool().await? {
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(pool).await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(pool).await?
            }
        };

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let queries = UserQueries::new(self.dialect());
        let sql = queries.select_by(&queries.email);

        let user = match self.pool().await? {
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(pool).await?
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(pool).await?
            }
        };

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let sql = UserQueries::new(self.dialect()).select_all();

        let users = match self.pool().await? {
            DatabasePool::Postgres(pool) => sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?,
            DatabasePool::Sqlite(pool) => sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?,
        };

        Ok(users)
    }

    async fn update_user(&self, id: i32, user: &NewUser) -> Result<Option<User>> {
        let sql = UserQueries::new(self.dialect()).update();

        let result = match self.pool().await? {
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, User>(&sql)
                    .bind(user.name.as_str())
                    .bind(user.age)
                    .bind(user.email.as_str())
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, User>(&sql)
                    .bind(user.name.as_str())
                    .bind(user.age)
                    .bind(user.email.as_str())
                    .bind(id)
                    .fetch_optional(pool)
                    .await
            }
        };

        result.map_err(map_write_error)
    }

    async fn delete_user(&self, id: i32) -> Result<bool> {
        let sql = UserQueries::new(self.dialect()).delete();

        let rows = match self.pool().await? {
            DatabasePool::Postgres(pool) => {
                sqlx::query(&sql).bind(id).execute(pool).await?.rows_affected()
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query(&sql).bind(id).execute(pool).await?.rows_affected()
            }
        };

        tracing::debug!(user_id = id, deleted = rows > 0, "Deleted user");
        Ok(rows > 0)
    }
}
