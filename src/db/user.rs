use sqlx::sqlite::SqlitePool;

use crate::identity::Principal;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Fields for a user about to be inserted.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub display_name: Option<&'a str>,
    pub email: Option<&'a str>,
}

impl<'a> NewUser<'a> {
    pub fn named(username: &'a str) -> Self {
        Self {
            username,
            display_name: None,
            email: None,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    display_name: Option<String>,
    email: Option<String>,
}

impl From<UserRow> for Principal {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            display_name: row.display_name,
            email: row.email,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO users (username, display_name, email) VALUES (?, ?, ?)")
                .bind(user.username)
                .bind(user.display_name)
                .bind(user.email)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by username (exact match).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Principal>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT username, display_name, email FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Principal::from))
    }

    /// Delete a user by username.
    pub async fn delete(&self, username: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of users.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
