//! Account database operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// Plan tier, stored as lowercase text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Plan::Free => write!(f, "free"),
            Plan::Pro => write!(f, "pro"),
        }
    }
}

/// Account record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub pages_processed: i64,
    pub plan: Plan,
    pub created_at: String,
}

/// Account repository
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new account on the free plan with zero usage.
    ///
    /// The caller is expected to pass an already-hashed password; raw
    /// passwords never reach this layer. A duplicate email surfaces as a
    /// unique-violation `sqlx::Error`.
    pub async fn create(&self, email: &str, password_hash: &str) -> std::result::Result<Account, sqlx::Error> {
        let now = Utc::now().to_rfc3339();

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (email, password_hash, pages_processed, plan, created_at)
            VALUES (?, ?, 0, 'free', ?)
            RETURNING id, email, password_hash, pages_processed, plan, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(account)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, pages_processed, plan, created_at
            FROM accounts
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(account)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, pages_processed, plan, created_at
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(account)
    }

    /// Consume one page of quota if the account is still below `ceiling`.
    ///
    /// A single conditional UPDATE, so two requests racing for the last page
    /// cannot both get it. Returns false when the ceiling was already reached.
    pub async fn consume_page(&self, id: i64, ceiling: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET pages_processed = pages_processed + 1
            WHERE id = ? AND pages_processed < ?
            "#,
        )
        .bind(id)
        .bind(ceiling)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Move the account to the pro plan and reset its usage counter.
    pub async fn upgrade_plan(&self, id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET plan = ?, pages_processed = 0
            WHERE id = ?
            "#,
        )
        .bind(Plan::Pro)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}

/// True when the error is the UNIQUE constraint on `accounts.email`.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation
    )
}
