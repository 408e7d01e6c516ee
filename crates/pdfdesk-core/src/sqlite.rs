//! SQLite Account Store
//!
//! One `accounts` table keyed by email. Upgrades are a conditional
//! `UPDATE` inside a transaction, so concurrent deliveries for the same
//! account cannot lose or double-apply the transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::account::{Account, UpgradeOutcome};
use crate::error::{AccountError, Result};
use crate::plan::Plan;
use crate::store::AccountStore;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    email       TEXT PRIMARY KEY NOT NULL,
    plan        TEXT NOT NULL DEFAULT 'free',
    created_at  TEXT NOT NULL,
    upgraded_at TEXT
)
";

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    email: String,
    plan: String,
    created_at: String,
    upgraded_at: Option<String>,
}

impl TryFrom<AccountRow> for Account {
    type Error = AccountError;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Self {
            plan: Plan::from_str(&row.plan)?,
            created_at: parse_timestamp(&row.created_at)?,
            upgraded_at: row.upgraded_at.as_deref().map(parse_timestamp).transpose()?,
            email: row.email,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AccountError::Storage(format!("bad timestamp {value:?}: {e}")))
}

/// Account store backed by SQLite
#[derive(Clone)]
pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    /// Connect to `database_url` (e.g. `sqlite:./pdfdesk.db`) and run migrations
    pub async fn open(database_url: &str) -> Result<Self> {
        // Writers on other pooled connections wait for the lock instead of failing
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // Each connection to an in-memory database is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and run migrations
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        tracing::debug!("accounts table ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn get(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT email, plan, created_at, upgraded_at FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn get_or_create(&self, email: &str) -> Result<Account> {
        let now = Utc::now().to_rfc3339();

        let inserted = sqlx::query(
            "INSERT INTO accounts (email, plan, created_at) VALUES (?, 'free', ?)
             ON CONFLICT(email) DO NOTHING",
        )
        .bind(email)
        .bind(&now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            tracing::info!(email = %email, "Created account");
        }

        self.get(email)
            .await?
            .ok_or_else(|| AccountError::Storage(format!("account {email} vanished after insert")))
    }

    async fn upgrade_to_premium(&self, email: &str) -> Result<UpgradeOutcome> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE accounts SET plan = 'premium', upgraded_at = ?
             WHERE email = ? AND plan <> 'premium'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(email)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if updated > 0 {
            UpgradeOutcome::Upgraded
        } else {
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT email FROM accounts WHERE email = ?")
                    .bind(email)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_some() {
                UpgradeOutcome::AlreadyPremium
            } else {
                UpgradeOutcome::NotFound
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    async fn memory_store() -> SqliteAccountStore {
        SqliteAccountStore::open("sqlite::memory:").await.unwrap()
    }

    /// A database file under the temp dir, removed on drop
    struct TempDatabase(PathBuf);

    impl TempDatabase {
        fn new() -> Self {
            let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            let name = format!("pdfdesk-accounts-{}-{nanos}.db", std::process::id());
            Self(std::env::temp_dir().join(name))
        }

        fn url(&self) -> String {
            format!("sqlite://{}", self.0.display())
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm", "-journal"] {
                let mut path = self.0.clone().into_os_string();
                path.push(suffix);
                let _ = std::fs::remove_file(path);
            }
        }
    }

    #[tokio::test]
    async fn test_get_or_create_persists_free_account() {
        let store = memory_store().await;
        let account = store.get_or_create("a@example.com").await.unwrap();
        assert_eq!(account.plan, Plan::Free);

        let again = store.get_or_create("a@example.com").await.unwrap();
        assert_eq!(again.created_at, account.created_at);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upgrade_transitions_once() {
        let store = memory_store().await;
        store.get_or_create("a@example.com").await.unwrap();

        assert_eq!(
            store.upgrade_to_premium("a@example.com").await.unwrap(),
            UpgradeOutcome::Upgraded
        );
        assert_eq!(
            store.upgrade_to_premium("a@example.com").await.unwrap(),
            UpgradeOutcome::AlreadyPremium
        );

        let account = store.get("a@example.com").await.unwrap().unwrap();
        assert_eq!(account.plan, Plan::Premium);
        assert!(account.upgraded_at.is_some());
    }

    #[tokio::test]
    async fn test_upgrade_unknown_is_not_found() {
        let store = memory_store().await;
        assert_eq!(
            store.upgrade_to_premium("ghost@example.com").await.unwrap(),
            UpgradeOutcome::NotFound
        );
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upgrades_on_file_database_single_transition() {
        let database = TempDatabase::new();
        let store = SqliteAccountStore::open(&database.url()).await.unwrap();
        store.get_or_create("a@example.com").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upgrade_to_premium("a@example.com").await.unwrap()
            }));
        }

        let mut upgraded = 0;
        for handle in handles {
            if handle.await.unwrap().changed() {
                upgraded += 1;
            }
        }
        assert_eq!(upgraded, 1);

        // A fresh pool sees the committed transition
        let reopened = SqliteAccountStore::open(&database.url()).await.unwrap();
        let account = reopened.get("a@example.com").await.unwrap().unwrap();
        assert_eq!(account.plan, Plan::Premium);
        assert!(account.upgraded_at.is_some());
    }
}
