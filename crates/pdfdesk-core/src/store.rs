//! Account Store
//!
//! Single source of truth for entitlement. `upgrade_to_premium` is the only
//! mutation of plan state, and implementations serialize it per email.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::account::{Account, UpgradeOutcome};
use crate::error::Result;
use crate::plan::Plan;

/// Account storage trait
///
/// Emails passed in are expected to be normalized (see
/// [`normalize_email`](crate::account::normalize_email)).
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Get account by email
    async fn get(&self, email: &str) -> Result<Option<Account>>;

    /// Get account by email, creating a free one on first sight
    async fn get_or_create(&self, email: &str) -> Result<Account>;

    /// Move the account to premium (atomic check + set)
    ///
    /// Never creates an account. Calling it on a premium account is a no-op.
    async fn upgrade_to_premium(&self, email: &str) -> Result<UpgradeOutcome>;

    /// Number of stored accounts
    async fn count(&self) -> Result<usize>;
}

/// In-memory account store (for development and tests)
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(email).cloned())
    }

    async fn get_or_create(&self, email: &str) -> Result<Account> {
        if let Some(account) = self.accounts.read().await.get(email) {
            return Ok(account.clone());
        }

        let mut accounts = self.accounts.write().await;
        let account = accounts.entry(email.to_string()).or_insert_with(|| {
            tracing::info!(email = %email, "Created account");
            Account::new(email)
        });
        Ok(account.clone())
    }

    async fn upgrade_to_premium(&self, email: &str) -> Result<UpgradeOutcome> {
        let mut accounts = self.accounts.write().await;

        let Some(account) = accounts.get_mut(email) else {
            return Ok(UpgradeOutcome::NotFound);
        };

        if account.is_premium() {
            return Ok(UpgradeOutcome::AlreadyPremium);
        }

        account.plan = Plan::Premium;
        account.upgraded_at = Some(Utc::now());
        Ok(UpgradeOutcome::Upgraded)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.accounts.read().await.len())
    }
}
