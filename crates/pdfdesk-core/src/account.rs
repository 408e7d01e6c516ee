//! Accounts
//!
//! One record per email. Created on first sight, upgraded at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AccountError, Result};
use crate::plan::Plan;

/// An account record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Normalized email (unique key)
    pub email: String,

    /// Current plan
    pub plan: Plan,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// When the account became premium
    pub upgraded_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a free account for an already normalized email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            plan: Plan::Free,
            created_at: Utc::now(),
            upgraded_at: None,
        }
    }

    pub const fn is_premium(&self) -> bool {
        self.plan.is_premium()
    }
}

/// Result of `AccountStore::upgrade_to_premium`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeOutcome {
    /// The account moved from free to premium
    Upgraded,
    /// The account was already premium; nothing changed
    AlreadyPremium,
    /// No account with that email exists; nothing was created
    NotFound,
}

impl UpgradeOutcome {
    pub const fn changed(self) -> bool {
        matches!(self, Self::Upgraded)
    }
}

/// Normalize an email into an account key
///
/// Trims whitespace and lowercases. Rejects anything without exactly one
/// `@` separating non-empty parts.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AccountError::InvalidEmail(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_free() {
        let account = Account::new("a@example.com");
        assert_eq!(account.plan, Plan::Free);
        assert!(account.upgraded_at.is_none());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  User@Example.COM ").unwrap(), "user@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@b@c").is_err());
        assert!(normalize_email("a b@example.com").is_err());
    }
}
