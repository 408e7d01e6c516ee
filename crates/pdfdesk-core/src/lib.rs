//! # pdfdesk-core
//!
//! Accounts, plans and the plan-gated operation policy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        pdfdesk-core                           │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │ Plan Gateway │   │   AccountStore   │   │   Account    │  │
//! │  │  (pure fn)   │   │    (Strategy)    │──▶│ email → plan │  │
//! │  └──────────────┘   └──────────────────┘   └──────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway never touches the store: callers resolve the plan first and
//! pass it in by value. Only the payment reconciler calls
//! [`AccountStore::upgrade_to_premium`].

pub mod account;
pub mod error;
pub mod gateway;
pub mod plan;
pub mod sqlite;
pub mod store;

pub use account::{normalize_email, Account, UpgradeOutcome};
pub use error::{AccountError, Result};
pub use gateway::{authorize, Decision, DenialReason, PlanPolicy, FREE_MERGE_LIMIT};
pub use plan::{OperationKind, OperationRequest, Plan};
pub use sqlite::SqliteAccountStore;
pub use store::{AccountStore, MemoryAccountStore};
