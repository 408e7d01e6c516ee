//! Plans and Operations
//!
//! Entitlement tiers and the document operations they gate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AccountError;

/// Entitlement tier of an account
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

impl Plan {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }

    pub const fn is_premium(self) -> bool {
        matches!(self, Self::Premium)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "premium" => Ok(Self::Premium),
            other => Err(AccountError::UnknownPlan(other.to_string())),
        }
    }
}

/// Document operation offered by the service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Merge,
    Split,
    Compress,
}

impl OperationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Split => "split",
            Self::Compress => "compress",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requested document operation, as seen by the gateway
///
/// The plan is captured when the request is resolved and never changes
/// for the lifetime of the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub input_count: usize,
    pub email: String,
    pub plan: Plan,
}

impl OperationRequest {
    pub fn new(kind: OperationKind, input_count: usize, email: impl Into<String>, plan: Plan) -> Self {
        Self {
            kind,
            input_count,
            email: email.into(),
            plan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parsing() {
        assert_eq!("premium".parse::<Plan>().unwrap(), Plan::Premium);
        assert_eq!(" FREE ".parse::<Plan>().unwrap(), Plan::Free);
        assert!("pro".parse::<Plan>().is_err());
    }

    #[test]
    fn test_plan_serde_is_lowercase() {
        let json = serde_json::to_string(&Plan::Premium).unwrap();
        assert_eq!(json, "\"premium\"");
        assert_eq!(Plan::default(), Plan::Free);
    }
}
