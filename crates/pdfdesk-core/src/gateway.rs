//! Plan Gateway
//!
//! Decides, per request, whether an operation is permitted for the
//! caller's plan. Pure: no I/O, no shared state, never fails.
//!
//! ```text
//! request ──▶ authorize(kind, count, plan) ──▶ Allowed ──▶ document service
//!                                         └──▶ Denied  ──▶ user-facing message
//! ```

use serde::{Deserialize, Serialize};

use crate::plan::{OperationKind, OperationRequest, Plan};

/// Default free-tier maximum number of documents in one merge
pub const FREE_MERGE_LIMIT: usize = 3;

/// Why a request was refused
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialReason {
    pub kind: OperationKind,
    pub limit: usize,
    pub requested: usize,
}

impl DenialReason {
    /// Short machine-oriented reason
    pub const fn code(&self) -> &'static str {
        "free tier limit exceeded"
    }

    /// Message shown to the caller
    pub fn user_message(&self) -> String {
        match self.kind {
            OperationKind::Merge => format!(
                "Free users can merge max {} PDFs. Upgrade to Premium!",
                self.limit
            ),
            kind => format!(
                "Free users can {} max {} PDFs at once. Upgrade to Premium!",
                kind, self.limit
            ),
        }
    }
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Gateway decision
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

impl Decision {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Free-tier input limits per operation
///
/// `None` means the operation is not limited by plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPolicy {
    pub free_merge_max: Option<usize>,
    pub free_split_max: Option<usize>,
    pub free_compress_max: Option<usize>,
}

impl Default for PlanPolicy {
    fn default() -> Self {
        Self {
            free_merge_max: Some(FREE_MERGE_LIMIT),
            free_split_max: None,
            free_compress_max: None,
        }
    }
}

impl PlanPolicy {
    /// Default policy with a different merge limit
    pub fn with_merge_limit(limit: usize) -> Self {
        Self {
            free_merge_max: Some(limit),
            ..Self::default()
        }
    }

    const fn free_limit(&self, kind: OperationKind) -> Option<usize> {
        match kind {
            OperationKind::Merge => self.free_merge_max,
            OperationKind::Split => self.free_split_max,
            OperationKind::Compress => self.free_compress_max,
        }
    }

    pub fn authorize(&self, kind: OperationKind, input_count: usize, plan: Plan) -> Decision {
        if plan.is_premium() {
            return Decision::Allowed;
        }

        match self.free_limit(kind) {
            Some(limit) if input_count > limit => Decision::Denied(DenialReason {
                kind,
                limit,
                requested: input_count,
            }),
            _ => Decision::Allowed,
        }
    }

    pub fn authorize_request(&self, request: &OperationRequest) -> Decision {
        let decision = self.authorize(request.kind, request.input_count, request.plan);
        if let Decision::Denied(reason) = &decision {
            tracing::info!(
                email = %request.email,
                operation = %request.kind,
                requested = reason.requested,
                limit = reason.limit,
                "Operation denied by plan"
            );
        }
        decision
    }
}

/// Authorize with the default policy
pub fn authorize(kind: OperationKind, input_count: usize, plan: Plan) -> Decision {
    PlanPolicy::default().authorize(kind, input_count, plan)
}
