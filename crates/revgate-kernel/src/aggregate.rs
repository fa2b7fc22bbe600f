//! Review aggregation: effective approvals per role and in total.
//!
//! Reviews are sourced fresh every pass. For each account only the most
//! recent verdict counts; withdrawn or disapproving verdicts count for
//! nothing.

use crate::role::{AccountId, DEFAULT_ROLE, Role, RoleResolver};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Disapproved,
    Pending,
}

/// One review as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer: AccountId,
    pub verdict: Verdict,
    pub submitted_at: DateTime<Utc>,
    /// Platform-assigned ordering for reviews sharing a timestamp.
    #[serde(default)]
    pub sequence: u64,
}

/// An effective approval with the role resolved for this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub reviewer: AccountId,
    /// `None` when the census no longer knows the account.
    pub role: Option<Role>,
}

/// Approval counts for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTally {
    pub total: u32,
    pub by_role: BTreeMap<Role, u32>,
    pub approvals: Vec<Approval>,
}

impl ApprovalTally {
    pub fn approvals_of(&self, role: Role) -> u32 {
        self.by_role.get(&role).copied().unwrap_or(0)
    }
}

/// Latest verdict per reviewer, in reviewer order.
pub fn latest_verdicts(reviews: &[Review]) -> BTreeMap<AccountId, &Review> {
    let mut latest: BTreeMap<AccountId, &Review> = BTreeMap::new();
    for review in reviews {
        let key = (review.submitted_at, review.sequence);
        match latest.get(&review.reviewer) {
            Some(existing) if (existing.submitted_at, existing.sequence) > key => {}
            _ => {
                latest.insert(review.reviewer.clone(), review);
            }
        }
    }
    latest
}

/// Count effective approvals for the total and for each of `roles`.
///
/// An approval counts toward the bucket of role `r` when the approver's
/// standing satisfies `r`. Unresolved approvers are excluded from every role
/// bucket but count toward the total as if they held the default role.
pub fn aggregate_reviews(
    reviews: &[Review],
    roles: impl IntoIterator<Item = Role>,
    resolver: &dyn RoleResolver,
) -> ApprovalTally {
    let approvals: Vec<Approval> = latest_verdicts(reviews)
        .into_values()
        .filter(|review| review.verdict == Verdict::Approved)
        .map(|review| Approval {
            reviewer: review.reviewer.clone(),
            role: resolver.resolve_role(&review.reviewer),
        })
        .collect();

    let total = approvals
        .iter()
        .filter(|approval| approval.role.unwrap_or(DEFAULT_ROLE).satisfies(DEFAULT_ROLE))
        .count() as u32;

    let by_role = roles
        .into_iter()
        .map(|required| {
            let count = approvals
                .iter()
                .filter(|approval| approval.role.is_some_and(|role| role.satisfies(required)))
                .count() as u32;
            (required, count)
        })
        .collect();

    ApprovalTally {
        total,
        by_role,
        approvals,
    }
}
