//! Readiness: do the current approvals satisfy the current policy?
//!
//! ```text
//! ready = total >= required_total
//!         && for every role r with a minimum: approvals_of(r) >= minimum(r)
//! ```
//!
//! The explanation is structured; wording belongs to the caller.

use crate::aggregate::ApprovalTally;
use crate::policy::ReviewPolicy;
use crate::role::Role;
use serde::{Deserialize, Serialize};

/// Required versus actual approvals along one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub required: u32,
    pub actual: u32,
}

impl Requirement {
    pub fn is_met(&self) -> bool {
        self.actual >= self.required
    }

    pub fn shortfall(&self) -> u32 {
        self.required.saturating_sub(self.actual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleShortfall {
    pub role: Role,
    #[serde(flatten)]
    pub requirement: Requirement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessExplanation {
    pub policy: ReviewPolicy,
    pub policy_digest: String,
    pub total: Requirement,
    /// Only the role minimums that are not met, in role order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmet_roles: Vec<RoleShortfall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub explanation: ReadinessExplanation,
}

pub fn evaluate_readiness(policy: &ReviewPolicy, tally: &ApprovalTally) -> Readiness {
    let total = Requirement {
        required: u32::from(policy.required_total()),
        actual: tally.total,
    };

    let unmet_roles: Vec<RoleShortfall> = policy
        .per_role_minimum()
        .iter()
        .map(|(role, minimum)| RoleShortfall {
            role: *role,
            requirement: Requirement {
                required: u32::from(*minimum),
                actual: tally.approvals_of(*role),
            },
        })
        .filter(|shortfall| !shortfall.requirement.is_met())
        .collect();

    Readiness {
        ready: total.is_met() && unmet_roles.is_empty(),
        explanation: ReadinessExplanation {
            policy: policy.clone(),
            policy_digest: policy.digest(),
            total,
            unmet_roles,
        },
    }
}
