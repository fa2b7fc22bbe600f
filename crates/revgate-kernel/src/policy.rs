//! Review policy: how many approvals a change request needs, optionally
//! broken down by role.
//!
//! A `ReviewPolicy` is an immutable value. Transitions produce a new policy;
//! the store decides whether a transition is committed.
//!
//! Invariants (checked by `ReviewPolicy::new`, preserved by `apply`):
//! - `0 <= required_total <= 10`
//! - every role minimum is in `1..=required_total`

use crate::command::{MAX_REQUIRED_REVIEWERS, ReviewerRequest};
use crate::role::Role;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Errors raised when constructing a policy from raw parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error(
        "required total must be in range [0, {max}] (got {actual})",
        max = MAX_REQUIRED_REVIEWERS
    )]
    TotalOutOfRange { actual: i64 },

    #[error("minimum for role {role} ({minimum}) exceeds required total ({total})")]
    RoleExceedsTotal { role: Role, minimum: u8, total: u8 },
}

/// The current review requirement for one change request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewPolicy {
    required_total: u8,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    per_role_minimum: BTreeMap<Role, u8>,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            required_total: 1,
            per_role_minimum: BTreeMap::new(),
        }
    }
}

/// How a candidate policy compares to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Unchanged,
    Raises,
    /// Lowers the total or any role minimum (possibly while raising another).
    Lowers,
}

impl ReviewPolicy {
    /// Build a policy from raw parts, enforcing the invariants.
    ///
    /// Zero role minimums are dropped.
    pub fn new(
        required_total: i64,
        per_role_minimum: impl IntoIterator<Item = (Role, u8)>,
    ) -> Result<Self, PolicyError> {
        if !(0..=MAX_REQUIRED_REVIEWERS).contains(&required_total) {
            return Err(PolicyError::TotalOutOfRange {
                actual: required_total,
            });
        }
        let total = required_total as u8;
        let mut minimums = BTreeMap::new();
        for (role, minimum) in per_role_minimum {
            if minimum > total {
                return Err(PolicyError::RoleExceedsTotal {
                    role,
                    minimum,
                    total,
                });
            }
            if minimum > 0 {
                minimums.insert(role, minimum);
            }
        }
        Ok(Self {
            required_total: total,
            per_role_minimum: minimums,
        })
    }

    pub fn required_total(&self) -> u8 {
        self.required_total
    }

    pub fn per_role_minimum(&self) -> &BTreeMap<Role, u8> {
        &self.per_role_minimum
    }

    pub fn minimum_for(&self, role: Role) -> u8 {
        self.per_role_minimum.get(&role).copied().unwrap_or(0)
    }

    /// Whether any explicit role narrowing is active.
    pub fn has_role_minimums(&self) -> bool {
        !self.per_role_minimum.is_empty()
    }

    /// The policy that results from committing `request`.
    ///
    /// - no role: the total is set and the breakdown resets to the default
    ///   bucket
    /// - with role: the total and that role's minimum are set to the count;
    ///   other minimums are capped to the new total
    pub fn apply(&self, request: &ReviewerRequest) -> ReviewPolicy {
        let total = request.count;
        let per_role_minimum = match request.role {
            None => BTreeMap::new(),
            Some(role) => {
                let mut minimums: BTreeMap<Role, u8> = self
                    .per_role_minimum
                    .iter()
                    .map(|(r, minimum)| (*r, (*minimum).min(total)))
                    .collect();
                minimums.insert(role, total);
                minimums.retain(|_, minimum| *minimum > 0);
                minimums
            }
        };
        ReviewPolicy {
            required_total: total,
            per_role_minimum,
        }
    }

    /// Classify the move from `self` to `next`.
    pub fn transition_to(&self, next: &ReviewPolicy) -> Transition {
        let lowers_total = next.required_total < self.required_total;
        let lowers_role = self
            .per_role_minimum
            .iter()
            .any(|(role, minimum)| next.minimum_for(*role) < *minimum);
        if lowers_total || lowers_role {
            return Transition::Lowers;
        }
        if next == self {
            Transition::Unchanged
        } else {
            Transition::Raises
        }
    }

    /// Deterministic content digest of the policy.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"total:");
        hasher.update(self.required_total.to_string().as_bytes());
        hasher.update(b"\n");
        for (role, minimum) in &self.per_role_minimum {
            hasher.update(role.as_str().as_bytes());
            hasher.update(b":");
            hasher.update(minimum.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!("pol1_{:x}", hasher.finalize())
    }
}
