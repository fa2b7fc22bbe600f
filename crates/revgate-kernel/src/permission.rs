//! Who may change a review policy, and in which direction.
//!
//! - execute: the change-request author, or standing `committers` and above
//! - raise: anyone who may execute
//! - lower: standing `reviewers` and above, never the change-request author

use crate::command::ReviewerRequest;
use crate::policy::{ReviewPolicy, Transition};
use crate::role::{AccountId, Role};
use serde::{Deserialize, Serialize};

/// Minimum standing to issue commands on someone else's change request.
pub const EXECUTE_ROLE: Role = Role::Committers;

/// Minimum standing to lower a requirement.
pub const DECREASE_ROLE: Role = Role::Reviewers;

/// The account issuing a command, as seen by the permission rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub account: AccountId,
    pub role: Option<Role>,
    pub is_change_author: bool,
}

impl Actor {
    pub fn new(account: AccountId, role: Option<Role>, is_change_author: bool) -> Self {
        Self {
            account,
            role,
            is_change_author,
        }
    }

    fn has_standing(&self, required: Role) -> bool {
        self.role.is_some_and(|role| role.satisfies(required))
    }

    pub fn may_execute(&self) -> bool {
        self.is_change_author || self.has_standing(EXECUTE_ROLE)
    }
}

/// Why a command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialReason {
    NotPermitted,
    DecreaseNotPermitted,
    AuthorCannotDecrease,
}

impl DenialReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenialReason::NotPermitted => "not-permitted",
            DenialReason::DecreaseNotPermitted => "decrease-not-permitted",
            DenialReason::AuthorCannotDecrease => "author-cannot-decrease",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Allowed,
    Denied(DenialReason),
}

impl Permission {
    pub fn is_allowed(self) -> bool {
        matches!(self, Permission::Allowed)
    }
}

/// Decide whether `actor` may move the policy from `current` to `next`.
pub fn evaluate_permission(
    actor: &Actor,
    current: &ReviewPolicy,
    next: &ReviewPolicy,
) -> Permission {
    if !actor.may_execute() {
        return Permission::Denied(DenialReason::NotPermitted);
    }

    match current.transition_to(next) {
        Transition::Unchanged | Transition::Raises => Permission::Allowed,
        Transition::Lowers if actor.is_change_author => {
            Permission::Denied(DenialReason::AuthorCannotDecrease)
        }
        Transition::Lowers if !actor.has_standing(DECREASE_ROLE) => {
            Permission::Denied(DenialReason::DecreaseNotPermitted)
        }
        Transition::Lowers => Permission::Allowed,
    }
}

/// Convenience wrapper: evaluate the policy `request` would produce.
pub fn evaluate_request(
    actor: &Actor,
    current: &ReviewPolicy,
    request: &ReviewerRequest,
) -> Permission {
    evaluate_permission(actor, current, &current.apply(request))
}
