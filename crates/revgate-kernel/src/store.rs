//! Policy store: the current review policy as a fold over command history.
//!
//! The store has no authoritative state of its own. Replaying the same
//! ordered history from the same initial policy always yields the same
//! policy and the same per-command decisions.

use crate::command::{Command, CommandSource, ReviewerRequest, sort_commands};
use crate::permission::{Actor, DenialReason, Permission, evaluate_permission};
use crate::policy::ReviewPolicy;
use crate::role::{AccountId, RoleResolver};
use serde::{Deserialize, Serialize};

/// What happened to one command during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Committed. `changed` is false for a re-issued identical requirement.
    Applied { changed: bool },
    Denied { reason: DenialReason },
}

/// One replayed command with the policy it saw and the policy it left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDecision {
    pub source: CommandSource,
    pub actor: AccountId,
    pub request: ReviewerRequest,
    pub before: ReviewPolicy,
    pub after: ReviewPolicy,
    pub decision: Decision,
}

impl CommandDecision {
    pub fn is_applied(&self) -> bool {
        matches!(self.decision, Decision::Applied { .. })
    }
}

/// Owns the derived policy for one change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStore {
    initial: ReviewPolicy,
    policy: ReviewPolicy,
    decisions: Vec<CommandDecision>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new(ReviewPolicy::default())
    }
}

impl PolicyStore {
    pub fn new(initial: ReviewPolicy) -> Self {
        Self {
            policy: initial.clone(),
            initial,
            decisions: Vec::new(),
        }
    }

    /// Snapshot of the current policy.
    pub fn policy(&self) -> &ReviewPolicy {
        &self.policy
    }

    pub fn initial(&self) -> &ReviewPolicy {
        &self.initial
    }

    /// Decisions in replay order.
    pub fn decisions(&self) -> &[CommandDecision] {
        &self.decisions
    }

    /// Decision recorded for `source`, if that source carried a command.
    pub fn decision_for(&self, source: &CommandSource) -> Option<&CommandDecision> {
        self.decisions.iter().find(|d| &d.source == source)
    }

    /// Apply one command. `permit` sees the current and candidate policies.
    ///
    /// A denied command leaves the policy untouched; later commands are
    /// still applied.
    pub fn apply<F>(&mut self, command: &Command, permit: F) -> &CommandDecision
    where
        F: FnOnce(&ReviewPolicy, &ReviewPolicy) -> Permission,
    {
        let before = self.policy.clone();
        let candidate = before.apply(&command.request);

        let decision = match permit(&before, &candidate) {
            Permission::Allowed => {
                let changed = candidate != before;
                self.policy = candidate;
                Decision::Applied { changed }
            }
            Permission::Denied(reason) => Decision::Denied { reason },
        };

        self.decisions.push(CommandDecision {
            source: command.source.clone(),
            actor: command.actor.clone(),
            request: command.request,
            before,
            after: self.policy.clone(),
            decision,
        });
        let index = self.decisions.len() - 1;
        &self.decisions[index]
    }

    /// Replay `commands` (in replay order) under the standard permission rules.
    pub fn replay(
        initial: ReviewPolicy,
        commands: &[Command],
        change_author: &AccountId,
        roles: &dyn RoleResolver,
    ) -> Self {
        let mut ordered = commands.to_vec();
        sort_commands(&mut ordered);

        let mut store = Self::new(initial);
        for command in &ordered {
            let actor = Actor::new(
                command.actor.clone(),
                roles.resolve_role(&command.actor),
                &command.actor == change_author,
            );
            store.apply(command, |current, next| {
                evaluate_permission(&actor, current, next)
            });
        }
        store
    }
}
