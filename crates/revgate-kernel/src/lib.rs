//! # Revgate Kernel
//!
//! Review-requirement gating for change requests: a small command grammar,
//! permission rules over who may tighten or relax a requirement, a policy
//! derived by replaying command history, and a readiness signal computed
//! against the current approvals.
//!
//! Everything here is pure and synchronous. Forge and census access live in
//! `revgate-driver`.
//!
//! ## Data flow (one pass)
//!
//! ```text
//! comment / description text
//!     │  command::parse_line
//! ParseOutcome ── Parsed ──► Command
//!     │                         │  permission::evaluate_permission
//!     │                     store::PolicyStore::replay
//!     │                         │
//! reviews ── aggregate::aggregate_reviews ──► ApprovalTally
//!                               │
//!                 readiness::evaluate_readiness ──► Readiness
//!                               │
//!                         gate::Gate::check_ready
//! ```

pub mod aggregate;
pub mod command;
pub mod gate;
pub mod permission;
pub mod policy;
pub mod readiness;
pub mod role;
pub mod store;

pub use aggregate::{Approval, ApprovalTally, Review, Verdict, aggregate_reviews, latest_verdicts};
pub use command::{
    Bound, Command, CommandSource, MAX_REQUIRED_REVIEWERS, MIN_REQUIRED_REVIEWERS, ParseOutcome,
    ReviewerRequest, TRIGGER, parse_arguments, parse_line, sort_commands,
};
pub use gate::{BlockReason, Gate, GateAction, GateDecision};
pub use permission::{
    Actor, DECREASE_ROLE, DenialReason, EXECUTE_ROLE, Permission, evaluate_permission,
    evaluate_request,
};
pub use policy::{PolicyError, ReviewPolicy, Transition};
pub use readiness::{Readiness, ReadinessExplanation, Requirement, RoleShortfall, evaluate_readiness};
pub use role::{AccountId, DEFAULT_ROLE, Role, RoleResolver, RoleTable};
pub use store::{CommandDecision, Decision, PolicyStore};
