//! The gate consulted by integration and sponsorship flows.
//!
//! A gate is a view over one pass's readiness. It holds no state of its own
//! and fails closed when no readiness has been computed for the pass.

use crate::readiness::{Readiness, ReadinessExplanation};
use serde::{Deserialize, Serialize};

/// The irreversible downstream action asking for permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    Integrate,
    Sponsor,
}

impl GateAction {
    pub fn as_str(self) -> &'static str {
        match self {
            GateAction::Integrate => "integrate",
            GateAction::Sponsor => "sponsor",
        }
    }
}

impl std::str::FromStr for GateAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integrate" => Ok(GateAction::Integrate),
            "sponsor" => Ok(GateAction::Sponsor),
            _ => Err(format!("unknown gate action: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlockReason {
    NotEvaluated,
    Unready { explanation: ReadinessExplanation },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateDecision {
    Allowed,
    Blocked(BlockReason),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Gate<'a> {
    readiness: Option<&'a Readiness>,
}

impl<'a> Gate<'a> {
    pub fn new(readiness: &'a Readiness) -> Self {
        Self {
            readiness: Some(readiness),
        }
    }

    pub fn unevaluated() -> Self {
        Self { readiness: None }
    }

    pub fn check_ready(&self) -> GateDecision {
        match self.readiness {
            Some(readiness) if readiness.ready => GateDecision::Allowed,
            Some(readiness) => GateDecision::Blocked(BlockReason::Unready {
                explanation: readiness.explanation.clone(),
            }),
            None => GateDecision::Blocked(BlockReason::NotEvaluated),
        }
    }
}
