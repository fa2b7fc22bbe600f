//! Driver errors.
//!
//! Command failures (bad syntax, denied permission) are never errors; they
//! become replies. These are the failures that abort a pass.

use crate::forge::CollaboratorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("gate check for change request {id} was superseded {attempts} times in a row")]
    GateSuperseded { id: String, attempts: u32 },
}

impl DriverError {
    /// Whether the next scheduled pass may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            DriverError::Collaborator(err) => err.is_transient(),
            DriverError::GateSuperseded { .. } => true,
        }
    }
}
