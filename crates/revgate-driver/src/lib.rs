//! # Revgate Driver
//!
//! Runs the kernel against a forge. The driver owns no authoritative state:
//! every pass re-reads the change request, replays its full command history
//! and converges the ready label and replies on what it finds.
//!
//! - `forge` / `census`: collaborator traits
//! - `memory`: in-memory forge over snapshot files
//! - `reconcile`: passes, contexts, gate consultation
//! - `worker`: poll loop

pub mod census;
pub mod config;
pub mod error;
pub mod forge;
pub mod history;
pub mod memory;
pub mod reconcile;
pub mod reply;
pub mod retry;
pub mod worker;

pub use census::{Census, CensusError, StaticCensus, resolve_roles};
pub use config::{ConfigError, DEFAULT_CONFIG_FILE, GateConfig, RetryConfig, load_config};
pub use error::DriverError;
pub use forge::{ChangeRequest, CollaboratorError, Comment, Forge};
pub use memory::{ChangeRequestSnapshot, ForgeOperation, InMemoryForge, SnapshotError};
pub use reconcile::{ChangeRequestContext, GateResponse, PassOutcome, PassReport, Reconciler};
pub use retry::RetryPolicy;
pub use worker::{PollWorker, TickSummary, WorkerSummary};
