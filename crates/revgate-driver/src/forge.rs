//! The forge collaborator: where change requests, comments, reviews and
//! labels live.
//!
//! The driver never caches forge state between passes. Every pass fetches a
//! fresh snapshot and derives everything from it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use revgate_kernel::{AccountId, Review};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Failure reported by a collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// Worth retrying: rate limits, timeouts, a flaky connection.
    #[error("{operation}: transient failure: {message}")]
    Transient { operation: String, message: String },

    /// Retrying will not help: not found, forbidden, malformed data.
    #[error("{operation}: {message}")]
    Permanent { operation: String, message: String },
}

impl CollaboratorError {
    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn permanent(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// The change request itself, as of this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: String,
    pub author: AccountId,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl ChangeRequest {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// One comment on a change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: AccountId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Monotonic per change request; breaks timestamp ties.
    pub sequence: u64,
}

#[async_trait]
pub trait Forge: Send + Sync {
    async fn change_request(&self, id: &str) -> Result<ChangeRequest, CollaboratorError>;

    async fn comments(&self, id: &str) -> Result<Vec<Comment>, CollaboratorError>;

    async fn reviews(&self, id: &str) -> Result<Vec<Review>, CollaboratorError>;

    /// Post a comment as the bot account and return it as stored.
    async fn post_comment(&self, id: &str, body: &str) -> Result<Comment, CollaboratorError>;

    /// Add (`present = true`) or remove a label.
    async fn set_label(&self, id: &str, label: &str, present: bool)
    -> Result<(), CollaboratorError>;
}
