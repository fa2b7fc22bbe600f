//! In-memory forge backed by change-request snapshot files.
//!
//! Used by the CLI (one snapshot JSON file per change request) and by tests,
//! which can inject failures per operation.

use crate::forge::{ChangeRequest, CollaboratorError, Comment, Forge};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use revgate_kernel::{AccountId, Review, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("change request not found: {0}")]
    NotFound(String),
}

/// Everything the forge knows about one change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequestSnapshot {
    #[serde(flatten)]
    pub change: ChangeRequest,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl ChangeRequestSnapshot {
    pub fn new(id: impl Into<String>, author: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            change: ChangeRequest {
                id: id.into(),
                author: AccountId::new(author),
                description: String::new(),
                created_at,
                labels: Default::default(),
            },
            comments: Vec::new(),
            reviews: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&input).map_err(|source| SnapshotError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let mut rendered = serde_json::to_string_pretty(self).map_err(|source| {
            SnapshotError::Encode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        rendered.push('\n');
        std::fs::write(path, rendered).map_err(|source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Timestamp one second after the latest recorded activity.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let latest_comment = self.comments.iter().map(|c| c.created_at).max();
        let latest_review = self.reviews.iter().map(|r| r.submitted_at).max();
        let latest = [Some(self.change.created_at), latest_comment, latest_review]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(self.change.created_at);
        latest + Duration::seconds(1)
    }

    fn next_comment_sequence(&self) -> u64 {
        self.comments.iter().map(|c| c.sequence).max().unwrap_or(0) + 1
    }
}

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ForgeOperation {
    ChangeRequest,
    Comments,
    Reviews,
    PostComment,
    SetLabel,
}

impl ForgeOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChangeRequest => "forge.change_request",
            Self::Comments => "forge.comments",
            Self::Reviews => "forge.reviews",
            Self::PostComment => "forge.post_comment",
            Self::SetLabel => "forge.set_label",
        }
    }
}

#[derive(Debug, Default)]
struct ForgeState {
    changes: BTreeMap<String, ChangeRequestSnapshot>,
    faults: BTreeMap<ForgeOperation, VecDeque<CollaboratorError>>,
    label_writes: usize,
}

#[derive(Debug)]
pub struct InMemoryForge {
    bot: AccountId,
    state: Mutex<ForgeState>,
}

impl InMemoryForge {
    pub fn new(bot: AccountId) -> Self {
        Self {
            bot,
            state: Mutex::new(ForgeState::default()),
        }
    }

    pub fn with_snapshot(bot: AccountId, snapshot: ChangeRequestSnapshot) -> Self {
        let forge = Self::new(bot);
        forge.insert(snapshot);
        forge
    }

    fn state(&self) -> MutexGuard<'_, ForgeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, snapshot: ChangeRequestSnapshot) {
        self.state()
            .changes
            .insert(snapshot.change.id.clone(), snapshot);
    }

    pub fn snapshot(&self, id: &str) -> Option<ChangeRequestSnapshot> {
        self.state().changes.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.state().changes.keys().cloned().collect()
    }

    /// Number of label writes performed so far.
    pub fn label_writes(&self) -> usize {
        self.state().label_writes
    }

    /// Comments posted by the bot account, oldest first.
    pub fn bot_comments(&self, id: &str) -> Vec<Comment> {
        self.snapshot(id)
            .map(|snapshot| {
                snapshot
                    .comments
                    .into_iter()
                    .filter(|c| c.author == self.bot)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Body of the most recent comment, if any.
    pub fn last_comment(&self, id: &str) -> Option<String> {
        self.snapshot(id)?
            .comments
            .iter()
            .max_by_key(|c| (c.created_at, c.sequence))
            .map(|c| c.body.clone())
    }

    pub fn add_comment(
        &self,
        id: &str,
        author: &str,
        body: &str,
    ) -> Result<Comment, SnapshotError> {
        let mut state = self.state();
        let snapshot = state
            .changes
            .get_mut(id)
            .ok_or_else(|| SnapshotError::NotFound(id.to_string()))?;
        let sequence = snapshot.next_comment_sequence();
        let comment = Comment {
            id: format!("c{sequence}"),
            author: AccountId::new(author),
            body: body.to_string(),
            created_at: snapshot.next_timestamp(),
            sequence,
        };
        snapshot.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn add_review(&self, id: &str, reviewer: &str, verdict: Verdict) -> Result<(), SnapshotError> {
        let mut state = self.state();
        let snapshot = state
            .changes
            .get_mut(id)
            .ok_or_else(|| SnapshotError::NotFound(id.to_string()))?;
        let review = Review {
            reviewer: AccountId::new(reviewer),
            verdict,
            submitted_at: snapshot.next_timestamp(),
            sequence: snapshot.reviews.len() as u64 + 1,
        };
        snapshot.reviews.push(review);
        Ok(())
    }

    pub fn set_description(&self, id: &str, description: &str) -> Result<(), SnapshotError> {
        let mut state = self.state();
        let snapshot = state
            .changes
            .get_mut(id)
            .ok_or_else(|| SnapshotError::NotFound(id.to_string()))?;
        snapshot.change.description = description.to_string();
        Ok(())
    }

    /// Make the next `times` calls of `operation` fail with `error`.
    pub fn fail_next(&self, operation: ForgeOperation, times: usize, error: CollaboratorError) {
        let mut state = self.state();
        let queue = state.faults.entry(operation).or_default();
        for _ in 0..times {
            queue.push_back(error.clone());
        }
    }

    fn take_fault(state: &mut ForgeState, operation: ForgeOperation) -> Result<(), CollaboratorError> {
        match state.faults.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn with_change<T>(
        &self,
        operation: ForgeOperation,
        id: &str,
        f: impl FnOnce(&mut ChangeRequestSnapshot, &AccountId) -> T,
    ) -> Result<T, CollaboratorError> {
        let mut state = self.state();
        Self::take_fault(&mut state, operation)?;
        let snapshot = state.changes.get_mut(id).ok_or_else(|| {
            CollaboratorError::permanent(operation.as_str(), format!("change request {id} not found"))
        })?;
        Ok(f(snapshot, &self.bot))
    }
}

#[async_trait]
impl Forge for InMemoryForge {
    async fn change_request(&self, id: &str) -> Result<ChangeRequest, CollaboratorError> {
        self.with_change(ForgeOperation::ChangeRequest, id, |s, _| s.change.clone())
    }

    async fn comments(&self, id: &str) -> Result<Vec<Comment>, CollaboratorError> {
        self.with_change(ForgeOperation::Comments, id, |s, _| s.comments.clone())
    }

    async fn reviews(&self, id: &str) -> Result<Vec<Review>, CollaboratorError> {
        self.with_change(ForgeOperation::Reviews, id, |s, _| s.reviews.clone())
    }

    async fn post_comment(&self, id: &str, body: &str) -> Result<Comment, CollaboratorError> {
        self.with_change(ForgeOperation::PostComment, id, |s, bot| {
            let sequence = s.next_comment_sequence();
            let comment = Comment {
                id: format!("c{sequence}"),
                author: bot.clone(),
                body: body.to_string(),
                created_at: s.next_timestamp(),
                sequence,
            };
            s.comments.push(comment.clone());
            comment
        })
    }

    async fn set_label(
        &self,
        id: &str,
        label: &str,
        present: bool,
    ) -> Result<(), CollaboratorError> {
        self.with_change(ForgeOperation::SetLabel, id, |s, _| {
            if present {
                s.change.labels.insert(label.to_string());
            } else {
                s.change.labels.remove(label);
            }
        })?;
        self.state().label_writes += 1;
        Ok(())
    }
}
