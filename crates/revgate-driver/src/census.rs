//! The census collaborator: who holds which role.
//!
//! The kernel only sees a `RoleTable`. `resolve_roles` builds one per pass
//! from whatever `Census` the driver was given.

use crate::forge::CollaboratorError;
use crate::retry::{RetryPolicy, with_retry};
use async_trait::async_trait;
use revgate_kernel::{AccountId, Role, RoleTable};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[async_trait]
pub trait Census: Send + Sync {
    /// `Ok(None)` means the account is not in the census.
    async fn role_of(&self, account: &AccountId) -> Result<Option<Role>, CollaboratorError>;
}

#[derive(Debug, Error)]
pub enum CensusError {
    #[error("failed to read census {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse census {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct CensusFile {
    #[serde(default)]
    members: BTreeMap<AccountId, Role>,
}

/// A fixed census, typically loaded from a TOML file:
///
/// ```toml
/// [members]
/// alice = "reviewers"
/// bob = "committer"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCensus {
    members: BTreeMap<AccountId, Role>,
}

impl StaticCensus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, account: impl Into<String>, role: Role) -> Self {
        self.members.insert(AccountId::new(account), role);
        self
    }

    pub fn from_toml_str(input: &str, path: &Path) -> Result<Self, CensusError> {
        let file: CensusFile = toml::from_str(input).map_err(|source| CensusError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            members: file.members,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CensusError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| CensusError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input, path)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[async_trait]
impl Census for StaticCensus {
    async fn role_of(&self, account: &AccountId) -> Result<Option<Role>, CollaboratorError> {
        Ok(self.members.get(account).copied())
    }
}

/// Resolve every account in `accounts` once, retrying transient failures.
pub async fn resolve_roles(
    census: &dyn Census,
    accounts: &BTreeSet<AccountId>,
    retry: &RetryPolicy,
) -> Result<RoleTable, CollaboratorError> {
    let mut table = RoleTable::new();
    for account in accounts {
        let role = with_retry(retry, "census.role_of", || census.role_of(account)).await?;
        if let Some(role) = role {
            table.insert(account.clone(), role);
        }
    }
    Ok(table)
}
