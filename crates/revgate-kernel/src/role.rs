//! Census roles and account identity.
//!
//! A role is a named standing within the project. Standings are totally
//! ordered; holding a role implies holding every role below it:
//!
//! ```text
//! contributors < authors < committers < reviewers < lead
//! ```
//!
//! Role resolution is an injected capability (`RoleResolver`). The kernel never
//! talks to the census itself; adapters resolve the accounts they need for one
//! pass and hand the kernel a `RoleTable`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque platform account identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A census standing, ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "contributor")]
    Contributors,
    #[serde(alias = "author")]
    Authors,
    #[serde(alias = "committer")]
    Committers,
    #[serde(alias = "reviewer")]
    Reviewers,
    Lead,
}

/// The role bucket a `/reviewers <n>` command without a role token targets.
pub const DEFAULT_ROLE: Role = Role::Authors;

impl Role {
    /// All roles, highest standing first (the order used in help text).
    pub const ALL: [Role; 5] = [
        Role::Lead,
        Role::Reviewers,
        Role::Committers,
        Role::Authors,
        Role::Contributors,
    ];

    /// Canonical name, as used in replies.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Lead => "lead",
            Role::Reviewers => "reviewers",
            Role::Committers => "committers",
            Role::Authors => "authors",
            Role::Contributors => "contributors",
        }
    }

    /// Resolve a command token. Only canonical names and their singular
    /// aliases are accepted; matching is exact.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "lead" => Some(Role::Lead),
            "reviewers" | "reviewer" => Some(Role::Reviewers),
            "committers" | "committer" => Some(Role::Committers),
            "authors" | "author" => Some(Role::Authors),
            "contributors" | "contributor" => Some(Role::Contributors),
            _ => None,
        }
    }

    /// Whether an account holding `self` counts as holding `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_token(s).ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Capability: map an account to its census role.
///
/// `None` means the account is not (or no longer) in the census.
pub trait RoleResolver {
    fn resolve_role(&self, account: &AccountId) -> Option<Role>;
}

/// Roles resolved ahead of time for one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTable {
    roles: BTreeMap<AccountId, Role>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a role; later inserts for the same account win.
    pub fn insert(&mut self, account: AccountId, role: Role) -> Option<Role> {
        self.roles.insert(account, role)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl FromIterator<(AccountId, Role)> for RoleTable {
    fn from_iter<I: IntoIterator<Item = (AccountId, Role)>>(iter: I) -> Self {
        Self {
            roles: iter.into_iter().collect(),
        }
    }
}

impl RoleResolver for RoleTable {
    fn resolve_role(&self, account: &AccountId) -> Option<Role> {
        self.roles.get(account).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standing_is_totally_ordered() {
        assert!(Role::Lead.satisfies(Role::Reviewers));
        assert!(Role::Reviewers.satisfies(Role::Committers));
        assert!(Role::Committers.satisfies(Role::Authors));
        assert!(Role::Authors.satisfies(Role::Contributors));
        assert!(!Role::Reviewers.satisfies(Role::Lead));
        assert!(Role::Committers.satisfies(Role::Committers));
    }

    #[test]
    fn tokens_accept_canonical_and_singular_names_only() {
        assert_eq!(Role::from_token("reviewers"), Some(Role::Reviewers));
        assert_eq!(Role::from_token("reviewer"), Some(Role::Reviewers));
        assert_eq!(Role::from_token("lead"), Some(Role::Lead));
        assert_eq!(Role::from_token("Lead"), None);
        assert_eq!(Role::from_token("leads"), None);
        assert_eq!(Role::from_token("penguins"), None);
    }

    #[test]
    fn role_table_reports_unknown_accounts_as_none() {
        let table: RoleTable = [(AccountId::from("alice"), Role::Reviewers)]
            .into_iter()
            .collect();
        assert_eq!(
            table.resolve_role(&AccountId::from("alice")),
            Some(Role::Reviewers)
        );
        assert_eq!(table.resolve_role(&AccountId::from("mallory")), None);
    }

    #[test]
    fn role_deserializes_singular_alias() {
        let role: Role = serde_json::from_str("\"committer\"").expect("alias should parse");
        assert_eq!(role, Role::Committers);
    }
}
