//! The `/reviewers` command grammar.
//!
//! ```text
//! /reviewers                 -> help
//! /reviewers <count>         -> set total (default role bucket)
//! /reviewers <count> <role>  -> set total and a per-role minimum
//! ```
//!
//! Parsing is a pure function of the line. Every failure is a value the
//! caller turns into a reply; nothing here is an error.

use crate::role::{AccountId, DEFAULT_ROLE, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Case-sensitive trigger token.
pub const TRIGGER: &str = "/reviewers";

/// Upper bound for any requested count.
pub const MAX_REQUIRED_REVIEWERS: i64 = 10;

/// Lower bound for any requested count.
pub const MIN_REQUIRED_REVIEWERS: i64 = 0;

/// Which bound an out-of-range count violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    Upper,
    Lower,
}

impl Bound {
    pub fn limit(self) -> i64 {
        match self {
            Bound::Upper => MAX_REQUIRED_REVIEWERS,
            Bound::Lower => MIN_REQUIRED_REVIEWERS,
        }
    }
}

/// A validated request: `count` is within bounds, `role` is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerRequest {
    pub count: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Result of parsing one command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ParseOutcome {
    HelpRequested,
    Malformed {
        arguments: String,
    },
    OutOfRange {
        requested: i64,
        bound: Bound,
        /// The role named by the command, or the default bucket.
        role: Role,
    },
    UnknownRole {
        token: String,
    },
    Parsed(ReviewerRequest),
}

/// Parse a line that may or may not be a `/reviewers` command.
///
/// Returns `None` unless the first token of the (left-trimmed) line is
/// exactly the trigger.
pub fn parse_line(line: &str) -> Option<ParseOutcome> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix(TRIGGER)?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(parse_arguments(rest))
}

/// Parse the argument part of a `/reviewers` command.
pub fn parse_arguments(arguments: &str) -> ParseOutcome {
    let tokens: Vec<&str> = arguments.split_whitespace().collect();
    let (count_token, role_token) = match tokens.as_slice() {
        [] => return ParseOutcome::HelpRequested,
        [count] => (*count, None),
        [count, role] => (*count, Some(*role)),
        _ => {
            return ParseOutcome::Malformed {
                arguments: arguments.trim().to_string(),
            };
        }
    };

    let Ok(requested) = count_token.parse::<i64>() else {
        return ParseOutcome::Malformed {
            arguments: arguments.trim().to_string(),
        };
    };

    let role = match role_token {
        Some(token) => match Role::from_token(token) {
            Some(role) => Some(role),
            None => {
                return ParseOutcome::UnknownRole {
                    token: token.to_string(),
                };
            }
        },
        None => None,
    };

    if requested > MAX_REQUIRED_REVIEWERS {
        return ParseOutcome::OutOfRange {
            requested,
            bound: Bound::Upper,
            role: role.unwrap_or(DEFAULT_ROLE),
        };
    }
    if requested < MIN_REQUIRED_REVIEWERS {
        return ParseOutcome::OutOfRange {
            requested,
            bound: Bound::Lower,
            role: role.unwrap_or(DEFAULT_ROLE),
        };
    }

    ParseOutcome::Parsed(ReviewerRequest {
        // Bounds checked above.
        count: requested as u8,
        role,
    })
}

/// Where a command was found.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandSource {
    Description,
    Comment { id: String },
}

impl CommandSource {
    /// Stable key used to correlate replies with their command.
    pub fn key(&self) -> String {
        match self {
            CommandSource::Description => "description".to_string(),
            CommandSource::Comment { id } => format!("comment:{id}"),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CommandSource::Description => 0,
            CommandSource::Comment { .. } => 1,
        }
    }
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// An accepted-by-grammar command, ready for permission checks and replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub actor: AccountId,
    pub request: ReviewerRequest,
    pub raw_text: String,
    pub source: CommandSource,
    pub timestamp: DateTime<Utc>,
    /// Platform-assigned ordering for sources sharing a timestamp.
    pub sequence: u64,
}

impl Command {
    /// Replay order: the description first, then by timestamp, then sequence.
    pub fn order_key(&self) -> (u8, DateTime<Utc>, u64) {
        (self.source.rank(), self.timestamp, self.sequence)
    }
}

/// Sort commands into replay order.
pub fn sort_commands(commands: &mut [Command]) {
    commands.sort_by_key(Command::order_key);
}
