//! Command extraction from a change request's description and comments.

use crate::forge::{ChangeRequest, Comment};
use chrono::{DateTime, Utc};
use revgate_kernel::{AccountId, Command, CommandSource, ParseOutcome, parse_line};

/// A `/reviewers` line found in a source, whatever its parse outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub source: CommandSource,
    pub actor: AccountId,
    pub raw_text: String,
    pub outcome: ParseOutcome,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
}

impl Invocation {
    /// The replayable command, when the line parsed cleanly.
    pub fn command(&self) -> Option<Command> {
        match &self.outcome {
            ParseOutcome::Parsed(request) => Some(Command {
                actor: self.actor.clone(),
                request: *request,
                raw_text: self.raw_text.clone(),
                source: self.source.clone(),
                timestamp: self.timestamp,
                sequence: self.sequence,
            }),
            _ => None,
        }
    }
}

/// First `/reviewers` line of `text`, with its outcome.
pub fn first_command_line(text: &str) -> Option<(&str, ParseOutcome)> {
    text.lines()
        .find_map(|line| parse_line(line).map(|outcome| (line.trim(), outcome)))
}

/// Every invocation, description first, then comments in platform order.
///
/// Comments authored by `bot` are skipped.
pub fn extract_invocations(
    change: &ChangeRequest,
    comments: &[Comment],
    bot: &AccountId,
) -> Vec<Invocation> {
    let mut invocations = Vec::new();

    if let Some((line, outcome)) = first_command_line(&change.description) {
        invocations.push(Invocation {
            source: CommandSource::Description,
            actor: change.author.clone(),
            raw_text: line.to_string(),
            outcome,
            timestamp: change.created_at,
            sequence: 0,
        });
    }

    let mut ordered: Vec<&Comment> = comments.iter().filter(|c| &c.author != bot).collect();
    ordered.sort_by_key(|c| (c.created_at, c.sequence));
    for comment in ordered {
        if let Some((line, outcome)) = first_command_line(&comment.body) {
            invocations.push(Invocation {
                source: CommandSource::Comment {
                    id: comment.id.clone(),
                },
                actor: comment.author.clone(),
                raw_text: line.to_string(),
                outcome,
                timestamp: comment.created_at,
                sequence: comment.sequence,
            });
        }
    }

    invocations
}

pub fn commands(invocations: &[Invocation]) -> Vec<Command> {
    invocations.iter().filter_map(Invocation::command).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use revgate_kernel::{ReviewerRequest, Role};
    use std::collections::BTreeSet;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000 + secs, 0).expect("valid timestamp")
    }

    fn change(description: &str) -> ChangeRequest {
        ChangeRequest {
            id: "42".to_string(),
            author: AccountId::from("author"),
            description: description.to_string(),
            created_at: at(0),
            labels: BTreeSet::new(),
        }
    }

    fn comment(id: &str, author: &str, body: &str, sequence: u64) -> Comment {
        Comment {
            id: id.to_string(),
            author: AccountId::from(author),
            body: body.to_string(),
            created_at: at(sequence as i64),
            sequence,
        }
    }

    #[test]
    fn description_command_comes_first() {
        let comments = vec![comment("c1", "reviewer", "/reviewers 3", 1)];
        let invocations = extract_invocations(
            &change("Fixes the parser.\n\n/reviewers 2 lead\n"),
            &comments,
            &AccountId::from("bot"),
        );
        let sources: Vec<String> = invocations.iter().map(|i| i.source.key()).collect();
        assert_eq!(sources, vec!["description", "comment:c1"]);
        assert_eq!(invocations[0].actor, AccountId::from("author"));
        assert_eq!(
            invocations[0].command().map(|c| c.request),
            Some(ReviewerRequest {
                count: 2,
                role: Some(Role::Lead)
            })
        );
    }

    #[test]
    fn only_first_matching_line_counts() {
        let text = "Looks good.\n/reviewers 2\n/reviewers 5\n";
        let (line, outcome) = first_command_line(text).expect("command present");
        assert_eq!(line, "/reviewers 2");
        assert!(matches!(outcome, ParseOutcome::Parsed(r) if r.count == 2));
    }

    #[test]
    fn bot_comments_and_prose_are_skipped() {
        let comments = vec![
            comment("c1", "bot", "/reviewers 9", 1),
            comment("c2", "reviewer", "we could use /reviewers 2 here", 2),
            comment("c3", "reviewer", "  /reviewers two", 3),
        ];
        let invocations =
            extract_invocations(&change(""), &comments, &AccountId::from("bot"));
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].source.key(), "comment:c3");
        assert!(invocations[0].command().is_none());
    }

    #[test]
    fn comments_follow_timestamp_then_sequence() {
        let mut late = comment("c9", "reviewer", "/reviewers 1", 1);
        late.created_at = at(50);
        let comments = vec![late, comment("c2", "reviewer", "/reviewers 2", 2)];
        let invocations =
            extract_invocations(&change(""), &comments, &AccountId::from("bot"));
        let ids: Vec<String> = invocations.iter().map(|i| i.source.key()).collect();
        assert_eq!(ids, vec!["comment:c2", "comment:c9"]);
        assert_eq!(commands(&invocations).len(), 2);
    }
}
