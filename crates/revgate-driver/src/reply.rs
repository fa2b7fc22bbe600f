//! Reply wording and the hidden markers that tie replies to commands.
//!
//! Every reply ends with `<!-- revgate-reply: {source-key} -->`. Scanning the
//! bot's own comments for that marker is how a fresh process knows which
//! commands were already answered.

use crate::forge::Comment;
use crate::history::Invocation;
use regex::Regex;
use revgate_kernel::{
    AccountId, BlockReason, Bound, CommandDecision, CommandSource, Decision, DenialReason, GateAction,
    MAX_REQUIRED_REVIEWERS, MIN_REQUIRED_REVIEWERS, ParseOutcome, ReadinessExplanation,
    ReviewPolicy, Role,
};
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<!-- revgate-reply: (\S+) -->").expect("reply marker regex must compile")
    })
}

pub fn marker(source: &CommandSource) -> String {
    format!("<!-- revgate-reply: {} -->", source.key())
}

/// Source keys already answered by a bot comment.
pub fn answered_sources(comments: &[Comment], bot: &AccountId) -> BTreeSet<String> {
    comments
        .iter()
        .filter(|comment| &comment.author == bot)
        .flat_map(|comment| {
            marker_re()
                .captures_iter(&comment.body)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn help_text() -> String {
    let roles: Vec<&str> = Role::ALL.iter().map(|role| role.as_str()).collect();
    format!(
        "Usage: `/reviewers <n> [<role>]` where `<n>` is the number of required reviewers \
         and `<role>` is an optional role (one of {}). `<n>` must be between {} and {}.",
        roles.join(", "),
        MIN_REQUIRED_REVIEWERS,
        MAX_REQUIRED_REVIEWERS
    )
}

pub fn success_message(policy: &ReviewPolicy) -> String {
    let total = policy.required_total();
    if !policy.has_role_minimums() && total > 1 {
        return format!(
            "The number of required reviews for this PR is now set to {total} (with at least 1 of role reviewers)."
        );
    }

    let mut message = format!("The number of required reviews for this PR is now set to {total}.");
    for (role, minimum) in policy.per_role_minimum().iter().rev() {
        message.push_str(&format!(
            " At least {minimum} of them must have the role {role}."
        ));
    }
    message
}

pub fn denial_message(reason: DenialReason) -> String {
    match reason {
        DenialReason::NotPermitted => {
            "Only committers and the author of this PR may change the number of required reviewers."
                .to_string()
        }
        DenialReason::AuthorCannotDecrease => {
            "Cannot decrease the number of required reviewers: the author of a PR may only raise \
             the requirement. Ask a reviewer or the lead to lower it."
                .to_string()
        }
        DenialReason::DecreaseNotPermitted => {
            "Cannot decrease the number of required reviewers: only reviewers and the lead may \
             lower the requirement."
                .to_string()
        }
    }
}

/// Message body for one invocation: its parse outcome, or the decision the
/// replay recorded for it.
pub fn outcome_message(outcome: &ParseOutcome, decision: Option<&CommandDecision>) -> String {
    match outcome {
        ParseOutcome::HelpRequested => help_text(),
        ParseOutcome::Malformed { arguments } => format!(
            "Could not parse `{arguments}` as a number of reviewers.\n\n{}",
            help_text()
        ),
        ParseOutcome::OutOfRange {
            requested,
            bound: Bound::Upper,
            ..
        } => format!(
            "Cannot increase the required number of reviewers above {} (requested: {requested})",
            Bound::Upper.limit()
        ),
        ParseOutcome::OutOfRange {
            bound: Bound::Lower,
            role,
            ..
        } => format!(
            "Number of required reviewers of role {role} cannot be decreased below {}",
            Bound::Lower.limit()
        ),
        ParseOutcome::UnknownRole { token } => format!(
            "Unknown role `{token}` specified. Valid roles are {}.",
            Role::ALL
                .iter()
                .map(|role| role.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        ParseOutcome::Parsed(_) => match decision {
            Some(CommandDecision {
                decision: Decision::Applied { .. },
                after,
                ..
            }) => success_message(after),
            Some(CommandDecision {
                decision: Decision::Denied { reason },
                ..
            }) => denial_message(*reason),
            None => help_text(),
        },
    }
}

/// Full reply: mention, message, marker.
pub fn render_reply(invocation: &Invocation, decision: Option<&CommandDecision>) -> String {
    format!(
        "@{} {}\n{}",
        invocation.actor,
        outcome_message(&invocation.outcome, decision),
        marker(&invocation.source)
    )
}

fn shortfall_lines(explanation: &ReadinessExplanation) -> Vec<String> {
    let mut lines = Vec::new();
    if !explanation.total.is_met() {
        lines.push(format!(
            "- {} of {} required approvals",
            explanation.total.actual, explanation.total.required
        ));
    }
    for shortfall in &explanation.unmet_roles {
        lines.push(format!(
            "- {} of {} required approvals of role {}",
            shortfall.requirement.actual, shortfall.requirement.required, shortfall.role
        ));
    }
    lines
}

/// Message for a gate-consuming command that was refused.
pub fn gate_blocked_message(action: GateAction, reason: &BlockReason) -> String {
    let headline = match action {
        GateAction::Integrate => "Your pull request has not yet been marked as ready for integration.",
        GateAction::Sponsor => "This PR has not yet been marked as ready for integration.",
    };
    let details = match reason {
        BlockReason::NotEvaluated => vec!["- review requirements have not been evaluated yet".to_string()],
        BlockReason::Unready { explanation } => shortfall_lines(explanation),
    };
    if details.is_empty() {
        return headline.to_string();
    }
    format!("{headline}\n\n{}", details.join("\n"))
}
