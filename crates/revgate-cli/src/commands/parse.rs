use crate::support::print_json;
use revgate_driver::reply::{outcome_message, success_message};
use revgate_kernel::{ParseOutcome, ReviewPolicy, parse_line};
use serde_json::json;

pub fn run(line: String, json_output: bool) {
    let outcome = parse_line(&line);
    let message = outcome.as_ref().map(|outcome| match outcome {
        ParseOutcome::Parsed(request) => success_message(&ReviewPolicy::default().apply(request)),
        other => outcome_message(other, None),
    });

    if json_output {
        print_json(&json!({
            "line": line,
            "is_command": outcome.is_some(),
            "outcome": outcome,
            "message": message,
        }));
        return;
    }

    println!("revgate parse");
    match (&outcome, &message) {
        (Some(outcome), Some(message)) => {
            let kind = match outcome {
                ParseOutcome::HelpRequested => "help".to_string(),
                ParseOutcome::Malformed { .. } => "malformed".to_string(),
                ParseOutcome::OutOfRange { bound, .. } => {
                    format!("out of range (limit {})", bound.limit())
                }
                ParseOutcome::UnknownRole { token } => format!("unknown role `{token}`"),
                ParseOutcome::Parsed(request) => match request.role {
                    Some(role) => format!("parsed: {} of role {role}", request.count),
                    None => format!("parsed: {}", request.count),
                },
            };
            println!("  Outcome: {kind}");
            println!("  Message: {message}");
        }
        _ => println!("  Not a /reviewers command"),
    }
}
