//! Property tests: the command grammar and the policy fold.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use revgate_kernel::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Contributors),
        Just(Role::Authors),
        Just(Role::Committers),
        Just(Role::Reviewers),
        Just(Role::Lead),
    ]
}

fn arb_request() -> impl Strategy<Value = ReviewerRequest> {
    (0u8..=10, proptest::option::of(arb_role()))
        .prop_map(|(count, role)| ReviewerRequest { count, role })
}

fn arb_actor() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("author"),
        Just("committer"),
        Just("reviewer"),
        Just("lead"),
        Just("outsider"),
    ]
}

fn arb_history(max: usize) -> impl Strategy<Value = Vec<Command>> {
    prop::collection::vec((arb_actor(), arb_request()), 0..max).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(index, (actor, request))| Command {
                actor: AccountId::from(actor),
                request,
                raw_text: format!("/reviewers {}", request.count),
                source: CommandSource::Comment {
                    id: format!("c{index}"),
                },
                timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + index as i64, 0)
                    .expect("valid timestamp"),
                sequence: index as u64,
            })
            .collect()
    })
}

fn census() -> RoleTable {
    [
        (AccountId::from("author"), Role::Authors),
        (AccountId::from("committer"), Role::Committers),
        (AccountId::from("reviewer"), Role::Reviewers),
        (AccountId::from("lead"), Role::Lead),
        (AccountId::from("outsider"), Role::Contributors),
    ]
    .into_iter()
    .collect()
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn in_range_count_sets_total(count in 0i64..=10) {
        let outcome = parse_line(&format!("/reviewers {count}"));
        let Some(ParseOutcome::Parsed(request)) = outcome else {
            return Err(TestCaseError::fail(format!("not parsed: {outcome:?}")));
        };

        let store = PolicyStore::replay(
            ReviewPolicy::default(),
            &[Command {
                actor: AccountId::from("reviewer"),
                request,
                raw_text: format!("/reviewers {count}"),
                source: CommandSource::Description,
                timestamp: DateTime::<Utc>::from_timestamp(0, 0).expect("valid timestamp"),
                sequence: 0,
            }],
            &AccountId::from("author"),
            &census(),
        );
        prop_assert_eq!(i64::from(store.policy().required_total()), count);
    }

    #[test]
    fn count_above_upper_bound_is_rejected(count in 11i64..100_000) {
        let outcome = parse_line(&format!("/reviewers {count}"));
        let is_upper = matches!(
            outcome,
            Some(ParseOutcome::OutOfRange { bound: Bound::Upper, .. })
        );
        prop_assert!(is_upper);
    }

    #[test]
    fn negative_count_is_rejected(count in -100_000i64..0, role in arb_role()) {
        let outcome = parse_line(&format!("/reviewers {count} {role}"));
        prop_assert_eq!(
            outcome,
            Some(ParseOutcome::OutOfRange {
                requested: count,
                bound: Bound::Lower,
                role,
            })
        );
    }

    #[test]
    fn unrecognized_role_token_is_reported(
        token in "[a-z]{3,12}".prop_filter("must not be a role", |t| Role::from_token(t).is_none())
    ) {
        let outcome = parse_line(&format!("/reviewers 2 {token}"));
        prop_assert_eq!(outcome, Some(ParseOutcome::UnknownRole { token }));
    }

    #[test]
    fn lines_without_leading_trigger_are_ignored(prefix in "[a-z]{1,8}", count in 0u8..=10) {
        prop_assert_eq!(parse_line(&format!("{prefix} /reviewers {count}")), None);
    }
}

// ---------------------------------------------------------------------------
// Policy fold
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn replay_is_deterministic(history in arb_history(12)) {
        let author = AccountId::from("author");
        let first = PolicyStore::replay(ReviewPolicy::default(), &history, &author, &census());
        let second = PolicyStore::replay(ReviewPolicy::default(), &history, &author, &census());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn replay_ignores_delivery_order(
        (history, shuffled) in arb_history(12).prop_flat_map(|history| {
            let shuffled = Just(history.clone()).prop_shuffle();
            (Just(history), shuffled)
        })
    ) {
        let author = AccountId::from("author");
        let ordered = PolicyStore::replay(ReviewPolicy::default(), &history, &author, &census());
        let delivered = PolicyStore::replay(ReviewPolicy::default(), &shuffled, &author, &census());
        prop_assert_eq!(ordered.policy(), delivered.policy());
        prop_assert_eq!(ordered.decisions(), delivered.decisions());
    }

    #[test]
    fn role_minimums_never_exceed_total(history in arb_history(16)) {
        let store = PolicyStore::replay(
            ReviewPolicy::default(),
            &history,
            &AccountId::from("author"),
            &census(),
        );
        for decision in store.decisions() {
            let policy = &decision.after;
            prop_assert!(policy.required_total() <= 10);
            for minimum in policy.per_role_minimum().values() {
                prop_assert!(*minimum >= 1);
                prop_assert!(*minimum <= policy.required_total());
            }
        }
    }

    #[test]
    fn author_never_lowers(history in arb_history(16)) {
        let store = PolicyStore::replay(
            ReviewPolicy::default(),
            &history,
            &AccountId::from("author"),
            &census(),
        );
        for decision in store.decisions() {
            if decision.actor == AccountId::from("author") && decision.is_applied() {
                prop_assert_ne!(decision.before.transition_to(&decision.after), Transition::Lowers);
            }
        }
    }

    #[test]
    fn outsider_never_changes_policy(history in arb_history(16)) {
        let store = PolicyStore::replay(
            ReviewPolicy::default(),
            &history,
            &AccountId::from("author"),
            &census(),
        );
        for decision in store.decisions() {
            if decision.actor == AccountId::from("outsider") {
                prop_assert_eq!(&decision.before, &decision.after);
                prop_assert_eq!(
                    decision.decision,
                    Decision::Denied { reason: DenialReason::NotPermitted }
                );
            }
        }
    }
}
