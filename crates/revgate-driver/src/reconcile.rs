//! Reconciliation passes.
//!
//! A pass re-derives everything for one change request from the forge:
//!
//! 1. Fetch the change request, its comments and reviews
//! 2. Extract `/reviewers` invocations and resolve every relevant role
//! 3. Replay the whole history into a `PolicyStore`
//! 4. Reply to invocations not yet answered
//! 5. Aggregate reviews and evaluate readiness
//! 6. Toggle the ready label if it disagrees with readiness
//! 7. Record watermark and readiness in the context
//!
//! Passes for the same change request are serialized by a per-request lock.
//! A pass that sees a newer ticket after fetching gives up before any side
//! effect; the newer pass does the work.

use crate::census::{Census, resolve_roles};
use crate::config::GateConfig;
use crate::error::DriverError;
use crate::forge::Forge;
use crate::history::{Invocation, commands, extract_invocations};
use crate::reply::{answered_sources, gate_blocked_message, render_reply};
use crate::retry::{RetryPolicy, with_retry};
use revgate_kernel::{
    AccountId, ApprovalTally, BlockReason, CommandDecision, CommandSource, Gate, GateAction,
    GateDecision, PolicyStore, Readiness, ReviewPolicy, aggregate_reviews, evaluate_readiness,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Attempts `check_gate` makes before giving up on a busy change request.
pub const MAX_GATE_ATTEMPTS: u32 = 3;

/// What the driver remembers about one change request between passes.
///
/// Losing it is harmless: markers in the bot's comments and the label on
/// the change request let a fresh context reach the same result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeRequestContext {
    /// Highest comment sequence already processed.
    pub watermark: Option<u64>,
    pub readiness: Option<Readiness>,
    /// Label state as of the end of the last pass.
    pub observed_ready: Option<bool>,
    pub passes: u64,
}

#[derive(Debug, Default)]
struct Slot {
    latest_ticket: AtomicU64,
    context: tokio::sync::Mutex<ChangeRequestContext>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub change_request: String,
    pub pass: u64,
    pub policy: ReviewPolicy,
    pub decisions: Vec<CommandDecision>,
    pub tally: ApprovalTally,
    pub readiness: Readiness,
    /// Source keys replied to during this pass.
    pub replies: Vec<String>,
    /// `Some(ready)` when the label was written this pass.
    pub label_change: Option<bool>,
    pub watermark: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(Box<PassReport>),
    /// A newer pass was requested while this one was fetching.
    Superseded { ticket: u64 },
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::Superseded { .. } => None,
        }
    }
}

/// Answer given to an integration or sponsorship flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum GateResponse {
    Allowed,
    Blocked { reason: BlockReason, message: String },
}

impl GateResponse {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateResponse::Allowed)
    }
}

pub struct Reconciler {
    forge: Arc<dyn Forge>,
    census: Arc<dyn Census>,
    config: GateConfig,
    retry: RetryPolicy,
    slots: Mutex<BTreeMap<String, Arc<Slot>>>,
}

impl Reconciler {
    pub fn new(forge: Arc<dyn Forge>, census: Arc<dyn Census>, config: GateConfig) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        Self {
            forge,
            census,
            config,
            retry,
            slots: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    fn slot(&self, id: &str) -> Arc<Slot> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(id.to_string()).or_default().clone()
    }

    /// Start tracking `id` for the poll loop.
    pub fn track(&self, id: &str) {
        self.slot(id);
    }

    /// Forget `id`, typically once it is closed. Returns whether it was tracked.
    ///
    /// A pass already running keeps its slot until it finishes.
    pub fn untrack(&self, id: &str) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
            .is_some()
    }

    pub fn tracked(&self) -> Vec<String> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Copy of the context for `id`, waiting for any running pass.
    pub async fn context(&self, id: &str) -> ChangeRequestContext {
        self.slot(id).context.lock().await.clone()
    }

    #[instrument(skip_all, fields(change_request = %id))]
    pub async fn run_pass(&self, id: &str) -> Result<PassOutcome, DriverError> {
        let slot = self.slot(id);
        let ticket = slot.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let mut context = slot.context.lock().await;
        debug!(ticket, "pass started");

        let forge = self.forge.as_ref();
        let change = with_retry(&self.retry, "forge.change_request", || forge.change_request(id)).await?;
        let comments = with_retry(&self.retry, "forge.comments", || forge.comments(id)).await?;
        let reviews = with_retry(&self.retry, "forge.reviews", || forge.reviews(id)).await?;

        let bot = &self.config.bot_account;
        let invocations = extract_invocations(&change, &comments, bot);
        let history = commands(&invocations);

        let mut accounts: BTreeSet<AccountId> = BTreeSet::new();
        accounts.insert(change.author.clone());
        accounts.extend(history.iter().map(|command| command.actor.clone()));
        accounts.extend(reviews.iter().map(|review| review.reviewer.clone()));
        let roles = resolve_roles(self.census.as_ref(), &accounts, &self.retry).await?;

        let latest = slot.latest_ticket.load(Ordering::SeqCst);
        if latest != ticket {
            info!(ticket, latest, "pass superseded");
            return Ok(PassOutcome::Superseded { ticket });
        }

        let store = PolicyStore::replay(ReviewPolicy::default(), &history, &change.author, &roles);

        let answered = answered_sources(&comments, bot);
        let mut replies = Vec::new();
        for invocation in &invocations {
            if !needs_reply(invocation, context.watermark, &answered) {
                continue;
            }
            let key = invocation.source.key();
            let body = render_reply(invocation, store.decision_for(&invocation.source));
            with_retry(&self.retry, "forge.post_comment", || {
                forge.post_comment(id, &body)
            })
            .await?;
            info!(source = %key, actor = %invocation.actor, "replied to command");
            replies.push(key);
        }

        let tally = aggregate_reviews(
            &reviews,
            store.policy().per_role_minimum().keys().copied(),
            &roles,
        );
        let readiness = evaluate_readiness(store.policy(), &tally);

        let label = self.config.ready_label.as_str();
        let observed = change.has_label(label);
        let label_change = if observed != readiness.ready {
            with_retry(&self.retry, "forge.set_label", || {
                forge.set_label(id, label, readiness.ready)
            })
            .await?;
            info!(label, ready = readiness.ready, "ready label toggled");
            Some(readiness.ready)
        } else {
            None
        };

        // Only what was fetched: comments landing while replies are posted
        // must stay above the watermark.
        let watermark = comments
            .iter()
            .map(|comment| comment.sequence)
            .max()
            .max(context.watermark);

        context.watermark = watermark;
        context.readiness = Some(readiness.clone());
        context.observed_ready = Some(readiness.ready);
        context.passes += 1;

        info!(
            pass = context.passes,
            ready = readiness.ready,
            required = store.policy().required_total(),
            approvals = tally.total,
            replies = replies.len(),
            "pass finished"
        );

        Ok(PassOutcome::Completed(Box::new(PassReport {
            change_request: id.to_string(),
            pass: context.passes,
            policy: store.policy().clone(),
            decisions: store.decisions().to_vec(),
            tally,
            readiness,
            replies,
            label_change,
            watermark,
        })))
    }

    /// Consult the gate with a fresh pass.
    #[instrument(skip_all, fields(change_request = %id, action = action.as_str()))]
    pub async fn check_gate(&self, id: &str, action: GateAction) -> Result<GateResponse, DriverError> {
        for _ in 0..MAX_GATE_ATTEMPTS {
            let PassOutcome::Completed(report) = self.run_pass(id).await? else {
                continue;
            };
            return Ok(match Gate::new(&report.readiness).check_ready() {
                GateDecision::Allowed => GateResponse::Allowed,
                GateDecision::Blocked(reason) => {
                    let message = gate_blocked_message(action, &reason);
                    info!(%message, "gate blocked");
                    GateResponse::Blocked { reason, message }
                }
            });
        }
        Err(DriverError::GateSuperseded {
            id: id.to_string(),
            attempts: MAX_GATE_ATTEMPTS,
        })
    }
}

fn needs_reply(invocation: &Invocation, watermark: Option<u64>, answered: &BTreeSet<String>) -> bool {
    if answered.contains(&invocation.source.key()) {
        return false;
    }
    match invocation.source {
        CommandSource::Description => true,
        CommandSource::Comment { .. } => {
            watermark.is_none_or(|seen| invocation.sequence > seen)
        }
    }
}
