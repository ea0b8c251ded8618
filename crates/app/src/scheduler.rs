//! Completion request scheduling.
//!
//! Every new request cancels the previous one, whether it is still waiting
//! out the debounce window or already talking to the model. The operation
//! runs under a context that is cancelled by either the host or a newer
//! request. "Newer" means claimed later with [`CompletionScheduler::begin`],
//! regardless of which task gets to run first.

use pilot_domain::{CompletionEvent, CompletionState};
use pilot_shared::{
    CancellationToken, DebounceClaim, Debouncer, RequestContext, Result, ScheduleOutcome,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Outcome of one scheduled request with the state it ended in.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCompletion<T> {
    /// Terminal outcome.
    pub outcome: ScheduleOutcome<T>,
    /// Terminal lifecycle state.
    pub state: CompletionState,
}

/// A request that holds the newest slot but has not run yet.
#[derive(Debug)]
#[must_use = "a claimed completion does nothing until passed to `CompletionScheduler::run`"]
pub struct CompletionTicket {
    ticket: u64,
    supersede: CancellationToken,
    debounce: DebounceClaim,
}

#[derive(Debug)]
struct InFlight {
    ticket: u64,
    supersede: CancellationToken,
}

/// Debounces completion requests and keeps at most one of them alive.
#[derive(Debug)]
pub struct CompletionScheduler {
    debouncer: Debouncer,
    next_ticket: AtomicU64,
    issued_total: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
}

impl CompletionScheduler {
    /// Scheduler with a quiet window of `delay`.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(delay),
            next_ticket: AtomicU64::new(0),
            issued_total: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    /// Number of requests that reached the model call.
    #[must_use]
    pub fn issued_count(&self) -> u64 {
        self.issued_total.load(Ordering::SeqCst)
    }

    /// Cancel whatever request is pending or in flight.
    pub fn cancel_in_flight(&self) {
        if let Some(prior) = self.lock_in_flight().take() {
            prior.supersede.cancel();
        }
    }

    /// Schedule `op`, superseding any earlier request.
    ///
    /// `op` receives the merged context and must check it at each
    /// suspension point. A value produced after cancellation is discarded.
    pub async fn schedule<T, F, Fut>(&self, host: &RequestContext, op: F) -> ScheduledCompletion<T>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let claimed = self.begin();
        self.run(claimed, host, op).await
    }

    /// Claim the newest slot now, superseding or cancelling the previous
    /// request.
    pub fn begin(&self) -> CompletionTicket {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let supersede = CancellationToken::new();
        let prior = self.lock_in_flight().replace(InFlight {
            ticket,
            supersede: supersede.clone(),
        });
        if let Some(prior) = prior {
            tracing::debug!(cancelled = prior.ticket, by = ticket, "completion request replaced");
            prior.supersede.cancel();
        }
        CompletionTicket {
            ticket,
            supersede,
            debounce: self.debouncer.claim(),
        }
    }

    /// [`CompletionScheduler::schedule`] for a slot claimed with
    /// [`CompletionScheduler::begin`].
    pub async fn run<T, F, Fut>(
        &self,
        claimed: CompletionTicket,
        host: &RequestContext,
        op: F,
    ) -> ScheduledCompletion<T>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let CompletionTicket {
            ticket,
            supersede,
            debounce,
        } = claimed;
        let ctx = host.merged_with(&supersede);
        let issued = AtomicBool::new(false);
        let outcome = self
            .debouncer
            .run_claimed(debounce, &ctx, || {
                issued.store(true, Ordering::SeqCst);
                self.issued_total.fetch_add(1, Ordering::SeqCst);
                op(ctx.clone())
            })
            .await;
        self.clear_if_current(ticket);

        let outcome = match outcome {
            ScheduleOutcome::Completed(_) | ScheduleOutcome::Failed(_) if ctx.is_cancelled() => {
                ScheduleOutcome::Cancelled
            },
            other => other,
        };
        let state = settle(issued.load(Ordering::SeqCst), &outcome);
        tracing::debug!(ticket, state = %state, "completion request settled");
        ScheduledCompletion { outcome, state }
    }

    fn clear_if_current(&self, ticket: u64) {
        let mut in_flight = self.lock_in_flight();
        if in_flight.as_ref().is_some_and(|current| current.ticket == ticket) {
            *in_flight = None;
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn settle<T>(issued: bool, outcome: &ScheduleOutcome<T>) -> CompletionState {
    let mut state = CompletionState::Created;
    if issued {
        state = state.apply(CompletionEvent::Issue).unwrap_or(state);
    }
    let event = match outcome {
        ScheduleOutcome::Completed(_) => CompletionEvent::Complete,
        ScheduleOutcome::Failed(_) => CompletionEvent::Fail,
        ScheduleOutcome::Superseded | ScheduleOutcome::Cancelled => CompletionEvent::Cancel,
    };
    state.apply(event).unwrap_or(state)
}
