//! Trailing debounce with single-slot supersession.
//!
//! Each [`Debouncer::run`] call waits for a quiet window of `delay`. A call
//! that arrives while an earlier one is still waiting replaces it: the earlier
//! caller resolves with [`ScheduleOutcome::Superseded`] instead of hanging.
//! Once a call's timer fires it runs to completion; later calls only
//! compete with each other.
//!
//! Callers that hand the wait off to another task should [`Debouncer::claim`]
//! first, so the slot is taken in call order rather than task order.

use crate::{CancellationToken, ErrorEnvelope, RequestContext, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Terminal outcome of a scheduled operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome<T> {
    /// The operation ran and produced a value.
    Completed(T),
    /// A newer call replaced this one before it ran.
    Superseded,
    /// The caller's cancellation fired first.
    Cancelled,
    /// The operation ran and failed.
    Failed(ErrorEnvelope),
}

impl<T> ScheduleOutcome<T> {
    /// Fold an operation result, keeping cancellation and supersession distinct
    /// from real failures.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(error) if error.is_cancelled() => Self::Cancelled,
            Err(error) if error.is_superseded() => Self::Superseded,
            Err(error) => Self::Failed(error),
        }
    }

    /// Returns true for [`ScheduleOutcome::Completed`].
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Map the completed value.
    pub fn map<U>(self, op: impl FnOnce(T) -> U) -> ScheduleOutcome<U> {
        match self {
            Self::Completed(value) => ScheduleOutcome::Completed(op(value)),
            Self::Superseded => ScheduleOutcome::Superseded,
            Self::Cancelled => ScheduleOutcome::Cancelled,
            Self::Failed(error) => ScheduleOutcome::Failed(error),
        }
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Pending {
    generation: u64,
    supersede: CancellationToken,
}

/// A slot taken in a [`Debouncer`] that has not started waiting yet.
///
/// A later claim supersedes this one even before it runs.
#[derive(Debug)]
#[must_use = "a claim does nothing until passed to `Debouncer::run_claimed`"]
pub struct DebounceClaim {
    generation: u64,
    supersede: CancellationToken,
}

#[derive(Debug, Default)]
struct DebounceState {
    generation: AtomicU64,
    pending: Mutex<Option<Pending>>,
}

/// Trailing debouncer; clones share the same pending slot.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    state: Arc<DebounceState>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(DebounceState::default()),
        }
    }

    /// Quiet window length.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait out the quiet window, then run `op` unless superseded or cancelled.
    pub async fn run<T, F, Fut>(&self, ctx: &RequestContext, op: F) -> ScheduleOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let claim = self.claim();
        self.run_claimed(claim, ctx, op).await
    }

    /// Take the pending slot now, superseding whatever holds it.
    pub fn claim(&self) -> DebounceClaim {
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let supersede = CancellationToken::new();
        let previous = self.lock_pending().replace(Pending {
            generation,
            supersede: supersede.clone(),
        });
        if let Some(previous) = previous {
            tracing::debug!(
                superseded = previous.generation,
                by = generation,
                "debounced call superseded"
            );
            previous.supersede.cancel();
        }
        DebounceClaim {
            generation,
            supersede,
        }
    }

    /// [`Debouncer::run`] for a slot taken earlier with [`Debouncer::claim`].
    pub async fn run_claimed<T, F, Fut>(
        &self,
        claim: DebounceClaim,
        ctx: &RequestContext,
        op: F,
    ) -> ScheduleOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let DebounceClaim {
            generation,
            supersede,
        } = claim;
        tokio::select! {
            biased;
            () = supersede.cancelled() => return ScheduleOutcome::Superseded,
            () = ctx.cancelled() => {
                self.clear_if_current(generation);
                return ScheduleOutcome::Cancelled;
            },
            () = tokio::time::sleep(self.delay) => {},
        }

        if !self.clear_if_current(generation) {
            return ScheduleOutcome::Superseded;
        }
        ScheduleOutcome::from_result(op().await)
    }

    fn clear_if_current(&self, generation: u64) -> bool {
        let mut pending = self.lock_pending();
        if pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation)
        {
            *pending = None;
            true
        } else {
            false
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<Pending>> {
        self.state
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
