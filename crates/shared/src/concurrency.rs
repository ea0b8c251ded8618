//! Cancellation tokens and request-scoped context.
//!
//! Cancellation is cooperative: holders poll [`CancellationToken::is_cancelled`]
//! or await [`CancellationToken::cancelled`] at their suspension points. A token
//! never reverts once cancelled.
//!
//! [`CancellationToken::merge`] builds a token that fires as soon as either
//! source fires. Completion requests use it to combine the host's signal
//! (cursor moved) with the internal "newer request supersedes older" signal.

use crate::{ErrorCode, ErrorEnvelope, Result};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::Notify;

/// A correlation identifier used for logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Parse a correlation identifier from user input.
    ///
    /// The value is trimmed; empty values are rejected.
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "correlationId must be non-empty",
            ));
        }
        Ok(Self(Arc::from(trimmed)))
    }

    /// Create a new request id, unique within this process.
    #[must_use]
    pub fn new_request_id() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(Arc::from(format!("req_{n}")))
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A clonable cancellation token that can be awaited.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationState>,
}

#[derive(Debug, Default)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: Notify,
    dependents: Mutex<Vec<Weak<Self>>>,
}

impl CancellationState {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.notify.notify_waiters();

        let dependents = std::mem::take(
            &mut *self
                .dependents
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for dependent in dependents.iter().filter_map(Weak::upgrade) {
            dependent.cancel();
        }
    }

    fn attach(&self, dependent: &Arc<Self>) {
        {
            let mut dependents = self
                .dependents
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            dependents.retain(|weak| weak.strong_count() > 0);
            dependents.push(Arc::downgrade(dependent));
        }
        // `cancel` sets the flag before draining, so a concurrent cancel either
        // sees the dependent in the list or is observed here.
        if self.cancelled.load(Ordering::SeqCst) {
            dependent.cancel();
        }
    }
}

impl CancellationToken {
    /// Create a new token in the non-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState::default()),
        }
    }

    /// Token that is cancelled as soon as `first` or `second` is cancelled.
    ///
    /// Cancelling the merged token directly does not propagate back to the sources.
    #[must_use]
    pub fn merge(first: &Self, second: &Self) -> Self {
        let merged = Self::new();
        first.inner.attach(&merged.inner);
        second.inner.attach(&merged.inner);
        merged
    }

    /// Token cancelled together with `self`, but cancellable on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        let child = Self::new();
        self.inner.attach(&child.inner);
        child
    }

    /// Cancel the token, its dependents, and wake all waiters.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Returns true if the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Request-scoped context passed across boundaries.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: CorrelationId,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a new request context with a fresh cancellation token.
    #[must_use]
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self::with_cancellation(correlation_id, CancellationToken::new())
    }

    /// Context with an auto-generated `req_*` id.
    #[must_use]
    pub fn new_request() -> Self {
        Self::new(CorrelationId::new_request_id())
    }

    /// Context sharing an existing cancellation token.
    #[must_use]
    pub const fn with_cancellation(
        correlation_id: CorrelationId,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            correlation_id,
            cancellation,
        }
    }

    /// Same correlation id, cancelled when either this context or `other` is.
    #[must_use]
    pub fn merged_with(&self, other: &CancellationToken) -> Self {
        Self::with_cancellation(
            self.correlation_id.clone(),
            CancellationToken::merge(&self.cancellation, other),
        )
    }

    /// Return the correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Return a clone of the cancellation token.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Returns true if the request was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancel this request.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Await cancellation.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    /// Return a cancellation error when cancelled, tagged with the operation.
    pub fn ensure_not_cancelled(&self, operation: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(ErrorEnvelope::cancelled("operation cancelled")
                .with_metadata("operation", operation));
        }
        Ok(())
    }
}
