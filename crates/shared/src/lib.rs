//! # pilot-shared
//!
//! Foundational types used by every other crate in the workspace:
//!
//! - [`ErrorEnvelope`] and the [`Result`] alias
//! - [`CancellationToken`] (with merge) and [`RequestContext`]
//! - [`Debouncer`] and [`ScheduleOutcome`]
//! - secret redaction helpers
//!
//! This crate has no workspace dependencies.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod concurrency;
pub mod debounce;
pub mod errors;
pub mod redaction;
pub mod result;

pub use concurrency::{CancellationToken, CorrelationId, RequestContext};
pub use debounce::{DebounceClaim, Debouncer, ScheduleOutcome};
pub use errors::{
    ErrorClass, ErrorCode, ErrorEnvelope, ErrorKind, ErrorMetadata, UnexpectedError,
    normalize_unexpected_error,
};
pub use redaction::{REDACTED, is_secret_key, redact_if_secret, redact_url_credentials};
pub use result::Result;

/// Returns the shared crate version.
#[must_use]
pub const fn shared_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_version_is_set() {
        assert!(!shared_crate_version().is_empty());
    }

    #[test]
    fn shared_error_types_are_available() {
        let error = ErrorEnvelope::expected(ErrorCode::invalid_input(), "invalid");
        assert_eq!(error.kind, ErrorKind::Expected);
        assert_eq!(error.class, ErrorClass::NonRetriable);
    }
}
