//! # pilot-ports
//!
//! Port traits for the pilot hexagonal architecture.
//!
//! This crate defines the interfaces between the application core and the
//! outside world: embedding and model servers, workspace files, chunk
//! persistence, logging and host notifications. It depends only on `domain`
//! and `shared`.

use std::future::Future;
use std::pin::Pin;

/// Boxed future used by port traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod embedding;
pub mod logger;
pub mod model;
pub mod notify;
pub mod store;
pub mod workspace;

pub use embedding::*;
pub use logger::*;
pub use model::*;
pub use notify::*;
pub use store::*;
pub use workspace::*;

// Domain types used in port signatures, so adapters need not depend on
// `pilot-domain` directly.
pub use pilot_domain::{ChatMessage, ChatRole, Chunk, IndexSnapshot, ModelName, Mtime};
