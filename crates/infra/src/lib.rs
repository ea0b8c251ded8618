//! # pilot-infra
//!
//! Infrastructure wiring and runtime composition.
//! This crate depends on `app`, `adapters`, `config`, and `shared`.

/// Local CLI entry points.
pub mod local;
/// Logger selection from the environment.
pub mod observability;
/// Adapter and use-case wiring for one workspace.
pub mod workspace;

pub use local::{
    FailureClass, ModelAction, chat_workspace, classify_failure, complete_workspace,
    index_workspace, model_lifecycle, prune_workspace, retrieve_workspace, run_chat_local,
    run_complete_local, run_index_local, run_model_local, run_prune_local, run_retrieve_local,
    show_config_local,
};
pub use observability::{LOG_FORMAT_ENV, LOG_LEVEL_ENV, logger_from_env, logger_from_map};
pub use workspace::{LocalWorkspace, load_workspace_config, workspace_relative};

pub use pilot_app::IndexSummary;
pub use pilot_config::{PilotConfig, to_pretty_json, to_pretty_toml};
pub use pilot_domain::{ChatMessage, RetrievalResult};
pub use pilot_shared::{ErrorEnvelope, redact_if_secret};

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Returns the infra crate version.
#[must_use]
pub const fn infra_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
