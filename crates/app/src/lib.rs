//! # pilot-app
//!
//! Application use cases: chunking, incremental indexing, retrieval,
//! completion scheduling and orchestration, chat, and the workspace session
//! that ties them to host events.
//! This crate depends on `ports`, `domain`, `shared`, and `vector`.

pub mod chat;
pub mod chunker;
pub mod handle;
pub mod indexer;
pub mod orchestrator;
pub mod postprocess;
pub mod prompt;
pub mod retriever;
pub mod scheduler;
pub mod session;
pub mod ui;

pub use chat::{ChatDeps, ChatSession};
pub use chunker::{Chunker, DEFAULT_CHUNK_LINES};
pub use handle::IndexHandle;
pub use indexer::{FileFailure, IndexSummary, Indexer, IndexerDeps, IndexerSettings};
pub use orchestrator::{CompletionDeps, CompletionOrchestrator, CompletionSettings};
pub use postprocess::{extract_code, postprocess, strip_overlap};
pub use prompt::{DEFAULT_CONTEXT_LINES, chat_context_message, completion_prompt, last_lines};
pub use retriever::{DEFAULT_TOP_K, Retriever, format_context, rank};
pub use scheduler::{CompletionScheduler, CompletionTicket, ScheduledCompletion};
pub use session::{SessionDeps, SessionSettings, WorkspaceEvent, WorkspaceSession};
pub use ui::decode_ui_message;

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_domain::domain_crate_version;
    use pilot_ports::ports_crate_version;
    use pilot_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]";
                continue;
            }
            if in_deps && line.starts_with("pilot-") {
                let key = line.split('=').next().unwrap_or("").trim();
                deps.push(key.split('.').next().unwrap_or("").trim().to_owned());
            }
        }

        deps
    }

    #[test]
    fn app_depends_only_on_inner_layers() {
        let allowed = ["pilot-ports", "pilot-domain", "pilot-shared", "pilot-vector"];
        for dep in workspace_deps() {
            assert!(allowed.contains(&dep.as_str()), "unexpected dependency found: {dep}");
        }
    }

    #[test]
    fn app_can_use_ports_domain_shared() {
        assert!(!app_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
