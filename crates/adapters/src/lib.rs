//! # pilot-adapters
//!
//! Adapter implementations for ports: Ollama embedding and model service,
//! local workspace files, the JSON chunk store, logging and notifications.
//! This crate depends on `ports`, `config`, `domain` and `shared`.

pub mod chunk_store;
pub mod fs;
pub mod log_sink;
pub mod logger;
pub mod notify;
/// Ollama HTTP adapters.
#[cfg(feature = "ollama")]
pub mod ollama;

pub use chunk_store::JsonChunkStore;
pub use embedding_test::TestEmbedding;
pub use fs::LocalWorkspaceFiles;
pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::JsonLogger;
pub use notify::{ChannelNotifier, LoggingNotifier};
#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaEmbedding, OllamaModelService, OllamaTransport};

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilot_config::config_crate_version;
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
                in_deps = line == "[dependencies]" || line == "[dev-dependencies]";
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
    fn adapters_do_not_depend_on_app_or_infra() {
        let forbidden = ["pilot-app", "pilot-infra", "pilot-vector"];
        for dep in workspace_deps() {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
    }

    #[test]
    fn adapters_can_use_ports_config_shared() {
        assert!(!adapters_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!config_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
