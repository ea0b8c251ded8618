//! # pilot-config
//!
//! Configuration schema, validation, and loading.
//! This crate depends on `domain` and `shared` only.

/// `PILOT_*` environment overrides.
pub mod env;
/// Config loading helpers (file + env).
pub mod load;
/// Configuration schema types and validation.
pub mod schema;
/// Index storage location.
pub mod storage;

pub use env::{EnvParseError, PilotEnv, apply_env_overrides};
pub use load::{
    discover_config_file, load_config_from_path, load_config_std_env, to_pretty_json,
    to_pretty_toml,
};
pub use schema::{
    CURRENT_CONFIG_VERSION, ChatConfig, CompletionConfig, ConfigSchemaError, DEFAULT_SERVER_URL,
    IndexingConfig, ModelConfig, PilotConfig, PromptConfig, ValidatedPilotConfig,
    parse_pilot_config_json, parse_pilot_config_toml,
};
pub use storage::{INDEX_FILE_NAME, IndexStorageMode, PROJECT_STATE_DIR};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
