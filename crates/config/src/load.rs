//! Config loading: defaults < file < env.

use crate::env::{PilotEnv, apply_env_overrides};
use crate::schema::{PilotConfig, ValidatedPilotConfig};
use crate::storage::PROJECT_STATE_DIR;
use pilot_shared::{ErrorClass, ErrorCode, ErrorEnvelope};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

/// Load config from an optional file path, then apply env overrides.
pub fn load_config_from_path(
    config_path: Option<&Path>,
    env: &PilotEnv,
) -> Result<ValidatedPilotConfig, ErrorEnvelope> {
    let config = match config_path {
        None => PilotConfig::default(),
        Some(path) => {
            let format = detect_config_format(path)?;
            let text = read_config_file(path)?;
            parse_config_unvalidated(&text, format)?
        },
    };
    apply_env_overrides(config, env)
}

/// Load config using the process environment.
pub fn load_config_std_env(config_path: Option<&Path>) -> Result<ValidatedPilotConfig, ErrorEnvelope> {
    let env = PilotEnv::from_std_env().map_err(ErrorEnvelope::from)?;
    load_config_from_path(config_path, &env)
}

/// First existing `.pilot/config.toml` or `.pilot/config.json` under the workspace root.
#[must_use]
pub fn discover_config_file(workspace_root: &Path) -> Option<PathBuf> {
    ["config.toml", "config.json"]
        .iter()
        .map(|name| workspace_root.join(PROJECT_STATE_DIR).join(name))
        .find(|path| path.is_file())
}

/// Serialize the config as pretty JSON (with trailing newline).
pub fn to_pretty_json(config: &PilotConfig) -> Result<String, ErrorEnvelope> {
    let mut output = serde_json::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::internal(),
            format!("failed to serialize config: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    output.push('\n');
    Ok(output)
}

/// Serialize the config as pretty TOML (with trailing newline).
pub fn to_pretty_toml(config: &PilotConfig) -> Result<String, ErrorEnvelope> {
    let mut output = toml::to_string_pretty(config).map_err(|error| {
        ErrorEnvelope::unexpected(
            ErrorCode::new("config", "serialize_toml"),
            format!("failed to serialize config TOML: {error}"),
            ErrorClass::NonRetriable,
        )
    })?;
    if !output.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

fn parse_config_unvalidated(input: &str, format: ConfigFormat) -> Result<PilotConfig, ErrorEnvelope> {
    match format {
        ConfigFormat::Json => serde_json::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_json"),
                format!("invalid config JSON: {error}"),
            )
        }),
        ConfigFormat::Toml => toml::from_str(input).map_err(|error| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "invalid_toml"),
                format!("invalid config TOML: {error}"),
            )
        }),
    }
}

fn read_config_file(path: &Path) -> Result<String, ErrorEnvelope> {
    std::fs::read_to_string(path).map_err(|error| {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound => "config_file_not_found",
            std::io::ErrorKind::PermissionDenied => "config_file_permission_denied",
            _ => "config_file_io",
        };
        ErrorEnvelope::expected(
            ErrorCode::new("config", code),
            format!("failed to read config file: {error}"),
        )
        .with_metadata("path", path.display().to_string())
    })
}

fn detect_config_format(path: &Path) -> Result<ConfigFormat, ErrorEnvelope> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        None | Some("json") => Ok(ConfigFormat::Json),
        Some("toml") => Ok(ConfigFormat::Toml),
        Some(other) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "unsupported_format"),
            "unsupported config format; use .json or .toml",
        )
        .with_metadata("extension", other.to_owned())),
    }
}
