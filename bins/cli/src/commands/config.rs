//! Config command handler.

use super::WorkspaceArgs;
use crate::CliOutput;
use crate::error::CliError;
use crate::format::{OutputMode, error_output, ok_json, ok_output};
use pilot_infra::{show_config_local, to_pretty_toml};

/// Print the effective config with credentials masked.
pub fn run_config_show(
    mode: OutputMode,
    workspace: WorkspaceArgs<'_>,
) -> Result<CliOutput, CliError> {
    let config = match show_config_local(workspace.root, workspace.config_path) {
        Ok(config) => config,
        Err(error) => return Ok(error_output(mode, &error)),
    };
    if mode.is_json() {
        return Ok(ok_output(ok_json("config", &config)?));
    }
    match to_pretty_toml(&config) {
        Ok(toml) => Ok(ok_output(toml)),
        Err(error) => Ok(error_output(mode, &error)),
    }
}
