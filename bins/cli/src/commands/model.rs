//! Model load/unload command handler.

use super::WorkspaceArgs;
use crate::CliOutput;
use crate::error::CliError;
use crate::format::{OutputMode, error_output, ok_json, ok_output};
use pilot_infra::{ModelAction, run_model_local};

/// Load or unload `model` on the configured server.
pub fn run_model(
    mode: OutputMode,
    workspace: WorkspaceArgs<'_>,
    action: ModelAction,
    model: &str,
) -> Result<CliOutput, CliError> {
    match run_model_local(workspace.root, workspace.config_path, action, model) {
        Ok(()) => {
            let stdout = if mode.is_json() {
                ok_json(
                    "model",
                    &serde_json::json!({ "name": model, "action": action_label(action) }),
                )?
            } else {
                format!("status: ok\nmodel: {model} {}\n", action_label(action))
            };
            Ok(ok_output(stdout))
        },
        Err(error) => Ok(error_output(mode, &error)),
    }
}

const fn action_label(action: ModelAction) -> &'static str {
    match action {
        ModelAction::Load => "loaded",
        ModelAction::Unload => "unloaded",
    }
}
