//! Chat command handler.

use super::WorkspaceArgs;
use crate::CliOutput;
use crate::error::CliError;
use crate::format::{OutputMode, error_output, ok_json, ok_output};
use pilot_infra::run_chat_local;

/// One chat turn with project context.
pub fn run_chat(
    mode: OutputMode,
    workspace: WorkspaceArgs<'_>,
    prompt: &str,
) -> Result<CliOutput, CliError> {
    match run_chat_local(workspace.root, workspace.config_path, prompt) {
        Ok(reply) => {
            let stdout = if mode.is_json() {
                ok_json("reply", &reply)?
            } else {
                let mut out = reply.content;
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out
            };
            Ok(ok_output(stdout))
        },
        Err(error) => Ok(error_output(mode, &error)),
    }
}
