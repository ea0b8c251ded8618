//! Complete command handler.

use super::WorkspaceArgs;
use crate::CliOutput;
use crate::error::CliError;
use crate::format::{OutputMode, error_output, ok_json, ok_output};
use pilot_infra::run_complete_local;

/// Complete `context_window` as typed in `document`.
pub fn run_complete(
    mode: OutputMode,
    workspace: WorkspaceArgs<'_>,
    document: &str,
    context_window: &str,
) -> Result<CliOutput, CliError> {
    match run_complete_local(workspace.root, workspace.config_path, document, context_window) {
        Ok(completion) => {
            let stdout = if mode.is_json() {
                ok_json("completion", &completion)?
            } else {
                format_completion_text(completion.as_deref())
            };
            Ok(ok_output(stdout))
        },
        Err(error) => Ok(error_output(mode, &error)),
    }
}

/// The completion verbatim so it can be piped; nothing when empty.
fn format_completion_text(completion: Option<&str>) -> String {
    completion.map_or_else(String::new, |text| {
        let mut out = text.to_owned();
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    })
}
