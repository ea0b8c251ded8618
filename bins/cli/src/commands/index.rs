//! Index and prune command handlers.

use super::WorkspaceArgs;
use crate::CliOutput;
use crate::error::CliError;
use crate::format::{OutputMode, error_output, ok_json, ok_output};
use pilot_infra::{IndexSummary, run_index_local, run_prune_local};
use std::path::Path;

/// Index the workspace, or only `file` when given.
pub fn run_index(
    mode: OutputMode,
    workspace: WorkspaceArgs<'_>,
    file: Option<&Path>,
    force: bool,
) -> Result<CliOutput, CliError> {
    match run_index_local(workspace.root, workspace.config_path, file, force) {
        Ok(summary) => format_summary(mode, &summary),
        Err(error) => Ok(error_output(mode, &error)),
    }
}

/// Drop chunks of deleted files.
pub fn run_prune(mode: OutputMode, workspace: WorkspaceArgs<'_>) -> Result<CliOutput, CliError> {
    match run_prune_local(workspace.root, workspace.config_path) {
        Ok(summary) => format_summary(mode, &summary),
        Err(error) => Ok(error_output(mode, &error)),
    }
}

fn format_summary(mode: OutputMode, summary: &IndexSummary) -> Result<CliOutput, CliError> {
    let stdout = if mode.is_json() {
        ok_json("summary", summary)?
    } else {
        format_summary_text(summary)
    };
    Ok(ok_output(stdout))
}

fn format_summary_text(summary: &IndexSummary) -> String {
    let mut out = format!(
        "status: ok\n\
         files: {} indexed, {} skipped, {} removed\n\
         chunks: {} written, {} removed, {} total\n",
        summary.files_indexed,
        summary.files_skipped,
        summary.files_removed,
        summary.chunks_written,
        summary.chunks_removed,
        summary.total_chunks,
    );
    if summary.embedding_failures > 0 {
        out.push_str(&format!(
            "embedding failures: {}\n",
            summary.embedding_failures
        ));
    }
    for failure in &summary.failures {
        out.push_str(&format!(
            "failed: {} ({}: {})\n",
            failure.path, failure.code, failure.message
        ));
    }
    if let Some(error) = &summary.persist_error {
        out.push_str(&format!("warning: index not saved: {error}\n"));
    }
    out
}
