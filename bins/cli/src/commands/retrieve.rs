//! Retrieve command handler.

use super::WorkspaceArgs;
use crate::CliOutput;
use crate::error::CliError;
use crate::format::{OutputMode, error_output, ok_json, ok_output};
use pilot_infra::{RetrievalResult, run_retrieve_local};
use std::fmt::Write;

/// Rank indexed chunks against `query`.
pub fn run_retrieve(
    mode: OutputMode,
    workspace: WorkspaceArgs<'_>,
    query: &str,
    top_k: Option<usize>,
) -> Result<CliOutput, CliError> {
    match run_retrieve_local(workspace.root, workspace.config_path, query, top_k) {
        Ok(result) => {
            let stdout = if mode.is_json() {
                ok_json("results", &result)?
            } else {
                format_results_text(&result)
            };
            Ok(ok_output(stdout))
        },
        Err(error) => Ok(error_output(mode, &error)),
    }
}

fn format_results_text(result: &RetrievalResult) -> String {
    let mut out = String::new();
    out.push_str("status: ok\n");
    let _ = writeln!(out, "results: {}", result.len());
    for scored in result {
        let _ = writeln!(out, "{} score={:.4}", scored.chunk.file_path, scored.score);
        for line in scored.chunk.text.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}
