//! Output format selection and shared renderers.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use clap::{Args, ValueEnum};
use pilot_infra::{InfraError, redact_if_secret};
use serde::Serialize;

/// Output format choices for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-friendly text output.
    #[default]
    Text,
    /// Machine-friendly JSON output.
    Json,
}

/// Output-related CLI flags.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Output format for command responses.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Output mode derived from CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct OutputMode {
    pub format: OutputFormat,
}

impl OutputMode {
    #[must_use]
    pub const fn from_args(args: &OutputArgs) -> Self {
        Self {
            format: args.output,
        }
    }

    /// Returns true when JSON output is requested.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

/// `{"status": "ok", <key>: payload}` as pretty JSON.
pub fn ok_json(key: &str, payload: &impl Serialize) -> Result<String, CliError> {
    let mut object = serde_json::Map::new();
    object.insert("status".to_owned(), serde_json::Value::from("ok"));
    object.insert(key.to_owned(), serde_json::to_value(payload)?);
    let mut out = serde_json::to_string_pretty(&serde_json::Value::Object(object))?;
    out.push('\n');
    Ok(out)
}

/// Successful output with nothing on stderr.
#[must_use]
pub const fn ok_output(stdout: String) -> CliOutput {
    CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    }
}

/// Render a command failure; secret-looking metadata values are masked.
#[must_use]
pub fn error_output(mode: OutputMode, error: &InfraError) -> CliOutput {
    let exit_code = ExitCode::for_failure(error);
    let meta: serde_json::Map<String, serde_json::Value> = error
        .metadata
        .iter()
        .map(|(key, value)| (key.to_string(), redact_if_secret(key, value).into()))
        .collect();

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": {
                "code": error.code.to_string(),
                "message": error.message,
                "meta": meta,
            },
        });
        serde_json::to_string_pretty(&payload).map_or_else(
            |_| "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\",\"message\":\"internal error\"}}\n".to_owned(),
            |mut out| {
                out.push('\n');
                out
            },
        )
    } else {
        let mut out = format!(
            "status: error\ncode: {}\nmessage: {}\n",
            error.code, error.message
        );
        for (key, value) in &meta {
            out.push_str(&format!("  {key}: {}\n", value.as_str().unwrap_or_default()));
        }
        out
    };

    CliOutput {
        stdout,
        stderr: String::new(),
        exit_code,
    }
}
