//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{
    WorkspaceArgs, run_chat, run_complete, run_config_show, run_index, run_model, run_prune,
    run_retrieve,
};
use error::{CliError, ExitCode};
use format::{OutputArgs, OutputMode};
use pilot_infra::ModelAction;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pilot",
    version,
    about = "Local code completion with project context",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    /// Workspace root (defaults to current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Config file (JSON/TOML). Defaults to `.pilot/config.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Index changed files in the workspace.
    Index {
        /// Index only this file.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Re-index files even when unchanged.
        #[arg(long)]
        force: bool,
    },
    /// Remove chunks of files that no longer exist.
    Prune,
    /// Show the chunks most similar to a query.
    Retrieve {
        /// Query text.
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Complete code read from stdin.
    Complete {
        /// Name of the document being edited.
        #[arg(long, default_value = "untitled")]
        file: String,
    },
    /// Ask a question about the workspace.
    Chat {
        /// Prompt text.
        #[arg(long)]
        prompt: String,
    },
    /// Load or unload a model on the server.
    Model {
        #[command(subcommand)]
        command: ModelCommands,
    },
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ModelCommands {
    /// Load a model into server memory.
    Load {
        /// Model name.
        name: String,
    },
    /// Evict a model from server memory.
    Unload {
        /// Model name.
        name: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the effective config.
    Show,
}

#[derive(Debug)]
pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing();
    let mode = OutputMode::from_args(&cli.output);

    match run(&cli, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(cli: &Cli, mode: OutputMode) -> Result<CliOutput, CliError> {
    let root = resolve_root(cli.root.as_deref())?;
    let workspace = WorkspaceArgs {
        root: &root,
        config_path: cli.config.as_deref(),
    };

    match &cli.command {
        Commands::Index { file, force } => run_index(mode, workspace, file.as_deref(), *force),
        Commands::Prune => run_prune(mode, workspace),
        Commands::Retrieve { query, top_k } => run_retrieve(mode, workspace, query, *top_k),
        Commands::Complete { file } => {
            let context_window = read_stdin()?;
            run_complete(mode, workspace, file, &context_window)
        },
        Commands::Chat { prompt } => run_chat(mode, workspace, prompt),
        Commands::Model { command } => match command {
            ModelCommands::Load { name } => run_model(mode, workspace, ModelAction::Load, name),
            ModelCommands::Unload { name } => {
                run_model(mode, workspace, ModelAction::Unload, name)
            },
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => run_config_show(mode, workspace),
        },
    }
}

fn resolve_root(root: Option<&Path>) -> Result<PathBuf, CliError> {
    match root {
        Some(root) if root.is_dir() => Ok(root.to_path_buf()),
        Some(root) => Err(CliError::InvalidInput(format!(
            "workspace root is not a directory: {}",
            root.display()
        ))),
        None => Ok(std::env::current_dir()?),
    }
}

fn read_stdin() -> Result<String, CliError> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    if input.trim().is_empty() {
        return Err(CliError::InvalidInput(
            "expected code to complete on stdin".to_owned(),
        ));
    }
    Ok(input)
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;
    stdout.flush()?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}
