//! Command handlers.

mod chat;
mod complete;
mod config;
mod index;
mod model;
mod retrieve;

pub use chat::run_chat;
pub use complete::run_complete;
pub use config::run_config_show;
pub use index::{run_index, run_prune};
pub use model::run_model;
pub use retrieve::run_retrieve;

use std::path::Path;

/// Workspace location shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceArgs<'a> {
    pub root: &'a Path,
    pub config_path: Option<&'a Path>,
}
