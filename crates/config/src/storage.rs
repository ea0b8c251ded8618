//! Index storage location.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory created inside the workspace for pilot state.
pub const PROJECT_STATE_DIR: &str = ".pilot";
/// File name of the persisted chunk list.
pub const INDEX_FILE_NAME: &str = "index.json";

/// Where the chunk list is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum IndexStorageMode {
    /// Keep the index in memory only.
    Disabled,
    /// `<root>/.pilot/index.json`.
    #[default]
    Project,
    /// Explicit file path; relative paths resolve against the workspace root.
    Custom(PathBuf),
}

impl IndexStorageMode {
    /// Resolve the index file for a workspace root.
    #[must_use]
    pub fn resolve_index_path(&self, workspace_root: &Path) -> Option<PathBuf> {
        match self {
            Self::Disabled => None,
            Self::Project => Some(
                workspace_root
                    .join(PROJECT_STATE_DIR)
                    .join(INDEX_FILE_NAME),
            ),
            Self::Custom(path) if path.is_absolute() => Some(path.clone()),
            Self::Custom(path) => Some(workspace_root.join(path)),
        }
    }
}
