use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{FsOperation, Result, WorkspaceError};
use crate::file::trash::Trash;

pub const PERMANENT_DELETE_WARNING: &str = "deleted permanently, trash unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeleteMethod {
    Trash,
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub method: DeleteMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Checks a proposed base name. Runs before any filesystem access.
pub fn validate_name(new_name: &str) -> Result<&str> {
    let name = new_name.trim();
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.contains(['/', '\\', ':']) {
        Some("name contains a path separator")
    } else if name == "." || name == ".." {
        Some("name refers to a directory link")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(WorkspaceError::InvalidName {
            name: new_name.to_string(),
            reason,
        }),
        None => Ok(name),
    }
}

/// Case-insensitive filesystems resolve `Foo.txt` and `foo.txt` to one entry,
/// so the target of a case-only rename already "exists".
async fn is_case_change(source: &Path, target: &Path, target_meta: &Metadata) -> bool {
    let (Some(from), Some(to)) = (source.file_name(), target.file_name()) else {
        return false;
    };
    if from.to_string_lossy().to_lowercase() != to.to_string_lossy().to_lowercase() {
        return false;
    }
    match fs::symlink_metadata(source).await {
        Ok(source_meta) => same_entry(&source_meta, target_meta),
        Err(_) => false,
    }
}

#[cfg(unix)]
fn same_entry(a: &Metadata, b: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_entry(a: &Metadata, b: &Metadata) -> bool {
    a.file_type() == b.file_type()
        && a.len() == b.len()
        && a.modified().ok() == b.modified().ok()
        && a.created().ok() == b.created().ok()
}

/// Structural changes to the workspace: folders, renames and deletes.
pub struct FileModificationManager {
    trash: Arc<dyn Trash>,
}

impl FileModificationManager {
    pub fn new(trash: Arc<dyn Trash>) -> Self {
        Self { trash }
    }

    pub async fn create_folder(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::create_dir_all(path)
            .await
            .map_err(|e| WorkspaceError::io(FsOperation::CreateFolder, path, e))?;

        tracing::info!("Created folder: {}", path.display());
        Ok(())
    }

    /// Renames `path` within its parent directory and returns the new path.
    pub async fn rename(&self, path: impl AsRef<Path>, new_name: &str) -> Result<PathBuf> {
        let path = path.as_ref();
        let name = validate_name(new_name)?;

        let parent = path.parent().ok_or_else(|| WorkspaceError::InvalidPath {
            path: path.display().to_string(),
            reason: "path has no parent directory",
        })?;
        let target = parent.join(name);

        let occupied = match fs::symlink_metadata(&target).await {
            Ok(existing) if target != path => !is_case_change(path, &target, &existing).await,
            _ => false,
        };
        if occupied {
            return Err(WorkspaceError::RenameFailed {
                from: path.to_path_buf(),
                to: target,
                source: io::Error::new(io::ErrorKind::AlreadyExists, "target already exists"),
            });
        }

        fs::rename(path, &target)
            .await
            .map_err(|source| WorkspaceError::RenameFailed {
                from: path.to_path_buf(),
                to: target.clone(),
                source,
            })?;

        tracing::info!("Renamed {} -> {}", path.display(), target.display());
        Ok(target)
    }

    /// Moves `path` to the trash, falling back to permanent removal when the
    /// trash is unavailable. Only fails when the fallback fails too.
    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<DeleteOutcome> {
        let path = path.as_ref();
        let metadata = fs::symlink_metadata(path)
            .await
            .map_err(|e| WorkspaceError::io(FsOperation::Delete, path, e))?;

        match self.trash.trash(path).await {
            Ok(()) => {
                tracing::info!("Moved to trash: {}", path.display());
                return Ok(DeleteOutcome {
                    method: DeleteMethod::Trash,
                    warning: None,
                });
            }
            Err(e) => {
                tracing::warn!(
                    "Trash failed for {}, deleting permanently: {e:#}",
                    path.display()
                );
            }
        }

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };
        removed.map_err(|source| WorkspaceError::DeleteFailed {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Deleted permanently: {}", path.display());
        Ok(DeleteOutcome {
            method: DeleteMethod::Permanent,
            warning: Some(PERMANENT_DELETE_WARNING.to_string()),
        })
    }
}
