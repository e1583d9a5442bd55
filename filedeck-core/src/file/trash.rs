use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Moves paths somewhere the user can restore them from.
#[async_trait::async_trait]
pub trait Trash: Send + Sync {
    async fn trash(&self, path: &Path) -> Result<()>;
}

/// The operating system's recycle bin / trash.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

#[async_trait::async_trait]
impl Trash for SystemTrash {
    async fn trash(&self, path: &Path) -> Result<()> {
        let target: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || trash::delete(&target))
            .await
            .context("trash task panicked")?
            .with_context(|| format!("Failed to move {} to trash", path.display()))
    }
}

/// Used when `file.use_trash` is off; every delete goes straight to the
/// permanent fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTrash;

#[async_trait::async_trait]
impl Trash for DisabledTrash {
    async fn trash(&self, _path: &Path) -> Result<()> {
        anyhow::bail!("trash disabled by settings")
    }
}
