//! [`WorkspaceService`] is the single entry point hosts talk to. It owns the
//! reader, the mutation manager, the watcher and the tracked file set.

pub mod protocol;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::info;

use crate::context::{ContextBundle, TrackedFile, TrackedFilesManager};
use crate::error::{FsOperation, Result, WorkspaceError};
use crate::file::access::{FileAccessManager, FileReadResult, FileStats};
use crate::file::manager::{DeleteOutcome, FileModificationManager};
use crate::file::trash::{DisabledTrash, SystemTrash, Trash};
use crate::file::tree::{build_tree, DirectoryEntry, TreeOptions};
use crate::settings::Settings;
use crate::watch::{ChangeEvent, WatchService};

use protocol::{RootSelection, WorkspaceRequest, WorkspaceResponse};

/// Source of the workspace root, normally the UI's native folder dialog.
#[async_trait::async_trait]
pub trait RootPicker: Send + Sync {
    /// `None` when the user cancelled.
    async fn pick_root(&self) -> Option<PathBuf>;
}

/// A picker whose answer is already known, e.g. because the UI ran the dialog
/// before sending the request.
pub struct PresetRoot(pub Option<PathBuf>);

#[async_trait::async_trait]
impl RootPicker for PresetRoot {
    async fn pick_root(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

pub struct WorkspaceService {
    settings: Settings,
    access: FileAccessManager,
    modifications: FileModificationManager,
    watcher: Mutex<WatchService>,
    tracked_files: RwLock<TrackedFilesManager>,
    root: RwLock<Option<PathBuf>>,
}

impl WorkspaceService {
    /// Uses the system trash unless `file.use_trash` is off.
    pub fn new(settings: Settings) -> Result<Self> {
        let trash: Arc<dyn Trash> = if settings.file.use_trash {
            Arc::new(SystemTrash)
        } else {
            Arc::new(DisabledTrash)
        };
        Self::with_trash(settings, trash)
    }

    pub fn with_trash(settings: Settings, trash: Arc<dyn Trash>) -> Result<Self> {
        Ok(Self {
            access: FileAccessManager::new(settings.file.clone()),
            modifications: FileModificationManager::new(trash),
            watcher: Mutex::new(WatchService::new(settings.watch.clone())),
            tracked_files: RwLock::new(TrackedFilesManager::new(&settings.context)?),
            root: RwLock::new(None),
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The root chosen by the last successful `select_root`.
    pub async fn root(&self) -> Option<PathBuf> {
        self.root.read().await.clone()
    }

    /// Lists `path`, using the configured tree defaults when `options` is
    /// `None`.
    pub async fn list_directory(
        &self,
        path: impl AsRef<Path>,
        options: Option<TreeOptions>,
    ) -> Result<Vec<DirectoryEntry>> {
        let options = options.unwrap_or_else(|| self.settings.tree.options());
        build_tree(path, options).await
    }

    pub async fn select_root(&self, picker: &dyn RootPicker) -> Result<Option<RootSelection>> {
        let Some(picked) = picker.pick_root().await else {
            return Ok(None);
        };

        let root_path = std::path::absolute(&picked)
            .map_err(|e| WorkspaceError::io(FsOperation::ListDirectory, &picked, e))?;
        let entries = build_tree(&root_path, self.settings.tree.options()).await?;

        info!("Selected workspace root {}", root_path.display());
        *self.root.write().await = Some(root_path.clone());
        Ok(Some(RootSelection { root_path, entries }))
    }

    pub async fn stat(&self, path: impl AsRef<Path>) -> Result<FileStats> {
        self.access.stat(path).await
    }

    pub async fn create_folder(&self, path: impl AsRef<Path>) -> Result<()> {
        self.modifications.create_folder(path).await
    }

    pub async fn rename(&self, path: impl AsRef<Path>, new_name: &str) -> Result<PathBuf> {
        self.modifications.rename(path, new_name).await
    }

    pub async fn delete(&self, path: impl AsRef<Path>) -> Result<DeleteOutcome> {
        self.modifications.delete(path).await
    }

    pub async fn read_file(&self, path: impl AsRef<Path>) -> FileReadResult {
        self.access.read_file(path).await
    }

    pub async fn write_file(&self, path: impl AsRef<Path>, content: &str) -> Result<()> {
        self.access.write_file(path, content).await
    }

    /// Replaces any active watch with one on `path`.
    pub async fn watch(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let mut watcher = self.watcher.lock().await;
        watcher.watch(path).await?;
        Ok(watcher
            .active_root()
            .map(Path::to_path_buf)
            .unwrap_or_default())
    }

    pub async fn stop_watching(&self) -> bool {
        self.watcher.lock().await.stop()
    }

    pub async fn watched_root(&self) -> Option<PathBuf> {
        self.watcher.lock().await.active_root().map(Path::to_path_buf)
    }

    /// Receives change events from this point on, across watch restarts.
    pub async fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.watcher.lock().await.subscribe()
    }

    pub async fn track(&self, path: &str, content: &str) -> Result<TrackedFile> {
        self.tracked_files.write().await.track(path, content)
    }

    /// Reads a text file through the content reader and tracks it. Truncated
    /// reads are tracked as read.
    pub async fn track_path(&self, path: impl AsRef<Path>) -> Result<TrackedFile> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(WorkspaceError::InvalidPath {
                path: String::new(),
                reason: "path is empty",
            });
        }

        match self.access.try_read_file(path).await? {
            FileReadResult::Text { content, .. } => {
                self.track(&path.to_string_lossy(), &content).await
            }
            _ => Err(WorkspaceError::InvalidPath {
                path: path.display().to_string(),
                reason: "only text files can be tracked",
            }),
        }
    }

    pub async fn untrack(&self, path: &str) -> bool {
        self.tracked_files.write().await.untrack(path)
    }

    pub async fn clear_context(&self) {
        self.tracked_files.write().await.clear();
    }

    pub async fn tracked_files(&self) -> Vec<TrackedFile> {
        self.tracked_files.read().await.get_tracked_files()
    }

    /// Packs tracked files into `budget` bytes, or the configured
    /// `context.max_bundle_bytes` when `None`.
    pub async fn get_bundle(&self, budget: Option<usize>) -> ContextBundle {
        let budget = budget.unwrap_or(self.settings.context.max_bundle_bytes);
        self.tracked_files.read().await.get_bundle(budget)
    }

    pub async fn shutdown(&self) {
        if self.stop_watching().await {
            info!("Watcher stopped on shutdown");
        }
    }

    pub async fn dispatch(&self, request: WorkspaceRequest) -> Result<WorkspaceResponse> {
        let response = match request {
            WorkspaceRequest::ListDirectory { path, options } => WorkspaceResponse::Entries {
                entries: self.list_directory(path, options).await?,
            },
            WorkspaceRequest::SelectRoot { path } => {
                match self.select_root(&PresetRoot(path)).await? {
                    Some(selection) => WorkspaceResponse::RootSelected(selection),
                    None => WorkspaceResponse::Cancelled,
                }
            }
            WorkspaceRequest::Stat { path } => WorkspaceResponse::Stats(self.stat(path).await?),
            WorkspaceRequest::CreateFolder { path } => {
                self.create_folder(path).await?;
                WorkspaceResponse::Ok
            }
            WorkspaceRequest::Rename { path, new_name } => WorkspaceResponse::Renamed {
                new_path: self.rename(path, &new_name).await?,
            },
            WorkspaceRequest::Delete { path } => {
                WorkspaceResponse::Deleted(self.delete(path).await?)
            }
            WorkspaceRequest::ReadFile { path } => {
                WorkspaceResponse::File(self.read_file(path).await)
            }
            WorkspaceRequest::WriteFile { path, content } => {
                self.write_file(path, &content).await?;
                WorkspaceResponse::Ok
            }
            WorkspaceRequest::Watch { path } => WorkspaceResponse::Watching {
                root: self.watch(path).await?,
            },
            WorkspaceRequest::StopWatching => WorkspaceResponse::Stopped {
                was_active: self.stop_watching().await,
            },
            WorkspaceRequest::Track { path, content } => {
                let tracked = match content {
                    Some(content) => self.track(&path, &content).await?,
                    None => self.track_path(&path).await?,
                };
                WorkspaceResponse::Tracked(tracked)
            }
            WorkspaceRequest::Untrack { path } => WorkspaceResponse::Untracked {
                removed: self.untrack(&path).await,
            },
            WorkspaceRequest::ClearContext => {
                self.clear_context().await;
                WorkspaceResponse::Ok
            }
            WorkspaceRequest::GetBundle { budget_bytes } => {
                WorkspaceResponse::Bundle(self.get_bundle(budget_bytes).await)
            }
        };
        Ok(response)
    }
}
