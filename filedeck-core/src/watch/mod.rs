//! Filesystem change notifications for the active workspace root.
//!
//! A [`WatchService`] holds at most one [`WatchSession`]. Raw `notify` events
//! are translated into [`ChangeEvent`]s and published on a broadcast channel;
//! every consumer gets its own receiver from [`WatchService::subscribe`].

pub mod config;

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, WorkspaceError};
use crate::watch::config::Watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ChangeKind {
    Add,
    Change,
    Unlink,
    AddDir,
    UnlinkDir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    fn new(event: ChangeKind, path: PathBuf) -> Self {
        Self { event, path }
    }
}

/// Mutable state shared with the notify callback.
struct SessionState {
    /// Cleared before the OS watcher is released; the callback only emits
    /// while it is set.
    open: bool,
    root: PathBuf,
    ignore_hidden: bool,
    /// Directories known to exist under the root. Removal events often no
    /// longer say what kind of node disappeared.
    known_dirs: HashSet<PathBuf>,
}

impl SessionState {
    fn new(root: PathBuf, known_dirs: HashSet<PathBuf>, ignore_hidden: bool) -> Self {
        Self {
            open: true,
            root,
            ignore_hidden,
            known_dirs,
        }
    }

    fn translate(&mut self, event: notify::Event) -> Vec<ChangeEvent> {
        let mut changes = Vec::new();

        match event.kind {
            EventKind::Create(kind) => {
                for path in event.paths {
                    let is_dir = match kind {
                        CreateKind::Folder => true,
                        CreateKind::File => false,
                        _ => is_directory(&path),
                    };
                    changes.push(self.added(path, is_dir));
                }
            }
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
                for path in event.paths {
                    if !self.known_dirs.contains(&path) {
                        changes.push(ChangeEvent::new(ChangeKind::Change, path));
                    }
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::From => {
                    for path in event.paths {
                        changes.push(self.removed(path, None));
                    }
                }
                RenameMode::To => {
                    for path in event.paths {
                        let is_dir = is_directory(&path);
                        changes.push(self.added(path, is_dir));
                    }
                }
                // Backends that pair renames also emit the separate From/To
                // halves, which are reported above.
                RenameMode::Both => {}
                _ => {
                    for path in event.paths {
                        if path.exists() {
                            let is_dir = is_directory(&path);
                            changes.push(self.added(path, is_dir));
                        } else {
                            changes.push(self.removed(path, None));
                        }
                    }
                }
            },
            EventKind::Remove(kind) => {
                let is_dir = match kind {
                    RemoveKind::Folder => Some(true),
                    RemoveKind::File => Some(false),
                    _ => None,
                };
                for path in event.paths {
                    changes.push(self.removed(path, is_dir));
                }
            }
            _ => {}
        }

        if self.ignore_hidden {
            changes.retain(|change| !self.is_hidden(&change.path));
        }
        changes
    }

    fn added(&mut self, path: PathBuf, is_dir: bool) -> ChangeEvent {
        if is_dir {
            self.known_dirs.insert(path.clone());
            ChangeEvent::new(ChangeKind::AddDir, path)
        } else {
            ChangeEvent::new(ChangeKind::Add, path)
        }
    }

    fn removed(&mut self, path: PathBuf, is_dir: Option<bool>) -> ChangeEvent {
        let was_dir = self.known_dirs.contains(&path);
        if was_dir {
            self.known_dirs.retain(|dir| !dir.starts_with(&path));
        }
        if is_dir.unwrap_or(was_dir) {
            ChangeEvent::new(ChangeKind::UnlinkDir, path)
        } else {
            ChangeEvent::new(ChangeKind::Unlink, path)
        }
    }

    fn is_hidden(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        relative.components().any(|component| match component {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    }
}

fn is_directory(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Collects every directory below `root`, without following symlinks.
fn collect_dirs(root: &Path) -> HashSet<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping entry while seeding watcher: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// One live OS watch. Dropping the session closes its gate and then releases
/// the OS handle.
pub struct WatchSession {
    root: PathBuf,
    state: Arc<Mutex<SessionState>>,
    _watcher: RecommendedWatcher,
}

impl WatchSession {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_active(&self) -> bool {
        lock_state(&self.state).open
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        lock_state(&self.state).open = false;
    }
}

pub struct WatchService {
    config: Watch,
    events: broadcast::Sender<ChangeEvent>,
    session: Option<WatchSession>,
}

impl WatchService {
    pub fn new(config: Watch) -> Self {
        let (events, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            config,
            events,
            session: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    pub fn active_root(&self) -> Option<&Path> {
        self.session.as_ref().map(WatchSession::root)
    }

    /// Starts watching `root` recursively, stopping any previous session
    /// first. Once this returns no event from the previous root is published.
    pub async fn watch(&mut self, root: impl AsRef<Path>) -> Result<()> {
        self.stop();

        let requested = root.as_ref().to_path_buf();
        let failed = |source: notify::Error| WorkspaceError::WatcherFailed {
            path: requested.clone(),
            source,
        };

        let root = tokio::fs::canonicalize(&requested)
            .await
            .map_err(|e| failed(notify::Error::io(e)))?;
        if !tokio::fs::metadata(&root)
            .await
            .map_err(|e| failed(notify::Error::io(e)))?
            .is_dir()
        {
            return Err(failed(notify::Error::generic("not a directory")));
        }

        let seed_root = root.clone();
        let known_dirs = tokio::task::spawn_blocking(move || collect_dirs(&seed_root))
            .await
            .map_err(|e| failed(notify::Error::generic(&e.to_string())))?;

        let state = Arc::new(Mutex::new(SessionState::new(
            root.clone(),
            known_dirs,
            self.config.ignore_hidden,
        )));

        let gate = state.clone();
        let sender = self.events.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("File watcher error: {e}");
                        return;
                    }
                };

                let mut state = lock_state(&gate);
                if !state.open {
                    return;
                }
                for change in state.translate(event) {
                    // No receivers is fine; events are not buffered for late subscribers.
                    let _ = sender.send(change);
                }
            })
            .map_err(failed)?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(failed)?;

        info!("Watching {}", root.display());
        self.session = Some(WatchSession {
            root,
            state,
            _watcher: watcher,
        });
        Ok(())
    }

    /// Stops the active session, if any. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                info!("Stopped watching {}", session.root().display());
                drop(session);
                true
            }
            None => false,
        }
    }
}

impl Drop for WatchService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, DataChange, MetadataKind};
    use notify::Event;

    fn state(known: &[&str], ignore_hidden: bool) -> SessionState {
        SessionState::new(
            PathBuf::from("/w"),
            known.iter().map(PathBuf::from).collect(),
            ignore_hidden,
        )
    }

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    fn kinds(changes: &[ChangeEvent]) -> Vec<ChangeKind> {
        changes.iter().map(|c| c.event).collect()
    }

    #[test]
    fn test_create_events() {
        let mut state = state(&[], false);

        let changes = state.translate(event(EventKind::Create(CreateKind::File), "/w/a.txt"));
        assert_eq!(
            changes,
            vec![ChangeEvent::new(ChangeKind::Add, "/w/a.txt".into())]
        );

        let changes = state.translate(event(EventKind::Create(CreateKind::Folder), "/w/src"));
        assert_eq!(kinds(&changes), vec![ChangeKind::AddDir]);
        assert!(state.known_dirs.contains(Path::new("/w/src")));
    }

    #[test]
    fn test_data_modify_is_change() {
        let mut state = state(&["/w/src"], false);

        let changes = state.translate(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/w/a.txt",
        ));
        assert_eq!(kinds(&changes), vec![ChangeKind::Change]);

        let changes = state.translate(event(EventKind::Modify(ModifyKind::Any), "/w/src"));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_access_and_metadata_are_dropped() {
        let mut state = state(&[], false);
        assert!(state
            .translate(event(EventKind::Access(AccessKind::Any), "/w/a.txt"))
            .is_empty());
        assert!(state
            .translate(event(
                EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                "/w/a.txt"
            ))
            .is_empty());
        assert!(state
            .translate(event(EventKind::Other, "/w/a.txt"))
            .is_empty());
    }

    #[test]
    fn test_remove_uses_known_dirs() {
        let mut state = state(&["/w/src", "/w/src/lib"], false);

        let changes = state.translate(event(EventKind::Remove(RemoveKind::Any), "/w/src"));
        assert_eq!(kinds(&changes), vec![ChangeKind::UnlinkDir]);
        assert!(state.known_dirs.is_empty());

        let changes = state.translate(event(EventKind::Remove(RemoveKind::Any), "/w/a.txt"));
        assert_eq!(kinds(&changes), vec![ChangeKind::Unlink]);

        let changes = state.translate(event(EventKind::Remove(RemoveKind::Folder), "/w/other"));
        assert_eq!(kinds(&changes), vec![ChangeKind::UnlinkDir]);
    }

    #[test]
    fn test_rename_halves() {
        let mut state = state(&["/w/old"], false);

        let changes = state.translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            "/w/old",
        ));
        assert_eq!(kinds(&changes), vec![ChangeKind::UnlinkDir]);

        let both = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/w/old"))
            .add_path(PathBuf::from("/w/new"));
        assert!(state.translate(both).is_empty());

        // The target does not exist on disk, so it is reported as a file.
        let changes = state.translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            "/w/new.txt",
        ));
        assert_eq!(kinds(&changes), vec![ChangeKind::Add]);
    }

    #[test]
    fn test_hidden_filter() {
        let mut hidden = state(&[], true);
        assert!(hidden
            .translate(event(EventKind::Create(CreateKind::File), "/w/.git/HEAD"))
            .is_empty());
        assert_eq!(
            hidden
                .translate(event(EventKind::Create(CreateKind::File), "/w/src/a.rs"))
                .len(),
            1
        );

        let mut shown = state(&[], false);
        assert_eq!(
            shown
                .translate(event(EventKind::Create(CreateKind::File), "/w/.env"))
                .len(),
            1
        );
    }

    #[test]
    fn test_change_kind_wire_names() {
        let json = serde_json::to_value(ChangeEvent::new(ChangeKind::AddDir, "/w/d".into())).unwrap();
        assert_eq!(json["event"], "addDir");
        assert_eq!(ChangeKind::UnlinkDir.to_string(), "unlinkDir");
    }

    #[test]
    fn test_collect_dirs_lists_nested_directories_only() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src/util")).unwrap();
        std::fs::create_dir(root.join("docs")).unwrap();
        std::fs::write(root.join("src/lib.rs"), "").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("src"), root.join("link")).unwrap();

        let dirs = collect_dirs(root);
        let expected: HashSet<PathBuf> = [root.join("src"), root.join("src/util"), root.join("docs")]
            .into_iter()
            .collect();
        assert_eq!(dirs, expected);
    }

    #[tokio::test]
    async fn test_watch_missing_root_fails() {
        let temp = tempfile::tempdir().unwrap();
        let mut service = WatchService::new(Watch::default());
        let err = service.watch(temp.path().join("missing")).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::WatcherFailure);
        assert!(service.active_root().is_none());
    }

    #[tokio::test]
    async fn test_stop_reports_whether_active() {
        let temp = tempfile::tempdir().unwrap();
        let mut service = WatchService::new(Watch::default());
        assert!(!service.stop());

        service.watch(temp.path()).await.unwrap();
        assert!(service.active_root().is_some());
        assert!(service.stop());
        assert!(service.active_root().is_none());
    }
}
