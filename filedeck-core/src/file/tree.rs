use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::{FsOperation, Result, WorkspaceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// One node of a directory listing. Listings are rebuilt on every request, so
/// callers should match entries across listings by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Always `Some` for directories (empty when not expanded), `None` for files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DirectoryEntry>>,
}

impl DirectoryEntry {
    pub fn file(name: String, path: PathBuf) -> Self {
        Self {
            name,
            path,
            kind: EntryKind::File,
            children: None,
        }
    }

    pub fn directory(name: String, path: PathBuf, children: Vec<DirectoryEntry>) -> Self {
        Self {
            name,
            path,
            kind: EntryKind::Directory,
            children: Some(children),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn children(&self) -> &[DirectoryEntry] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Looks up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&DirectoryEntry> {
        self.children().iter().find(|c| c.name == name)
    }
}

fn default_ignore_hidden() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeOptions {
    /// The root listing is depth 0; a directory found at depth `d` is expanded
    /// only while `d < max_depth`. `None` walks the whole subtree.
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Skip names starting with `.`
    #[serde(default = "default_ignore_hidden")]
    pub ignore_hidden: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            ignore_hidden: default_ignore_hidden(),
        }
    }
}

impl TreeOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn include_hidden(mut self) -> Self {
        self.ignore_hidden = false;
        self
    }

    fn expands(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth < max)
    }
}

struct Node {
    entry: DirectoryEntry,
    children: Vec<usize>,
}

struct Pending {
    dir: PathBuf,
    depth: usize,
    parent: Option<usize>,
}

/// Builds the listing of `root`. Entries keep the order `read_dir` returns
/// them in; symbolic links are never followed or reported.
///
/// The walk is breadth-first over an explicit worklist, so deep trees do not
/// grow the call stack. Any I/O failure aborts the whole walk.
pub async fn build_tree(
    root: impl AsRef<Path>,
    options: TreeOptions,
) -> Result<Vec<DirectoryEntry>> {
    let root = root.as_ref();
    let mut nodes: Vec<Node> = Vec::new();
    let mut top_level = Vec::new();
    let mut pending = VecDeque::from([Pending {
        dir: root.to_path_buf(),
        depth: 0,
        parent: None,
    }]);

    while let Some(Pending { dir, depth, parent }) = pending.pop_front() {
        let mut ids = Vec::new();
        for entry in list_level(&dir, options.ignore_hidden).await? {
            let id = nodes.len();
            if entry.is_dir() && options.expands(depth) {
                pending.push_back(Pending {
                    dir: entry.path.clone(),
                    depth: depth + 1,
                    parent: Some(id),
                });
            }
            nodes.push(Node {
                entry,
                children: Vec::new(),
            });
            ids.push(id);
        }

        match parent {
            Some(parent) => nodes[parent].children = ids,
            None => top_level = ids,
        }
    }

    debug!("Listed {} entries under {}", nodes.len(), root.display());
    Ok(assemble(nodes, top_level))
}

/// Lists one directory level, skipping hidden names, symlinks and anything
/// that is neither a file nor a directory.
async fn list_level(dir: &Path, ignore_hidden: bool) -> Result<Vec<DirectoryEntry>> {
    let mut read_dir = fs::read_dir(dir)
        .await
        .map_err(|e| WorkspaceError::io(FsOperation::ListDirectory, dir, e))?;

    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| WorkspaceError::io(FsOperation::ListDirectory, dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if ignore_hidden && name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        let metadata = fs::symlink_metadata(&path)
            .await
            .map_err(|e| WorkspaceError::io(FsOperation::Stat, &path, e))?;
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            continue;
        }
        if file_type.is_dir() {
            entries.push(DirectoryEntry::directory(name, path, Vec::new()));
        } else if file_type.is_file() {
            entries.push(DirectoryEntry::file(name, path));
        }
    }

    Ok(entries)
}

/// Nests the flat node list. Children are always pushed after their parent,
/// so walking the ids in reverse finishes every child before its parent.
fn assemble(nodes: Vec<Node>, top_level: Vec<usize>) -> Vec<DirectoryEntry> {
    let mut child_ids = Vec::with_capacity(nodes.len());
    let mut built: Vec<Option<DirectoryEntry>> = Vec::with_capacity(nodes.len());
    for node in nodes {
        child_ids.push(node.children);
        built.push(Some(node.entry));
    }

    for id in (0..built.len()).rev() {
        if child_ids[id].is_empty() {
            continue;
        }
        let children: Vec<DirectoryEntry> = child_ids[id]
            .iter()
            .filter_map(|child| built[*child].take())
            .collect();
        if let Some(entry) = built[id].as_mut() {
            entry.children = Some(children);
        }
    }

    top_level
        .into_iter()
        .filter_map(|id| built[id].take())
        .collect()
}
