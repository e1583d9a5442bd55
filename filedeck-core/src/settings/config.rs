use serde::{Deserialize, Serialize};

use crate::context::config::Context;
use crate::file::config::{File, Tree};
use crate::watch::config::Watch;

/// Core application settings. Every section is optional in the file on disk;
/// missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Size caps and delete behaviour for file operations
    #[serde(default)]
    pub file: File,

    /// Defaults for directory listings
    #[serde(default)]
    pub tree: Tree,

    /// Change watcher tuning
    #[serde(default)]
    pub watch: Watch,

    /// Assistant context bundler
    #[serde(default)]
    pub context: Context,
}
