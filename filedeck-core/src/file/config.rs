use serde::{Deserialize, Serialize};

use crate::file::tree::TreeOptions;

fn default_text_cap_bytes() -> u64 {
    1024 * 1024
}

fn default_image_cap_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_use_trash() -> bool {
    true
}

fn default_ignore_hidden() -> bool {
    true
}

/// Settings for reading and mutating files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// Text files larger than this are truncated to exactly this many bytes
    /// when read.
    #[serde(default = "default_text_cap_bytes")]
    pub text_cap_bytes: u64,

    /// Images larger than this are rejected without being loaded.
    #[serde(default = "default_image_cap_bytes")]
    pub image_cap_bytes: u64,

    /// When false, deletes skip the OS trash and remove permanently (still
    /// reporting the permanent-delete warning).
    #[serde(default = "default_use_trash")]
    pub use_trash: bool,
}

impl File {
    pub const NAMESPACE: &str = "file";
}

impl Default for File {
    fn default() -> Self {
        Self {
            text_cap_bytes: default_text_cap_bytes(),
            image_cap_bytes: default_image_cap_bytes(),
            use_trash: default_use_trash(),
        }
    }
}

/// Default options for directory listings when a caller does not supply any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    #[serde(default = "default_ignore_hidden")]
    pub ignore_hidden: bool,
}

impl Tree {
    pub const NAMESPACE: &str = "tree";

    pub fn options(&self) -> TreeOptions {
        TreeOptions {
            max_depth: self.max_depth,
            ignore_hidden: self.ignore_hidden,
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self {
            max_depth: None,
            ignore_hidden: default_ignore_hidden(),
        }
    }
}
