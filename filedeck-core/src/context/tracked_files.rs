use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::config::Context;
use crate::context::redact::Redactor;
use crate::error::{Result, WorkspaceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: String,
    pub redacted_preview: String,
    /// First 16 hex characters of the SHA-256 of the redacted content.
    pub content_hash: String,
    /// Length of the redacted content in bytes.
    pub byte_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub total_bytes: usize,
    pub files: Vec<TrackedFile>,
}

impl ContextBundle {
    /// Renders the bundle as an assistant context section, or `None` when
    /// nothing fit.
    pub fn render(&self) -> Option<String> {
        if self.files.is_empty() {
            return None;
        }

        let mut output = String::from("Tracked Files:\n");
        for file in &self.files {
            output.push_str(&format!(
                "\n=== {} ===\n{}",
                file.path, file.redacted_preview
            ));
        }
        Some(output)
    }
}

/// The working set of files offered to the assistant, in tracking order.
pub struct TrackedFilesManager {
    tracked_files: IndexMap<String, TrackedFile>,
    redactor: Redactor,
    preview_bytes: usize,
}

impl TrackedFilesManager {
    pub fn new(config: &Context) -> Result<Self> {
        Ok(Self {
            tracked_files: IndexMap::new(),
            redactor: Redactor::new(&config.redaction_patterns, config.redaction_marker.clone())?,
            preview_bytes: config.preview_bytes,
        })
    }

    /// Tracks `path` with the given content. Re-tracking a path replaces its
    /// entry but keeps its original position.
    pub fn track(&mut self, path: &str, content: &str) -> Result<TrackedFile> {
        if path.trim().is_empty() {
            return Err(WorkspaceError::InvalidPath {
                path: path.to_string(),
                reason: "path is empty",
            });
        }

        let redacted = self.redactor.redact(content);
        let digest = format!("{:x}", Sha256::digest(redacted.as_bytes()));
        let file = TrackedFile {
            path: path.to_string(),
            redacted_preview: prefix(&redacted, self.preview_bytes).to_string(),
            content_hash: digest[..16].to_string(),
            byte_size: redacted.len(),
        };

        tracing::debug!("Tracking {path} ({} bytes)", file.byte_size);
        self.tracked_files.insert(path.to_string(), file.clone());
        Ok(file)
    }

    pub fn untrack(&mut self, path: &str) -> bool {
        self.tracked_files.shift_remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.tracked_files.clear();
    }

    pub fn get_tracked_files(&self) -> Vec<TrackedFile> {
        self.tracked_files.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracked_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked_files.is_empty()
    }

    /// Packs the smallest files first until the next one would exceed
    /// `budget`. Equal sizes keep tracking order.
    pub fn get_bundle(&self, budget: usize) -> ContextBundle {
        let mut candidates: Vec<&TrackedFile> = self.tracked_files.values().collect();
        candidates.sort_by_key(|file| file.byte_size);

        let mut bundle = ContextBundle::default();
        for file in candidates {
            if bundle.total_bytes + file.byte_size > budget {
                break;
            }
            bundle.total_bytes += file.byte_size;
            bundle.files.push(file.clone());
        }
        bundle
    }
}

/// Longest prefix of `text` no longer than `max_bytes` that ends on a char
/// boundary.
fn prefix(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
