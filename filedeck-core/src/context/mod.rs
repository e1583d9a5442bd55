//! The assistant's working set: tracked files, their redacted previews, and
//! byte-bounded bundles of them.

pub mod config;
pub mod redact;
pub mod tracked_files;

pub use tracked_files::{ContextBundle, TrackedFile, TrackedFilesManager};
