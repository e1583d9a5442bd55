//! The file module holds every direct filesystem operation of the workspace.
//!
//! ## Architecture
//!
//! ### tree.rs
//! Builds directory listings:
//! - Skips hidden names (configurable) and never follows or reports symlinks
//! - Honors a depth limit; directories past it are reported with empty children
//! - Walks breadth-first over a worklist and fails as a whole on any I/O error
//!
//! ### access.rs
//! Reads and writes file contents:
//! - Images are base64 encoded when within the image cap and rejected otherwise
//! - Text beyond the text cap is truncated to exactly the cap
//! - Read failures are returned in-band as `FileReadResult::Error`
//!
//! ### manager.rs
//! Structural changes (create folder, rename, delete). Deletes go through the
//! `Trash` seam in trash.rs and fall back to permanent removal with a warning.

pub mod access;
pub mod config;
pub mod manager;
pub mod trash;
pub mod tree;
