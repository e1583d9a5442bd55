use crate::error::{ErrorCode, FsOperation, Result, WorkspaceError};
use crate::file::config::File;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];

/// Result of reading a file for display. Failures are reported in-band so the
/// UI always receives one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileReadResult {
    /// `content` is the file decoded as UTF-8. When `truncated`, it holds the
    /// first `text_cap_bytes` of the file minus any character split by the
    /// cut. Invalid UTF-8 is replaced with U+FFFD, which is three bytes wide,
    /// so for non-UTF-8 input `content.len()` can exceed `text_cap_bytes`.
    /// `size` is the file size on disk.
    Text {
        content: String,
        truncated: bool,
        size: u64,
    },
    Image {
        /// Standard base64 of the raw file bytes
        content: String,
        mime_type: String,
        size: u64,
    },
    Error {
        code: ErrorCode,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
    },
}

impl FileReadResult {
    pub fn error(err: &WorkspaceError) -> Self {
        let size = match err {
            WorkspaceError::ImageTooLarge { size, .. } => Some(*size),
            _ => None,
        };
        Self::Error {
            code: err.code(),
            message: err.to_string(),
            size,
        }
    }

    pub fn size(&self) -> Option<u64> {
        match self {
            Self::Text { size, .. } | Self::Image { size, .. } => Some(*size),
            Self::Error { size, .. } => *size,
        }
    }

    /// `data:` URL for image results, ready to drop into an `<img>` tag.
    pub fn data_url(&self) -> Option<String> {
        match self {
            Self::Image {
                content, mime_type, ..
            } => Some(format!("data:{mime_type};base64,{content}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    pub path: PathBuf,
    pub size: u64,
    pub is_file: bool,
    pub is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Returns the MIME type for paths the reader treats as images.
pub fn image_mime_type(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    Some(match ext.as_str() {
        "svg" => "image/svg+xml".to_string(),
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        other => format!("image/{other}"),
    })
}

/// Reads and writes file contents under the configured size caps. Size checks
/// run on metadata before any content is loaded, and reads never pull more
/// than one byte past the cap.
#[derive(Debug, Clone)]
pub struct FileAccessManager {
    limits: File,
}

impl FileAccessManager {
    pub fn new(limits: File) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &File {
        &self.limits
    }

    pub async fn read_file(&self, file_path: impl AsRef<Path>) -> FileReadResult {
        let path = file_path.as_ref();
        match self.try_read_file(path).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}", path.display());
                FileReadResult::error(&e)
            }
        }
    }

    pub(crate) async fn try_read_file(&self, path: &Path) -> Result<FileReadResult> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| WorkspaceError::io(FsOperation::ReadFile, path, e))?;

        if !metadata.is_file() {
            return Err(WorkspaceError::io(
                FsOperation::ReadFile,
                path,
                std::io::Error::other("path is not a file"),
            ));
        }

        let size = metadata.len();

        if let Some(mime_type) = image_mime_type(path) {
            let cap = self.limits.image_cap_bytes;
            if size > cap {
                return Err(self.image_too_large(path, size));
            }

            let bytes = self.read_capped(path, cap, size).await?;
            let read = bytes.len() as u64;
            if read > cap {
                return Err(self.image_too_large(path, read));
            }
            return Ok(FileReadResult::Image {
                content: base64::engine::general_purpose::STANDARD.encode(&bytes),
                mime_type,
                size: read,
            });
        }

        let cap = self.limits.text_cap_bytes;
        let mut bytes = self.read_capped(path, cap, size).await?;
        let read = bytes.len() as u64;
        let truncated = read > cap;
        if truncated {
            bytes.truncate(usize::try_from(cap).unwrap_or(usize::MAX));
            tracing::debug!(
                "Truncated {} from {} to {cap} bytes",
                path.display(),
                size.max(read)
            );
        }

        Ok(FileReadResult::Text {
            content: decode_text(bytes, truncated),
            truncated,
            size: size.max(read),
        })
    }

    fn image_too_large(&self, path: &Path, size: u64) -> WorkspaceError {
        WorkspaceError::ImageTooLarge {
            path: path.to_path_buf(),
            size,
            limit: self.limits.image_cap_bytes,
        }
    }

    /// Reads at most `cap + 1` bytes. Getting the extra byte back means the
    /// file holds more than `cap`, whatever its metadata said.
    async fn read_capped(&self, path: &Path, cap: u64, size_hint: u64) -> Result<Vec<u8>> {
        let file = fs::File::open(path)
            .await
            .map_err(|e| WorkspaceError::io(FsOperation::ReadFile, path, e))?;

        let limit = cap.saturating_add(1);
        let capacity = size_hint.min(cap).saturating_add(1);
        let mut buf = Vec::with_capacity(usize::try_from(capacity).unwrap_or_default());
        file.take(limit)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| WorkspaceError::io(FsOperation::ReadFile, path, e))?;
        Ok(buf)
    }

    pub async fn stat(&self, file_path: impl AsRef<Path>) -> Result<FileStats> {
        let path = file_path.as_ref();
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| WorkspaceError::io(FsOperation::Stat, path, e))?;

        Ok(FileStats {
            path: path.to_path_buf(),
            size: metadata.len(),
            is_file: metadata.is_file(),
            is_directory: metadata.is_dir(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    pub async fn write_file(&self, file_path: impl AsRef<Path>, content: &str) -> Result<()> {
        let path = file_path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkspaceError::io(FsOperation::WriteFile, parent, e))?;
        }

        fs::write(path, content)
            .await
            .map_err(|e| WorkspaceError::io(FsOperation::WriteFile, path, e))?;

        tracing::info!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}

/// Decodes file bytes as UTF-8, replacing invalid sequences. When the bytes
/// were cut at a size cap, a multi-byte character split by the cut is dropped
/// rather than rendered as a replacement character.
fn decode_text(mut bytes: Vec<u8>, truncated: bool) -> String {
    if truncated {
        let keep = complete_utf8_len(&bytes);
        bytes.truncate(keep);
    }
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn complete_utf8_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(4) {
        let byte = bytes[len - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            b if b & 0x80 == 0 => 1,
            b if b & 0xE0 == 0xC0 => 2,
            b if b & 0xF0 == 0xE0 => 3,
            b if b & 0xF8 == 0xF0 => 4,
            _ => return len,
        };
        return if back < width { len - back } else { len };
    }
    len
}
