//! Wire types for hosts that expose [`WorkspaceService`](super::WorkspaceService)
//! over a message channel. Every message is one JSON object.
//!
//! Requests look like `{"id": 7, "method": "rename", "params": {...}}`.
//! A request whose fields are all optional may leave `params` out.
//! Outgoing messages carry a `kind` of `response`, `error` or `file_changed`.

use std::path::PathBuf;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::context::{ContextBundle, TrackedFile};
use crate::error::{ErrorCode, WorkspaceError};
use crate::file::access::{FileReadResult, FileStats};
use crate::file::manager::DeleteOutcome;
use crate::file::tree::{DirectoryEntry, TreeOptions};
use crate::watch::ChangeEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum WorkspaceRequest {
    ListDirectory {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<TreeOptions>,
    },
    /// `path` is what the user picked in the native dialog; `None` means the
    /// dialog was cancelled.
    SelectRoot {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    Stat {
        path: PathBuf,
    },
    CreateFolder {
        path: PathBuf,
    },
    Rename {
        path: PathBuf,
        new_name: String,
    },
    Delete {
        path: PathBuf,
    },
    ReadFile {
        path: PathBuf,
    },
    WriteFile {
        path: PathBuf,
        content: String,
    },
    Watch {
        path: PathBuf,
    },
    StopWatching,
    /// Without `content` the file is read from disk first.
    Track {
        path: String,
        #[serde(default)]
        content: Option<String>,
    },
    Untrack {
        path: String,
    },
    ClearContext,
    GetBundle {
        #[serde(default)]
        budget_bytes: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestEnvelope {
    pub id: u64,
    #[serde(flatten)]
    pub request: WorkspaceRequest,
}

impl<'de> Deserialize<'de> for RequestEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawEnvelope {
            id: u64,
            method: String,
            #[serde(default)]
            params: Option<Value>,
        }

        let raw = RawEnvelope::deserialize(deserializer)?;
        let request = parse_request(raw.method, raw.params).map_err(de::Error::custom)?;
        Ok(Self {
            id: raw.id,
            request,
        })
    }
}

/// Unit requests take no `params`; struct requests treat a missing `params`
/// as an empty object so their optional fields fall back to defaults.
fn parse_request(method: String, params: Option<Value>) -> serde_json::Result<WorkspaceRequest> {
    let without_params = json!({ "method": &method });
    match params {
        None => WorkspaceRequest::deserialize(without_params).or_else(|_| {
            WorkspaceRequest::deserialize(json!({ "method": method, "params": {} }))
        }),
        Some(params) => {
            let empty = params.as_object().is_some_and(|p| p.is_empty());
            WorkspaceRequest::deserialize(json!({ "method": method, "params": params }))
                .or_else(|e| {
                    if empty {
                        WorkspaceRequest::deserialize(without_params)
                    } else {
                        Err(e)
                    }
                })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSelection {
    pub root_path: PathBuf,
    pub entries: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkspaceResponse {
    Entries { entries: Vec<DirectoryEntry> },
    RootSelected(RootSelection),
    Cancelled,
    Stats(FileStats),
    Ok,
    Renamed { new_path: PathBuf },
    Deleted(DeleteOutcome),
    File(FileReadResult),
    Watching { root: PathBuf },
    Stopped { was_active: bool },
    Tracked(TrackedFile),
    Untracked { removed: bool },
    Bundle(ContextBundle),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&WorkspaceError> for ErrorPayload {
    fn from(err: &WorkspaceError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceMessage {
    Response {
        id: u64,
        result: WorkspaceResponse,
    },
    Error {
        /// Absent when the request line could not be parsed far enough to
        /// recover its id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        error: ErrorPayload,
    },
    FileChanged(ChangeEvent),
}

impl ServiceMessage {
    pub fn reply(id: u64, result: Result<WorkspaceResponse, WorkspaceError>) -> Self {
        match result {
            Ok(result) => Self::Response { id, result },
            Err(e) => Self::Error {
                id: Some(id),
                error: ErrorPayload::from(&e),
            },
        }
    }

    pub fn invalid_request(id: Option<u64>, message: impl Into<String>) -> Self {
        Self::Error {
            id,
            error: ErrorPayload {
                code: ErrorCode::InvalidRequest,
                message: message.into(),
            },
        }
    }
}
