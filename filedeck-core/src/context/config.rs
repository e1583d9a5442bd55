use serde::{Deserialize, Serialize};

fn default_max_bundle_bytes() -> usize {
    64 * 1024
}

fn default_preview_bytes() -> usize {
    2048
}

fn default_redaction_patterns() -> Vec<String> {
    vec![
        "api[_-]?key".to_string(),
        "token".to_string(),
        "secret".to_string(),
    ]
}

fn default_redaction_marker() -> String {
    "[REDACTED]".to_string()
}

/// Settings for the assistant context bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Budget used by `get_bundle` when the caller does not pass one.
    #[serde(default = "default_max_bundle_bytes")]
    pub max_bundle_bytes: usize,

    /// Size of the stored preview of each tracked file, measured on the
    /// redacted content.
    #[serde(default = "default_preview_bytes")]
    pub preview_bytes: usize,

    /// Case-insensitive regular expressions naming sensitive keys. A match and
    /// any `= value` / `: value` directly after it are replaced by the marker.
    #[serde(default = "default_redaction_patterns")]
    pub redaction_patterns: Vec<String>,

    #[serde(default = "default_redaction_marker")]
    pub redaction_marker: String,
}

impl Context {
    pub const NAMESPACE: &str = "context";
}

impl Default for Context {
    fn default() -> Self {
        Self {
            max_bundle_bytes: default_max_bundle_bytes(),
            preview_bytes: default_preview_bytes(),
            redaction_patterns: default_redaction_patterns(),
            redaction_marker: default_redaction_marker(),
        }
    }
}
