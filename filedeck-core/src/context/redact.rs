use regex::Regex;

use crate::error::{Result, WorkspaceError};

/// Replaces sensitive keys, and any value assigned to them, with a marker.
///
/// Each configured pattern names a key and is matched case-insensitively. A
/// match is extended over a directly following `= value` or `: value`
/// (quoted or bare), so `API_KEY="xxx"` becomes `[REDACTED]`.
#[derive(Debug, Clone)]
pub struct Redactor {
    patterns: Vec<Regex>,
    marker: String,
}

impl Redactor {
    pub fn new<S: AsRef<str>>(patterns: &[S], marker: impl Into<String>) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(&format!(
                    r#"(?i)(?:{pattern})(?:["']?\s*[:=]\s*(?:"[^"]*"|'[^']*'|[^\s,;]+))?"#
                ))
                .map_err(|source| WorkspaceError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            marker: marker.into(),
        })
    }

    pub fn redact(&self, content: &str) -> String {
        let mut redacted = content.to_string();
        for pattern in &self.patterns {
            if pattern.is_match(&redacted) {
                redacted = pattern
                    .replace_all(&redacted, regex::NoExpand(&self.marker))
                    .into_owned();
            }
        }
        redacted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn redactor() -> Redactor {
        Redactor::new(&["api[_-]?key", "token", "secret"], "[REDACTED]").unwrap()
    }

    #[test]
    fn test_key_and_quoted_value_removed() {
        let out = redactor().redact("API_KEY=\"xxx\"\nname=demo");
        assert_eq!(out, "[REDACTED]\nname=demo");
    }

    #[test]
    fn test_colon_and_bare_values() {
        let out = redactor().redact("token: abc123, user: bob");
        assert_eq!(out, "[REDACTED], user: bob");

        let out = redactor().redact("{\"apiKey\": \"sk-123\"}");
        assert!(!out.contains("sk-123"), "{out}");
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn test_bare_mention_is_replaced() {
        let out = redactor().redact("rotate the Secret weekly");
        assert_eq!(out, "rotate the [REDACTED] weekly");
    }

    #[test]
    fn test_marker_is_literal() {
        let redactor = Redactor::new(&["token"], "$1").unwrap();
        assert_eq!(redactor.redact("token=abc"), "$1");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Redactor::new(&["("], "x").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPattern);
    }
}
