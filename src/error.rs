//! Error types shared across the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal startup errors. Nothing is traversed once one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid {name} pattern: {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("missing environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

/// One `{path, details}` pair from a rejected save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: Vec<String>,
    pub details: String,
}

impl ValidationIssue {
    /// Field id addressed by the issue (`["fields", "title", "de"]` → `title`)
    pub fn field_name(&self) -> Option<&str> {
        self.path.get(1).map(String::as_str)
    }
}

/// Failures talking to the content service.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("content API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("content type {0} not found")]
    ContentTypeNotFound(String),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path.join("."), i.details))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type ContentResult<T> = Result<T, ContentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_issue_field_name() {
        let issue = ValidationIssue {
            path: vec!["fields".into(), "title".into(), "de".into()],
            details: "Size must be at most 255".into(),
        };
        assert_eq!(issue.field_name(), Some("title"));

        let short = ValidationIssue {
            path: vec!["fields".into()],
            details: String::new(),
        };
        assert_eq!(short.field_name(), None);
    }

    #[test]
    fn validation_error_message_lists_paths() {
        let err = ContentError::Validation(vec![ValidationIssue {
            path: vec!["fields".into(), "title".into(), "de".into()],
            details: "too long".into(),
        }]);
        assert_eq!(
            err.to_string(),
            "validation failed: fields.title.de: too long"
        );
    }

    #[test]
    fn missing_env_lists_every_variable() {
        let err = ConfigError::MissingEnv(vec!["A".into(), "B".into()]);
        assert_eq!(err.to_string(), "missing environment variables: A, B");
    }
}
