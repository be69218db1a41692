//! Error types for tree composition and the configuration layer around it.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`ComposeError`].
///
/// `Value` errors mean the request itself is malformed (a bad path, arrays of
/// differing length); `Type` errors mean the document has the wrong shape at
/// the point the engine needed to descend or combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Value,
    Type,
}

/// Failures raised by shared-value propagation and structural merging.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComposeError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("cannot propagate {path:?} into a {found}: the root must be an object or an array")]
    UnsupportedRootType { path: String, found: &'static str },

    #[error("cannot propagate {path:?}: intermediate key {key:?} does not exist")]
    MissingIntermediateKey { path: String, key: String },

    #[error("cannot propagate {path:?}: segment {segment:?} reaches a {found}, which cannot be navigated")]
    NonNavigableNode {
        path: String,
        segment: String,
        found: &'static str,
    },

    #[error("shared block {key:?} is malformed: {reason}")]
    InvalidSharedBlock { key: String, reason: String },

    #[error("arrays of differing length cannot be merged at {at} ({left} vs {right})")]
    ArrayLengthMismatch { at: String, left: usize, right: usize },

    #[error("ambiguous merge at {at}: cannot combine a {left} with a {right}")]
    AmbiguousScalarMerge {
        at: String,
        left: &'static str,
        right: &'static str,
    },
}

impl ComposeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ComposeError::InvalidPath { .. }
            | ComposeError::InvalidSharedBlock { .. }
            | ComposeError::ArrayLengthMismatch { .. } => ErrorClass::Value,
            ComposeError::UnsupportedRootType { .. }
            | ComposeError::MissingIntermediateKey { .. }
            | ComposeError::NonNavigableNode { .. }
            | ComposeError::AmbiguousScalarMerge { .. } => ErrorClass::Type,
        }
    }
}

/// Errors from loading, validating, storing and reading multi-environment config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid project name {name:?}: {reason}")]
    InvalidProjectName { name: String, reason: &'static str },

    #[error("invalid env name {name:?}: {reason}")]
    InvalidEnvName { name: String, reason: &'static str },

    #[error("env {0:?} is not defined in the config")]
    UnknownEnv(String),

    #[error("env {0:?} does not define a string `project_name`")]
    MissingProjectName(String),

    #[error("env {env_name:?} uses project name {found:?}, expected {expected:?}")]
    InconsistentProjectName {
        env_name: String,
        expected: String,
        found: String,
    },

    #[error("invalid config document: {0}")]
    InvalidDocument(String),

    #[error("env {env_name:?} does not fit the target type: {source}; please compare your config json file to your config struct definition")]
    Deserialize {
        env_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no stored config named {0:?}")]
    NotFound(String),

    #[error("could not find config directory: {0}")]
    ConfigDirNotFound(String),

    #[error("invalid logging configuration: {0}")]
    InvalidLogging(String),
}

/// Human readable name of a JSON value's kind, used in error messages.
pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_classes() {
        let invalid = ComposeError::InvalidPath {
            path: "*".to_string(),
            reason: "last segment must be a key".to_string(),
        };
        assert_eq!(invalid.class(), ErrorClass::Value);

        let length = ComposeError::ArrayLengthMismatch {
            at: "tags".to_string(),
            left: 1,
            right: 2,
        };
        assert_eq!(length.class(), ErrorClass::Value);

        let scalar = ComposeError::AmbiguousScalarMerge {
            at: "value".to_string(),
            left: "number",
            right: "number",
        };
        assert_eq!(scalar.class(), ErrorClass::Type);
    }

    #[test]
    fn test_merge_error_message_names_location() {
        let err = ComposeError::ArrayLengthMismatch {
            at: "tags".to_string(),
            left: 1,
            right: 2,
        };
        assert_eq!(
            err.to_string(),
            "arrays of differing length cannot be merged at tags (1 vs 2)"
        );
    }

    #[test]
    fn test_compose_error_converts_into_config_error() {
        let err: ConfigError = ComposeError::MissingIntermediateKey {
            path: "a.b".to_string(),
            key: "a".to_string(),
        }
        .into();
        assert!(matches!(err, ConfigError::Compose(_)));
        assert!(err.to_string().contains("intermediate key \"a\""));
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(kind_name(&json!(null)), "null");
        assert_eq!(kind_name(&json!("x")), "string");
        assert_eq!(kind_name(&json!([1])), "array");
        assert_eq!(kind_name(&json!({})), "object");
    }
}
