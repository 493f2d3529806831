//! SPR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, ReconError>;

/// Top-level error type for the reconciliation core.
#[derive(Debug, Error)]
pub enum ReconError {
    #[error("[SPR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SPR-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SPR-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SPR-2001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SPR-2002] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[SPR-2101] comment exceeds {max} characters (got {length})")]
    CommentTooLong { length: usize, max: usize },

    #[error("[SPR-2102] rating bucket out of range: {value}")]
    InvalidBucket { value: i64 },

    #[error("[SPR-3001] remote {operation} failure: {details}")]
    Remote {
        operation: &'static str,
        details: String,
        retryable: bool,
    },

    #[error("[SPR-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SPR-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl ReconError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SPR-1001",
            Self::MissingConfig { .. } => "SPR-1002",
            Self::ConfigParse { .. } => "SPR-1003",
            Self::Serialization { .. } => "SPR-2001",
            Self::Sql { .. } => "SPR-2002",
            Self::CommentTooLong { .. } => "SPR-2101",
            Self::InvalidBucket { .. } => "SPR-2102",
            Self::Remote { .. } => "SPR-3001",
            Self::Io { .. } => "SPR-3002",
            Self::Runtime { .. } => "SPR-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { retryable, .. } => *retryable,
            Self::Sql { .. } | Self::Io { .. } | Self::Runtime { .. } => true,
            Self::InvalidConfig { .. }
            | Self::MissingConfig { .. }
            | Self::ConfigParse { .. }
            | Self::Serialization { .. }
            | Self::CommentTooLong { .. }
            | Self::InvalidBucket { .. } => false,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for transient remote failures.
    #[must_use]
    pub fn remote_transient(operation: &'static str, details: impl Into<String>) -> Self {
        Self::Remote {
            operation,
            details: details.into(),
            retryable: true,
        }
    }

    /// Convenience constructor for permanent remote rejections.
    #[must_use]
    pub fn remote_rejected(operation: &'static str, details: impl Into<String>) -> Self {
        Self::Remote {
            operation,
            details: details.into(),
            retryable: false,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ReconError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for ReconError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for ReconError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReconError;

    #[test]
    fn remote_retryability_follows_constructor() {
        assert!(ReconError::remote_transient("upsert", "timeout").is_retryable());
        assert!(!ReconError::remote_rejected("upsert", "forbidden").is_retryable());
    }

    #[test]
    fn codes_are_stable() {
        let err = ReconError::CommentTooLong {
            length: 300,
            max: 280,
        };
        assert_eq!(err.code(), "SPR-2101");
        assert!(err.to_string().starts_with("[SPR-2101]"));
    }
}
