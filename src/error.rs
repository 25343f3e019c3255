use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindfigError {
    #[error("No configuration store is active; call set_store() or set_path() first")]
    NotConfigured,

    #[error("A configuration store is already active; call reset() before installing another")]
    AlreadyConfigured,

    #[error("Cannot convert '{text}' to {target}: {reason}")]
    Conversion {
        target: &'static str,
        text: String,
        reason: String,
    },

    #[error("Invalid value for {target}: {reason}")]
    Validation {
        target: &'static str,
        reason: String,
    },

    #[error("Unknown member '{token}' for {target}")]
    UnknownMember { target: &'static str, token: String },

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Invalid delimiters: {0}")]
    InvalidDelimiters(String),

    #[error("I/O error on {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Could not resolve a config directory for this platform")]
    NoConfigDir,

    #[error("Attribute name is required; call .attribute() or .option() on the builder")]
    AttributeNameRequired,

    #[error("Section is required; call .owner::<T>() or .section() on the builder")]
    SectionRequired,
}

impl BindfigError {
    pub(crate) fn conversion(
        target: &'static str,
        text: &str,
        reason: impl std::fmt::Display,
    ) -> Self {
        BindfigError::Conversion {
            target,
            text: text.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn validation(target: &'static str, reason: impl std::fmt::Display) -> Self {
        BindfigError::Validation {
            target,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BindfigError::IoError {
            path: path.into(),
            source,
        }
    }
}
