//! Error types for the content tools

use std::path::PathBuf;

use thiserror::Error;

/// Result type for content operations
pub type Result<T> = std::result::Result<T, ContentError>;

/// Content database errors
///
/// Referential defects (broken references, duplicate producers, ...) are not
/// errors; they are reported as validation issues.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("{what} not found in {path}")]
    MissingStructure { path: PathBuf, what: &'static str },

    #[error("Registry entry not found: {0}")]
    EntryNotFound(String),

    #[error("Invalid folder name: {0:?}")]
    InvalidFolder(String),

    #[error("Duplicate registry slug: {0}")]
    DuplicateSlug(String),

    #[error("Rename {old} -> {new} failed: {reason}")]
    RenameFailed {
        old: String,
        new: String,
        reason: String,
    },

    #[error("Backup failed for {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed data in {path}: {message}")]
    InvalidSeed { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
