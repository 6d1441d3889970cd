//! Error types
//!
//! Typed errors for dataset access and configuration, defined with
//! `thiserror`. Framework-internal failures (shape mismatches, resource
//! exhaustion) are not translated here; they surface directly from Burn.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for CIFAR maxout operations
#[derive(Error, Debug)]
pub enum CifarMaxoutError {
    /// Dataset file missing on disk
    #[error("Dataset file not found: {0}")]
    DatasetNotFound(PathBuf),

    /// Dataset file exists but its contents do not match the CIFAR binary
    /// layout
    #[error("Malformed dataset file '{path}': {reason}")]
    MalformedDataset { path: PathBuf, reason: String },

    /// Downloading or unpacking the dataset archive failed
    #[error("Download error: {0}")]
    Download(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training cannot proceed
    #[error("Training error: {0}")]
    Training(String),

    /// Writing an artifact (e.g. the model plot) failed
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for CIFAR maxout operations
pub type Result<T> = std::result::Result<T, CifarMaxoutError>;
