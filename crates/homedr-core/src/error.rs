//! Error types for the HomeDR subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DrError>;

/// Errors that can occur while tracking UID mappings or recovering workspaces.
#[derive(Debug, Error)]
pub enum DrError {
    /// The profile/domain service failed or returned an unusable response.
    #[error("profile service error: {msg}")]
    ProfileService {
        /// Error message describing the issue.
        msg: String,
    },

    /// A domain or user profile does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },

    /// Mapping store read/write failure.
    #[error("mapping store {table} error: {msg}")]
    MappingStore {
        /// The table the operation addressed.
        table: String,
        /// Error message describing the issue.
        msg: String,
    },

    /// Replication API failure other than not-found or duplicate-create.
    #[error("replication error for volume {volume_id}: {msg}")]
    Replication {
        /// The source volume identifier.
        volume_id: String,
        /// Error message describing the issue.
        msg: String,
    },

    /// Replication create was rejected because a configuration already exists.
    #[error("replication already exists for volume {volume_id}")]
    ReplicationExists {
        /// The source volume identifier.
        volume_id: String,
    },

    /// Parameter store write failure.
    #[error("parameter store error for {name}: {msg}")]
    ParameterStore {
        /// Parameter name.
        name: String,
        /// Error message describing the issue.
        msg: String,
    },

    /// Inbound lifecycle event is missing fields or malformed.
    #[error("invalid event: {msg}")]
    InvalidEvent {
        /// Error message describing the issue.
        msg: String,
    },

    /// A storage-owner identifier could not be interpreted as a numeric id.
    #[error("invalid owner id {value:?}")]
    InvalidOwnerId {
        /// The raw identifier.
        value: String,
    },

    /// Filesystem failure on a specific path.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path the operation addressed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invocation exceeded its wall-clock budget.
    #[error("invocation timed out after {secs}s")]
    Timeout {
        /// Configured timeout in seconds.
        secs: u64,
    },

    /// Configuration is missing or invalid.
    #[error("config error: {msg}")]
    Config {
        /// Error message describing the issue.
        msg: String,
    },

    /// A blocking filesystem task panicked or was cancelled.
    #[error("background task failed: {msg}")]
    Task {
        /// Error message describing the issue.
        msg: String,
    },
}

impl DrError {
    /// Build a filesystem error for `path`.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DrError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors that only signal an absence the caller is
    /// expected to handle by creating or skipping.
    pub fn is_expected_absence(&self) -> bool {
        match self {
            DrError::ReplicationExists { .. } => true,
            DrError::Filesystem { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns true for filesystem-class failures, which are isolated per profile.
    pub fn is_filesystem(&self) -> bool {
        matches!(
            self,
            DrError::Filesystem { .. } | DrError::Task { .. }
        )
    }
}
