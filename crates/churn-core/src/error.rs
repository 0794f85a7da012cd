//! Error types for churn-core.
//!
//! Three layers, from the wire outward:
//! - [`ClientError`]: what the admin client surfaces for a single call.
//! - [`WorkerError`]: what a worker records into the failure slot.
//! - [`ChurnError`]: what a run returns to its caller.

use serde::{Deserialize, Serialize};

use crate::report::FailureReport;

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, ChurnError>;

/// Message fragments that mark a query failure as an expected absence.
///
/// Only consulted for error kinds other than [`ClientError::NotFound`];
/// clients that cannot classify their errors still get correct probe policy.
pub const NOT_FOUND_MARKERS: [&str; 2] = ["not found", "Can not find"];

/// Errors surfaced by an [`AdminClient`](crate::client::AdminClient) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ClientError {
    /// The named resource does not exist.
    #[error("resource not found: {resource}: {message}")]
    NotFound {
        /// Resource that was looked up.
        resource: String,
        /// Service-provided message.
        message: String,
    },

    /// The service answered with an error status.
    #[error("server error {code}: {message}")]
    Server {
        /// HTTP-like status code.
        code: u16,
        /// Service-provided message.
        message: String,
    },

    /// The request never completed (connection reset, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The request or response could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The service refused the request before processing it.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Creates a server error.
    #[must_use]
    pub fn server(code: u16, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Returns true if this error signals that the resource is absent.
    ///
    /// The [`NotFound`](Self::NotFound) kind is authoritative. Every other kind
    /// falls back to matching [`NOT_FOUND_MARKERS`] against the rendered
    /// message.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            other => {
                let message = other.to_string();
                NOT_FOUND_MARKERS.iter().any(|m| message.contains(m))
            }
        }
    }
}

/// Lifecycle operation issued by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Create the resource.
    Create,
    /// Delete the resource.
    Delete,
    /// Read-only query against the resource.
    Query,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Query => "query",
        };
        f.write_str(name)
    }
}

/// A failure observed by a worker.
///
/// Status failures (the call returned, but with a non-zero status) and
/// exception failures (the call itself errored) are separate variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum WorkerError {
    /// Create returned a non-zero status.
    #[error("failed to create {resource} (status {status})")]
    CreateStatus {
        /// Resource name.
        resource: String,
        /// Status reported by the service.
        status: i32,
    },

    /// Delete returned a non-zero status.
    #[error("failed to delete {resource} (status {status})")]
    DeleteStatus {
        /// Resource name.
        resource: String,
        /// Status reported by the service.
        status: i32,
    },

    /// Create raised an error.
    #[error("create {resource} raised: {source}")]
    Create {
        /// Resource name.
        resource: String,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },

    /// Delete raised an error.
    #[error("delete {resource} raised: {source}")]
    Delete {
        /// Resource name.
        resource: String,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },

    /// Probe query raised something other than an expected absence.
    #[error("query {resource} raised: {source}")]
    Probe {
        /// Resource name.
        resource: String,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },
}

impl WorkerError {
    /// Creates a create-status failure.
    #[must_use]
    pub fn create_status(resource: impl Into<String>, status: i32) -> Self {
        Self::CreateStatus {
            resource: resource.into(),
            status,
        }
    }

    /// Creates a delete-status failure.
    #[must_use]
    pub fn delete_status(resource: impl Into<String>, status: i32) -> Self {
        Self::DeleteStatus {
            resource: resource.into(),
            status,
        }
    }

    /// Wraps a client error raised by the given operation.
    #[must_use]
    pub fn raised(op: Operation, resource: impl Into<String>, source: ClientError) -> Self {
        let resource = resource.into();
        match op {
            Operation::Create => Self::Create { resource, source },
            Operation::Delete => Self::Delete { resource, source },
            Operation::Query => Self::Probe { resource, source },
        }
    }

    /// Returns true if the call completed but reported a non-zero status.
    #[must_use]
    pub const fn is_status_failure(&self) -> bool {
        matches!(self, Self::CreateStatus { .. } | Self::DeleteStatus { .. })
    }

    /// Returns the operation that failed.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::CreateStatus { .. } | Self::Create { .. } => Operation::Create,
            Self::DeleteStatus { .. } | Self::Delete { .. } => Operation::Delete,
            Self::Probe { .. } => Operation::Query,
        }
    }

    /// Returns the resource the failing call targeted.
    #[must_use]
    pub fn resource(&self) -> &str {
        match self {
            Self::CreateStatus { resource, .. }
            | Self::DeleteStatus { resource, .. }
            | Self::Create { resource, .. }
            | Self::Delete { resource, .. }
            | Self::Probe { resource, .. } => resource,
        }
    }
}

/// Errors returned by the harness to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ChurnError {
    /// Invalid run configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Pre-run setup failed (config upload, client connect).
    #[error("setup failed: {0}")]
    Setup(String),

    /// A worker task could not be joined.
    #[error("worker {worker} did not join: {reason}")]
    Join {
        /// Worker label.
        worker: String,
        /// Panic or cancellation description.
        reason: String,
    },

    /// The run observed at least one unexpected failure.
    #[error("concurrent create and delete failed: {0}")]
    Failed(FailureReport),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ChurnError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a setup error.
    #[must_use]
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }

    /// Returns the failure report if this is a failed verdict.
    #[must_use]
    pub const fn failure(&self) -> Option<&FailureReport> {
        match self {
            Self::Failed(report) => Some(report),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ChurnError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
