//! Typed errors for segment sync.
//!
//! Fatal errors (`ConfigError`, `FetchError`, `ReconcileError`) end the run.
//! `EmitError` is per event and only ever lands in a report.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ReconcileReport;

/// Configuration missing or malformed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration was valid but the HTTP client could not be built.
    #[error("failed to create API client: {0}")]
    Client(String),
}

/// Membership fetch aborted. No partial set is ever returned alongside it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("membership API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("membership request failed: {0}")]
    Transport(String),

    #[error("membership response could not be decoded: {0}")]
    Decode(String),

    #[error("pagination cursor repeated: {cursor}")]
    CursorLoop { cursor: String },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A single event submission failed.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("event API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("event request failed: {0}")]
    Transport(String),
}

/// Snapshot storage failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reconcile failed after events were emitted.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Events already went out; the next run will re-emit them.
    #[error("snapshot not saved after emitting events: {source}")]
    SnapshotWrite {
        report: Box<ReconcileReport>,
        #[source]
        source: StoreError,
    },
}

/// Any fatal error for one sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("reconcile failed: {0}")]
    Reconcile(#[from] ReconcileError),
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
