//! Segment membership sync.
//!
//! Polls a Klaviyo segment, diffs it against a locally persisted snapshot,
//! and emits "Joined Segment" / "Left Segment" events for every profile whose
//! membership changed since the last run.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use segment_sync::{run_once, Config, FileSnapshotStore, Reconciler, RunOptions};
//!
//! let config = Config::from_env()?;
//! let client = Arc::new(segment_sync::klaviyo::client_from_config(&config)?);
//! let reconciler = Reconciler::new(client.clone(), FileSnapshotStore::new(&config.cache_file));
//!
//! let report = run_once(&client, &reconciler, &config.segment, RunOptions::default()).await?;
//! println!("{} joined, {} left", report.joined, report.left);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Infrastructure seams (membership source, event emitter, snapshot store)
//! - [`fetcher`] - Paginated membership fetch
//! - [`reconciler`] - Diff, emission and snapshot persistence
//! - [`snapshot`] - File-backed snapshot store
//! - [`klaviyo`] - Klaviyo implementations of the seams
//! - [`testing`] - Mock implementations for testing

pub mod config;
pub mod error;
pub mod fetcher;
pub mod klaviyo;
pub mod pipeline;
pub mod reconciler;
pub mod snapshot;
pub mod testing;
pub mod traits;
pub mod types;

pub use config::Config;
pub use error::{
    ConfigError, EmitError, FetchError, ReconcileError, Result, StoreError, SyncError,
};
pub use fetcher::fetch_all_members;
pub use pipeline::{run_once, RunOptions};
pub use reconciler::Reconciler;
pub use snapshot::FileSnapshotStore;
pub use traits::{EventEmitter, MembershipPage, MembershipSource, SnapshotStore};
pub use types::{
    EmissionFailure, EventKind, LifecycleEvent, MembershipDelta, MembershipSet, ProfileId,
    ReconcileReport, SegmentConfig, Snapshot,
};
