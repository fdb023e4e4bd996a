// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no diffing or sequencing.
// The fetcher and reconciler are plain functions/structs over these traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{EmitError, FetchError, StoreError};
use crate::types::{LifecycleEvent, ProfileId, Snapshot};

// =============================================================================
// Membership Source (remote segment API)
// =============================================================================

/// One page of segment members.
#[derive(Debug, Clone, Default)]
pub struct MembershipPage {
    pub profile_ids: Vec<ProfileId>,
    /// Opaque token for the following page; `None` on the last page
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Fetch one page. `cursor` is `None` for the first page.
    async fn fetch_page(
        &self,
        segment_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<MembershipPage, FetchError>;
}

#[async_trait]
impl<T: MembershipSource + ?Sized> MembershipSource for Arc<T> {
    async fn fetch_page(
        &self,
        segment_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<MembershipPage, FetchError> {
        (**self).fetch_page(segment_id, page_size, cursor).await
    }
}

// =============================================================================
// Event Emitter (remote event API)
// =============================================================================

#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Submit one event. Called at most once per event per run.
    async fn emit(&self, event: &LifecycleEvent) -> Result<(), EmitError>;
}

#[async_trait]
impl<T: EventEmitter + ?Sized> EventEmitter for Arc<T> {
    async fn emit(&self, event: &LifecycleEvent) -> Result<(), EmitError> {
        (**self).emit(event).await
    }
}

// =============================================================================
// Snapshot Store (local persistence)
// =============================================================================

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last snapshot. Missing or unreadable storage yields an empty
    /// snapshot and is logged by the implementation.
    async fn load(&self) -> Snapshot;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}
