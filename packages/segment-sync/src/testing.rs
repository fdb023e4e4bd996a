//! Test doubles for the sync pipeline.
//!
//! These let applications and tests drive the fetcher and reconciler without
//! network or disk. All doubles record their calls and are cheap to clone;
//! clones share state, so a test can keep a handle after moving one into a
//! `Reconciler`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{EmitError, FetchError, StoreError};
use crate::traits::{EventEmitter, MembershipPage, MembershipSource, SnapshotStore};
use crate::types::{LifecycleEvent, ProfileId, Snapshot};

// =============================================================================
// Mock Membership Source
// =============================================================================

/// Arguments captured from a page fetch
#[derive(Debug, Clone)]
pub struct FetchCallArgs {
    pub segment_id: String,
    pub page_size: u32,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone)]
enum PageResponse {
    /// `cursor: None` means "derive from position"
    Page {
        ids: Vec<String>,
        cursor: Option<Option<String>>,
    },
    Failure {
        status: u16,
        body: String,
    },
}

/// Serves queued pages in call order.
///
/// Pages added with [`with_page`](Self::with_page) get a `page-N` cursor
/// pointing at the next queued response, and no cursor when last.
#[derive(Clone, Default)]
pub struct MockMembershipSource {
    responses: Arc<Mutex<Vec<PageResponse>>>,
    calls: Arc<Mutex<Vec<FetchCallArgs>>>,
}

impl MockMembershipSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, ids: &[&str]) -> Self {
        self.push(PageResponse::Page {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            cursor: None,
        })
    }

    /// Queue a page with an explicit next cursor.
    pub fn with_cursor_page(self, ids: &[&str], next: Option<&str>) -> Self {
        self.push(PageResponse::Page {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            cursor: Some(next.map(str::to_string)),
        })
    }

    /// Queue a non-success response.
    pub fn with_failure(self, status: u16, body: &str) -> Self {
        self.push(PageResponse::Failure {
            status,
            body: body.to_string(),
        })
    }

    pub fn calls(&self) -> Vec<FetchCallArgs> {
        self.calls.lock().unwrap().clone()
    }

    fn push(self, response: PageResponse) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }
}

#[async_trait]
impl MembershipSource for MockMembershipSource {
    async fn fetch_page(
        &self,
        segment_id: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<MembershipPage, FetchError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(FetchCallArgs {
                segment_id: segment_id.to_string(),
                page_size,
                cursor: cursor.map(str::to_string),
            });
            calls.len() - 1
        };

        let responses = self.responses.lock().unwrap();
        match responses.get(index) {
            Some(PageResponse::Page { ids, cursor }) => {
                let next_cursor = match cursor {
                    Some(explicit) => explicit.clone(),
                    None if index + 1 < responses.len() => Some(format!("page-{}", index + 2)),
                    None => None,
                };
                Ok(MembershipPage {
                    profile_ids: ids.iter().map(|id| ProfileId::from(id.as_str())).collect(),
                    next_cursor,
                })
            }
            Some(PageResponse::Failure { status, body }) => Err(FetchError::Status {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(MembershipPage::default()),
        }
    }
}

// =============================================================================
// Recording Event Emitter
// =============================================================================

/// Records every emission; fails for configured profile ids.
#[derive(Clone, Default)]
pub struct RecordingEmitter {
    attempts: Arc<Mutex<Vec<LifecycleEvent>>>,
    delivered: Arc<Mutex<Vec<LifecycleEvent>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject events for these profile ids with a 500.
    pub fn failing_for(self, ids: &[&str]) -> Self {
        self.failing
            .lock()
            .unwrap()
            .extend(ids.iter().map(|s| s.to_string()));
        self
    }

    /// Every event passed to `emit`, in call order.
    pub fn attempts(&self) -> Vec<LifecycleEvent> {
        self.attempts.lock().unwrap().clone()
    }

    /// Events that were accepted.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventEmitter for RecordingEmitter {
    async fn emit(&self, event: &LifecycleEvent) -> Result<(), EmitError> {
        self.attempts.lock().unwrap().push(event.clone());

        if self
            .failing
            .lock()
            .unwrap()
            .contains(event.profile_id.as_str())
        {
            return Err(EmitError::Status {
                status: 500,
                body: "mock emitter failure".to_string(),
            });
        }

        self.delivered.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// =============================================================================
// In-memory Snapshot Store
// =============================================================================

/// Snapshot store kept in memory. Not suitable for production.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    snapshot: Arc<Mutex<Snapshot>>,
    saves: Arc<Mutex<usize>>,
    fail_saves: bool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a snapshot containing `ids`, last updated at a fixed past
    /// instant.
    pub fn with_members(ids: &[&str]) -> Self {
        let store = Self::new();
        *store.snapshot.lock().unwrap() = Snapshot::new(
            ids.iter().map(|id| ProfileId::from(*id)).collect(),
            Self::seeded_at(),
        );
        store
    }

    /// Make every `save` fail.
    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn seeded_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Snapshot {
        self.snapshot()
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Write {
                path: "memory".into(),
                source: std::io::Error::other("mock save failure"),
            });
        }
        *self.snapshot.lock().unwrap() = snapshot.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
