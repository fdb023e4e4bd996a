//! Domain types for segment membership sync.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque profile identifier, unique within a segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProfileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Profiles currently in a segment.
pub type MembershipSet = BTreeSet<ProfileId>;

/// Persisted membership as of the last completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Older cache files store members under `profiles`.
    #[serde(default, alias = "profiles")]
    pub members: MembershipSet,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(members: MembershipSet, last_updated: DateTime<Utc>) -> Self {
        Self {
            members,
            last_updated: Some(last_updated),
        }
    }

    /// True for a snapshot that has never been written.
    pub fn is_fresh(&self) -> bool {
        self.last_updated.is_none() && self.members.is_empty()
    }
}

/// Changes between a snapshot and a freshly fetched membership set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub joined: MembershipSet,
    pub left: MembershipSet,
}

impl MembershipDelta {
    pub fn between(previous: &MembershipSet, current: &MembershipSet) -> Self {
        Self {
            joined: current.difference(previous).cloned().collect(),
            left: previous.difference(current).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Direction of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Joined,
    Left,
}

impl EventKind {
    /// Metric name recorded on the remote platform.
    pub fn metric_name(&self) -> &'static str {
        match self {
            EventKind::Joined => "Joined Segment",
            EventKind::Left => "Left Segment",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric_name())
    }
}

/// Segment being tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentConfig {
    pub segment_id: String,
    pub segment_name: String,
}

impl SegmentConfig {
    pub fn new(segment_id: impl Into<String>, segment_name: impl Into<String>) -> Self {
        Self {
            segment_id: segment_id.into(),
            segment_name: segment_name.into(),
        }
    }
}

/// One outbound membership change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub profile_id: ProfileId,
    pub kind: EventKind,
    pub segment_id: String,
    pub segment_name: String,
    pub occurred_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(
        profile_id: ProfileId,
        kind: EventKind,
        segment: &SegmentConfig,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            profile_id,
            kind,
            segment_id: segment.segment_id.clone(),
            segment_name: segment.segment_name.clone(),
            occurred_at,
        }
    }
}

/// An event that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmissionFailure {
    pub profile_id: ProfileId,
    pub kind: EventKind,
    pub reason: String,
}

/// Outcome of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub joined: usize,
    pub left: usize,
    pub emission_failures: Vec<EmissionFailure>,
    /// Whether the snapshot was written
    pub persisted: bool,
    pub dry_run: bool,
}

impl ReconcileReport {
    pub fn failure_count(&self) -> usize {
        self.emission_failures.len()
    }

    /// Events that were attempted and accepted.
    pub fn delivered(&self) -> usize {
        if self.dry_run {
            return 0;
        }
        (self.joined + self.left).saturating_sub(self.failure_count())
    }
}
