//! Reconciler: snapshot load, diff, per-event emission, snapshot persist.
//!
//! ```text
//! load snapshot ──► diff against fresh set ──► emit Joined/Left ──► save fresh set
//!   (never fails)                             (failures recorded)   (fatal on error)
//! ```
//!
//! The saved snapshot always equals the fetched set, whether or not every
//! emission succeeded. It tracks known remote state, not delivered events.

use chrono::Utc;

use crate::error::ReconcileError;
use crate::traits::{EventEmitter, SnapshotStore};
use crate::types::{
    EmissionFailure, EventKind, LifecycleEvent, MembershipDelta, MembershipSet, ReconcileReport,
    SegmentConfig, Snapshot,
};

pub struct Reconciler<E, S> {
    emitter: E,
    store: S,
}

impl<E, S> Reconciler<E, S>
where
    E: EventEmitter,
    S: SnapshotStore,
{
    pub fn new(emitter: E, store: S) -> Self {
        Self { emitter, store }
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the snapshot and diff it against `fresh` without side effects.
    pub async fn plan(&self, fresh: &MembershipSet) -> MembershipDelta {
        let snapshot = self.store.load().await;
        if snapshot.is_fresh() {
            tracing::info!(
                members = fresh.len(),
                "No prior membership; every current member will be reported as joined"
            );
        }
        MembershipDelta::between(&snapshot.members, fresh)
    }

    /// Emit one event per membership change and persist `fresh` as the new
    /// snapshot.
    pub async fn reconcile(
        &self,
        fresh: &MembershipSet,
        segment: &SegmentConfig,
    ) -> Result<ReconcileReport, ReconcileError> {
        let delta = self.plan(fresh).await;

        let mut report = ReconcileReport {
            joined: delta.joined.len(),
            left: delta.left.len(),
            ..Default::default()
        };

        if delta.is_empty() {
            tracing::info!(segment = %segment.segment_name, "No membership changes");
        } else {
            tracing::info!(
                segment = %segment.segment_name,
                joined = report.joined,
                left = report.left,
                "Membership changed"
            );
        }

        let changes = delta
            .joined
            .into_iter()
            .map(|id| (id, EventKind::Joined))
            .chain(delta.left.into_iter().map(|id| (id, EventKind::Left)));

        for (profile_id, kind) in changes {
            let event = LifecycleEvent::new(profile_id, kind, segment, Utc::now());
            match self.emitter.emit(&event).await {
                Ok(()) => {
                    tracing::info!(
                        profile_id = %event.profile_id,
                        event = %kind,
                        "Event sent"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        profile_id = %event.profile_id,
                        event = %kind,
                        error = %e,
                        "Failed to send event"
                    );
                    report.emission_failures.push(EmissionFailure {
                        profile_id: event.profile_id,
                        kind,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let snapshot = Snapshot::new(fresh.clone(), Utc::now());
        if let Err(source) = self.store.save(&snapshot).await {
            tracing::error!(
                error = %source,
                joined = report.joined,
                left = report.left,
                "Failed to save snapshot; the next run will re-send these events"
            );
            return Err(ReconcileError::SnapshotWrite {
                report: Box::new(report),
                source,
            });
        }
        report.persisted = true;

        tracing::info!(
            members = fresh.len(),
            failed_events = report.failure_count(),
            "Snapshot updated"
        );
        Ok(report)
    }
}
