//! One sync run: fetch the full membership, then reconcile it.
//!
//! ```text
//! fetch_all_members ──(complete set)──► Reconciler::reconcile
//!        │
//!        └─ any page fails ──► abort, snapshot untouched
//! ```

use tracing::Instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::fetcher::fetch_all_members;
use crate::reconciler::Reconciler;
use crate::traits::{EventEmitter, MembershipSource, SnapshotStore};
use crate::types::{ReconcileReport, SegmentConfig};

/// Per-run switches.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub page_size: u32,
    /// Compute and log the delta without emitting events or saving.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            page_size: crate::fetcher::DEFAULT_PAGE_SIZE,
            dry_run: false,
        }
    }
}

/// Run the sync once for `segment`.
pub async fn run_once<M, E, S>(
    source: &M,
    reconciler: &Reconciler<E, S>,
    segment: &SegmentConfig,
    options: RunOptions,
) -> Result<ReconcileReport>
where
    M: MembershipSource + ?Sized,
    E: EventEmitter,
    S: SnapshotStore,
{
    let span = tracing::info_span!(
        "sync_run",
        run_id = %Uuid::new_v4(),
        segment_id = %segment.segment_id,
        dry_run = options.dry_run,
    );

    run_inner(source, reconciler, segment, options)
        .instrument(span)
        .await
}

async fn run_inner<M, E, S>(
    source: &M,
    reconciler: &Reconciler<E, S>,
    segment: &SegmentConfig,
    options: RunOptions,
) -> Result<ReconcileReport>
where
    M: MembershipSource + ?Sized,
    E: EventEmitter,
    S: SnapshotStore,
{
    tracing::info!(segment = %segment.segment_name, "Starting segment sync");

    let fresh = fetch_all_members(source, &segment.segment_id, options.page_size).await?;

    if options.dry_run {
        let delta = reconciler.plan(&fresh).await;
        for id in &delta.joined {
            tracing::info!(profile_id = %id, "Would send Joined Segment");
        }
        for id in &delta.left {
            tracing::info!(profile_id = %id, "Would send Left Segment");
        }
        tracing::info!(
            joined = delta.joined.len(),
            left = delta.left.len(),
            "Dry run complete, nothing sent or saved"
        );
        return Ok(ReconcileReport {
            joined: delta.joined.len(),
            left: delta.left.len(),
            dry_run: true,
            ..Default::default()
        });
    }

    let report = reconciler.reconcile(&fresh, segment).await?;
    tracing::info!(
        joined = report.joined,
        left = report.left,
        delivered = report.delivered(),
        failed = report.failure_count(),
        "Segment sync complete"
    );
    Ok(report)
}
