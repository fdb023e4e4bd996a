//! Membership fetcher.
//!
//! Walks every page of a segment and returns the complete member set. Any
//! failing page aborts the whole fetch: a partial set would make every member
//! on the unfetched pages look like they left.

use std::collections::HashSet;

use crate::error::FetchError;
use crate::traits::MembershipSource;
use crate::types::MembershipSet;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Fetch the full membership of `segment_id`.
pub async fn fetch_all_members<S>(
    source: &S,
    segment_id: &str,
    page_size: u32,
) -> Result<MembershipSet, FetchError>
where
    S: MembershipSource + ?Sized,
{
    let mut members = MembershipSet::new();
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut page_number = 0usize;

    loop {
        page_number += 1;

        let page = match source
            .fetch_page(segment_id, page_size, cursor.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(
                    segment_id,
                    page = page_number,
                    status = ?e.status(),
                    error = %e,
                    "Failed to fetch segment members, aborting fetch"
                );
                return Err(e);
            }
        };

        tracing::debug!(
            segment_id,
            page = page_number,
            count = page.profile_ids.len(),
            "Fetched members page"
        );
        members.extend(page.profile_ids);

        match page.next_cursor {
            Some(next) => {
                if !seen_cursors.insert(next.clone()) {
                    tracing::error!(segment_id, cursor = %next, "Pagination cursor repeated");
                    return Err(FetchError::CursorLoop { cursor: next });
                }
                cursor = Some(next);
            }
            None => break,
        }
    }

    tracing::info!(
        segment_id,
        pages = page_number,
        members = members.len(),
        "Fetched segment membership"
    );
    Ok(members)
}
