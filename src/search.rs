//! Binary boundary search over a monotonic existence predicate
//!
//! The service publishes editions and pages with dense, sequential numbers,
//! so "does (edition, page) exist" is a monotonic non-increasing predicate
//! over each integer domain: true up to some unknown boundary, false above
//! it. [`find_boundary`] locates that boundary in O(log range) probes.
//!
//! Two instantiations: [`latest_edition`] (predicate = "edition e's page 1
//! exists" over the configured edition window) and [`page_count`]
//! (predicate = "edition e's page p exists" over the page window).

use crate::config::{DiscoveryConfig, IndeterminatePolicy};
use crate::error::{Error, Result};
use crate::probe::PageService;
use crate::types::{EditionId, ExistenceOutcome};
use std::future::Future;

/// Find the largest value in `[low, high]` for which `predicate` holds.
///
/// `predicate` must be monotonic non-increasing over the range: true for
/// small values, false beyond the boundary. Returns `None` when it was
/// never true. Completes in at most ⌈log2(high-low+1)⌉+1 evaluations.
pub async fn find_boundary<F, Fut>(low: u32, high: u32, mut predicate: F) -> Result<Option<u32>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let mut low = low;
    let mut high = high;
    let mut last_found = None;

    while low <= high {
        let mid = low + (high - low) / 2;
        if predicate(mid).await? {
            last_found = Some(mid);
            low = mid + 1;
        } else {
            match mid.checked_sub(1) {
                Some(below) => high = below,
                None => break,
            }
        }
    }

    Ok(last_found)
}

/// Resolve a probe outcome into a predicate value under the configured policy.
///
/// TreatAsAbsent folds retry-exhaustion into "does not exist" (the reference
/// behavior): the discovered boundary may come out too low under network
/// instability, never too high. Abort surfaces the ambiguity instead.
fn resolve_existence(outcome: ExistenceOutcome, policy: IndeterminatePolicy) -> Result<bool> {
    match outcome {
        ExistenceOutcome::Present => Ok(true),
        ExistenceOutcome::Absent => Ok(false),
        ExistenceOutcome::Indeterminate => match policy {
            IndeterminatePolicy::TreatAsAbsent => {
                tracing::warn!("Indeterminate probe folded into absent; boundary may be under-reported");
                Ok(false)
            }
            IndeterminatePolicy::Abort => Err(Error::DiscoveryInterrupted),
        },
    }
}

/// Discover the newest published edition inside the configured window.
///
/// The window is a conservative configuration constant, not a derived value:
/// when the result lands exactly on the upper bound the true newest edition
/// probably lies beyond a stale window, which is logged at warn so operators
/// can raise it.
pub async fn latest_edition(
    service: &dyn PageService,
    discovery: &DiscoveryConfig,
) -> Result<Option<EditionId>> {
    let bounds = discovery.edition_bounds;
    let policy = discovery.indeterminate_policy;
    tracing::info!(low = bounds.low, high = bounds.high, "Searching for newest edition");

    let found = find_boundary(bounds.low, bounds.high, |edition| async move {
        resolve_existence(service.probe(EditionId(edition), 1).await, policy)
    })
    .await?;

    match found {
        Some(id) if id == bounds.high => {
            tracing::warn!(
                edition = id,
                "Newest edition equals the search window's upper bound; the window is likely stale and should be raised"
            );
        }
        Some(id) => tracing::info!(edition = id, "Newest edition found"),
        None => tracing::warn!(
            low = bounds.low,
            high = bounds.high,
            "No edition found inside the search window"
        ),
    }

    Ok(found.map(EditionId))
}

/// Determine how many pages an edition has.
///
/// An explicit pre-check of page 1 short-circuits to 0 for a fully-absent
/// edition without running the boundary search; that outcome is distinct
/// from "boundary search found nothing" and costs a single probe.
pub async fn page_count(
    service: &dyn PageService,
    edition: EditionId,
    discovery: &DiscoveryConfig,
) -> Result<u32> {
    let policy = discovery.indeterminate_policy;
    if !resolve_existence(service.probe(edition, 1).await, policy)? {
        return Ok(0);
    }

    let bounds = discovery.page_bounds;
    let found = find_boundary(bounds.low, bounds.high, |page| async move {
        resolve_existence(service.probe(edition, page).await, policy)
    })
    .await?;

    Ok(found.unwrap_or(0))
}
