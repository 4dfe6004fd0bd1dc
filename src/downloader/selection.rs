//! Target selection: which editions this run should process.
//!
//! Walks edition ids downward from the discovered newest, collecting up to
//! the configured count of not-yet-completed editions, and stops at the
//! floor id to bound worst-case work when the ledger is far behind.

use crate::config::DiscoveryConfig;
use crate::ledger::{CompletionCheck, already_completed};
use crate::types::EditionId;

/// Outcome of one selection walk.
///
/// `skipped` holds the already-completed ids the walk passed over, in walk
/// order; they count toward the run summary but not toward the per-run
/// target quota.
pub(crate) struct Selection {
    pub(crate) targets: Vec<EditionId>,
    pub(crate) skipped: Vec<EditionId>,
}

pub(crate) fn select_targets(
    latest: EditionId,
    checks: &[&dyn CompletionCheck],
    discovery: &DiscoveryConfig,
) -> Selection {
    let mut targets = Vec::new();
    let mut skipped = Vec::new();
    let mut current = latest.0;

    while targets.len() < discovery.editions_per_run && current > discovery.floor_edition {
        let id = EditionId(current);
        if already_completed(checks, id) {
            skipped.push(id);
        } else {
            targets.push(id);
        }
        current -= 1;
    }

    tracing::info!(
        latest = latest.0,
        selected = targets.len(),
        skipped = skipped.len(),
        "Target editions selected"
    );
    Selection { targets, skipped }
}
