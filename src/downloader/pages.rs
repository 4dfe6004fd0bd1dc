//! Bounded fetch pool: parallel retrieval of one edition's pages.
//!
//! One task per page index, capped at the configured concurrency limit and
//! consumed in completion order, never submission order. Page tasks are
//! mutually independent: the only state they share is the concurrency gate,
//! and an individual failure never cancels its siblings. The edition as a
//! whole fails only when zero pages end up available.

use futures::stream::{self, StreamExt};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::probe::PDF_SIGNATURE;
use crate::types::{EditionId, Event, FetchResult, PageIndex, PageSummary};

use super::edition::EditionContext;

/// Page files are named by zero-padded index so lexicographic listing is
/// already close to numeric order; assembly still sorts numerically.
pub(crate) fn page_file_name(page: PageIndex) -> String {
    format!("{page:04}.pdf")
}

/// Whether the destination already holds validated content from a prior run.
///
/// An existing file only counts when it starts with the PDF signature;
/// anything else is refetched.
async fn destination_is_valid(path: &Path) -> bool {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(_) => return false,
    };
    let mut signature = [0u8; 4];
    match file.read_exact(&mut signature).await {
        Ok(_) => signature.as_slice() == PDF_SIGNATURE,
        Err(_) => false,
    }
}

/// Fetch all pages of one edition into the temp workspace.
///
/// Results are consumed as tasks complete; a `PageFinished` event is
/// emitted per page. Cancellation stops new tasks from starting while
/// in-flight ones drain.
pub(crate) async fn fetch_all(
    ctx: &EditionContext,
    edition: EditionId,
    page_count: u32,
    workspace: &Path,
) -> PageSummary {
    let mut results = stream::iter((1..=page_count).map(|page| {
        let dest = workspace.join(page_file_name(page));
        async move { (page, fetch_one(ctx, edition, page, &dest).await) }
    }))
    .buffer_unordered(ctx.config.max_concurrent_pages);

    let mut summary = PageSummary::default();
    while let Some((page, result)) = results.next().await {
        ctx.event_tx
            .send(Event::PageFinished {
                id: edition,
                page,
                result,
            })
            .ok();
        summary.record(result);
    }

    tracing::info!(
        edition = edition.0,
        retrieved = summary.retrieved,
        cached = summary.cached,
        failed = summary.failed,
        "Page fetch pass finished"
    );
    summary
}

async fn fetch_one(
    ctx: &EditionContext,
    edition: EditionId,
    page: PageIndex,
    dest: &Path,
) -> FetchResult {
    // Resume within the edition: a valid destination needs no network call
    if destination_is_valid(dest).await {
        return FetchResult::CachedAlready;
    }

    // Stop launching new fetches once cancellation is requested
    if ctx.cancel_token.is_cancelled() {
        return FetchResult::Failed;
    }

    match ctx.service.fetch(edition, page).await.into_success() {
        Some(bytes) if bytes.starts_with(PDF_SIGNATURE) => {
            // The full validated body is held in memory before the write,
            // so the destination is never partially written.
            match tokio::fs::write(dest, &bytes).await {
                Ok(()) => FetchResult::Retrieved(bytes.len()),
                Err(e) => {
                    tracing::error!(
                        edition = edition.0,
                        page = page,
                        error = %e,
                        "Failed to persist page"
                    );
                    FetchResult::Failed
                }
            }
        }
        Some(_) => {
            // 200 with a non-PDF body: the server served an error page
            tracing::warn!(
                edition = edition.0,
                page = page,
                "Payload failed the PDF signature check, discarding"
            );
            FetchResult::Failed
        }
        None => FetchResult::Failed,
    }
}
