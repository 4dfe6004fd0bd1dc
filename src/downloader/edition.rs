//! Per-edition orchestration: the lifecycle of a single edition.
//!
//! State machine: Pending → Discovering → Fetching → Assembling →
//! Completed, with Empty (no pages found) and Failed (nothing retrievable,
//! or assembly/persistence broke) as the other terminal states. A guard
//! before any network access skips editions that are already done.
//!
//! No error escapes one edition's processing into the selection loop; a
//! broken edition is reported as Failed and its siblings still run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::assembly::{self, PageAssembler};
use crate::config::Config;
use crate::ledger::{CompletionCheck, already_completed};
use crate::probe::PageService;
use crate::search;
use crate::types::{EditionId, EditionOutcome, Event, PageSummary};

use super::pages::fetch_all;

/// Shared handles for processing one edition
pub(crate) struct EditionContext {
    pub(crate) config: Arc<Config>,
    pub(crate) service: Arc<dyn PageService>,
    pub(crate) assembler: Arc<dyn PageAssembler>,
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    pub(crate) cancel_token: CancellationToken,
}

/// Scoped per-edition temp directory.
///
/// Removal happens in Drop, so the workspace is released on every exit
/// path, whether Completed, Empty, Failed, or cancelled.
struct TempWorkspace {
    dir: PathBuf,
}

impl TempWorkspace {
    async fn create(root: &Path, id: EditionId) -> std::io::Result<Self> {
        let dir = root.join(id.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path(&self) -> &Path {
        &self.dir
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to remove temp workspace");
            }
        }
    }
}

/// Process one edition to a terminal state.
///
/// The resume ledger is not touched here; recording completion is the run
/// loop's job, after this returns.
pub(crate) async fn process_edition(
    ctx: &EditionContext,
    id: EditionId,
    checks: &[&dyn CompletionCheck],
) -> (EditionOutcome, PageSummary) {
    // Guard: skip straight to done without any network access
    if already_completed(checks, id) {
        tracing::info!(edition = id.0, "Edition already completed, skipping");
        return (EditionOutcome::AlreadyDone, PageSummary::default());
    }

    ctx.event_tx.send(Event::EditionStarted { id }).ok();
    tracing::info!(edition = id.0, "Processing edition");

    // Discovering: how many pages does this edition have?
    let pages = match search::page_count(&*ctx.service, id, &ctx.config.discovery).await {
        Ok(0) => {
            tracing::info!(edition = id.0, "Edition has no pages");
            return (EditionOutcome::Empty, PageSummary::default());
        }
        Ok(n) => n,
        Err(e) => {
            tracing::error!(edition = id.0, error = %e, "Page-count discovery failed");
            return (EditionOutcome::Failed, PageSummary::default());
        }
    };
    ctx.event_tx.send(Event::PagesDiscovered { id, pages }).ok();
    tracing::info!(edition = id.0, pages = pages, "Page count discovered");

    // Fetching, inside a scoped workspace
    let workspace = match TempWorkspace::create(&ctx.config.temp_dir, id).await {
        Ok(w) => w,
        Err(e) => {
            tracing::error!(edition = id.0, error = %e, "Failed to create temp workspace");
            return (EditionOutcome::Failed, PageSummary::default());
        }
    };

    let summary = fetch_all(ctx, id, pages, workspace.path()).await;
    if !summary.any_available() {
        tracing::error!(edition = id.0, "No page could be retrieved");
        return (EditionOutcome::Failed, summary);
    }

    // A cancelled fetch pass must not produce a partial artifact or a
    // ledger entry; the workspace guard still cleans up.
    if ctx.cancel_token.is_cancelled() {
        tracing::warn!(edition = id.0, "Cancelled before assembly, discarding partial edition");
        return (EditionOutcome::Failed, summary);
    }

    // Assembling: strict ascending page order, derived from the numeric
    // index, regardless of retrieval completion order
    let page_files = match assembly::numeric_page_order(workspace.path()) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(edition = id.0, error = %e, "Failed to list page files");
            return (EditionOutcome::Failed, summary);
        }
    };

    let artifact = ctx.config.artifact_path(id);
    match ctx.assembler.assemble(page_files, &artifact).await {
        Ok(merged) => {
            tracing::info!(
                edition = id.0,
                merged = merged,
                artifact = %artifact.display(),
                "Edition assembled"
            );
            (EditionOutcome::Completed, summary)
        }
        Err(e) => {
            tracing::error!(edition = id.0, error = %e, "Assembly failed");
            (EditionOutcome::Failed, summary)
        }
    }
}
