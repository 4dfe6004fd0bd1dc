//! Core downloader implementation split into focused submodules.
//!
//! The `GazetteDownloader` struct and its run loop are organized by domain:
//! - [`selection`] - Downward walk choosing this run's target editions
//! - [`edition`] - Per-edition lifecycle (discover, fetch, assemble)
//! - [`pages`] - Bounded-concurrency page fetch pool

mod edition;
mod pages;
mod selection;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::assembly::{ConcatAssembler, PageAssembler};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::landing;
use crate::ledger::{ArtifactCheck, CompletionCheck, ResumeLedger};
use crate::probe::{PageClient, PageService};
use crate::search;
use crate::types::{EditionId, EditionOutcome, Event, RunSummary};

use edition::EditionContext;

/// Broadcast capacity; lagging subscribers drop events, never block tasks
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct GazetteDownloader {
    /// Configuration (shared across tasks)
    config: Arc<Config>,
    /// Probe-and-fetch service for the page locator contract
    service: Arc<dyn PageService>,
    /// Assembly collaborator merging page files into one artifact
    assembler: Arc<dyn PageAssembler>,
    /// Plain HTTP client for landing-page discovery
    landing_http: reqwest::Client,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cooperative cancellation for the whole run
    cancel_token: CancellationToken,
}

impl GazetteDownloader {
    /// Create a downloader backed by the real HTTP service and the default
    /// concatenating assembler
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = PageClient::new(&config)?;
        let landing_http = client.http().clone();
        Ok(Self::assemble_parts(
            config,
            Arc::new(client),
            Arc::new(ConcatAssembler),
            landing_http,
        ))
    }

    /// Create a downloader with a custom page service and assembler.
    ///
    /// The seam for embedding: swap in a real PDF library for assembly, or
    /// a scripted service in tests.
    pub fn with_parts(
        config: Config,
        service: Arc<dyn PageService>,
        assembler: Arc<dyn PageAssembler>,
    ) -> Result<Self> {
        config.validate()?;
        let landing_http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self::assemble_parts(config, service, assembler, landing_http))
    }

    fn assemble_parts(
        config: Config,
        service: Arc<dyn PageService>,
        assembler: Arc<dyn PageAssembler>,
        landing_http: reqwest::Client,
    ) -> Self {
        let (event_tx, _) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config: Arc::new(config),
            service,
            assembler,
            landing_http,
            event_tx,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Subscribe to downloader events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Request cooperative cancellation: no new fetch tasks start, in-flight
    /// ones drain, and no partially-fetched edition reaches the ledger
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Token observed by all fetch tasks of this downloader
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// One full discovery-and-retrieval pass.
    ///
    /// Loads the resume ledger, discovers the newest edition, selects up to
    /// the configured number of not-yet-completed editions walking downward,
    /// processes them sequentially, and flushes the ledger after each
    /// completed edition.
    pub async fn run(&self) -> Result<RunSummary> {
        if self.cancel_token.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        self.remove_stale_temp().await;

        let mut ledger = ResumeLedger::load(&self.config.ledger_path).await;
        let artifact_check =
            ArtifactCheck::new(&self.config.output_dir, self.config.min_artifact_bytes);

        let latest = self.discover_latest().await?;
        let mut summary = RunSummary {
            latest,
            ..RunSummary::default()
        };
        let Some(latest) = latest else {
            tracing::warn!("No edition discovered, nothing to do");
            self.finish_run(summary.clone());
            return Ok(summary);
        };

        let selection = {
            let checks: [&dyn CompletionCheck; 2] = [&ledger, &artifact_check];
            selection::select_targets(latest, &checks, &self.config.discovery)
        };
        // Editions the walk passed over still count in the run's accounting
        summary.skipped = selection.skipped;
        if selection.targets.is_empty() {
            tracing::info!("No new editions to download");
            self.finish_run(summary.clone());
            return Ok(summary);
        }

        let ctx = EditionContext {
            config: Arc::clone(&self.config),
            service: Arc::clone(&self.service),
            assembler: Arc::clone(&self.assembler),
            event_tx: self.event_tx.clone(),
            cancel_token: self.cancel_token.clone(),
        };

        for id in selection.targets {
            if self.cancel_token.is_cancelled() {
                tracing::warn!("Cancellation requested, stopping before edition {id}");
                break;
            }

            let (mut outcome, pages) = {
                let checks: [&dyn CompletionCheck; 2] = [&ledger, &artifact_check];
                edition::process_edition(&ctx, id, &checks).await
            };

            // The ledger is mutated only here, between editions, and only
            // after the edition's assembly step succeeded
            if outcome == EditionOutcome::Completed {
                if let Err(e) = ledger.record_completed(&[id]).await {
                    tracing::error!(edition = id.0, error = %e, "Failed to persist resume ledger");
                    outcome = EditionOutcome::Failed;
                }
            }

            match outcome {
                EditionOutcome::Completed => summary.completed.push(id),
                // The guard inside process_edition can still fire when an
                // edition becomes complete mid-run
                EditionOutcome::AlreadyDone => summary.skipped.push(id),
                EditionOutcome::Empty => summary.empty.push(id),
                EditionOutcome::Failed => summary.failed.push(id),
            }
            self.event_tx
                .send(Event::EditionFinished {
                    id,
                    outcome,
                    summary: pages,
                })
                .ok();
            tracing::info!(
                edition = id.0,
                outcome = ?outcome,
                new = pages.retrieved,
                cached = pages.cached,
                failed = pages.failed,
                "Edition finished"
            );
        }

        self.finish_run(summary.clone());
        Ok(summary)
    }

    /// Newest edition id: landing-page shortcut first, binary boundary
    /// search as the load-bearing fallback
    async fn discover_latest(&self) -> Result<Option<EditionId>> {
        let bounds = self.config.discovery.edition_bounds;
        self.event_tx
            .send(Event::DiscoveryStarted {
                low: bounds.low,
                high: bounds.high,
            })
            .ok();

        let latest = if self.config.discovery.use_landing_page {
            match landing::latest_from_landing(&self.landing_http, &self.config.base_url).await {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(error = %e, "Landing-page discovery failed, falling back to binary search");
                    search::latest_edition(&*self.service, &self.config.discovery).await?
                }
            }
        } else {
            search::latest_edition(&*self.service, &self.config.discovery).await?
        };

        self.event_tx.send(Event::DiscoveryFinished { latest }).ok();
        Ok(latest)
    }

    /// Remove page files left behind by an interrupted prior run
    async fn remove_stale_temp(&self) {
        match tokio::fs::remove_dir_all(&self.config.temp_dir).await {
            Ok(()) => tracing::info!(dir = %self.config.temp_dir.display(), "Removed stale temp tree"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(dir = %self.config.temp_dir.display(), error = %e, "Could not remove stale temp tree");
            }
        }
    }

    fn finish_run(&self, summary: RunSummary) {
        tracing::info!(
            completed = summary.completed.len(),
            skipped = summary.skipped.len(),
            empty = summary.empty.len(),
            failed = summary.failed.len(),
            "Run finished"
        );
        self.event_tx.send(Event::RunFinished { summary }).ok();
    }
}
