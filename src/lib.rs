//! # diario-dl
//!
//! Backend library for retrieving paginated official-gazette editions from
//! a service with no listing API.
//!
//! The service publishes editions with dense integer ids, each composed of
//! sequentially numbered PDF pages. The only interface is a per-page
//! resource locator answering 200 or 404, so everything is built on
//! existence probes: a binary boundary search discovers the newest edition
//! and each edition's page count, a bounded-concurrency pool fetches the
//! pages with retry and backoff, pages are assembled in ascending order
//! into one artifact, and a resume ledger keeps completed editions from
//! being re-processed across runs.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Sensible defaults** - `Config::default()` targets the known service
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use diario_dl::{Config, GazetteDownloader, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = GazetteDownloader::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // One full pass, cancelled cleanly on SIGTERM/SIGINT
//!     let summary = run_with_shutdown(downloader).await?;
//!     println!("Completed editions: {:?}", summary.completed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Assembly of page files into one output artifact
pub mod assembly;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Landing-page edition discovery
pub mod landing;
/// Resume ledger and completion-check strategies
pub mod ledger;
/// Existence probing and page fetching
pub mod probe;
/// Retry logic with linear backoff
pub mod retry;
/// Binary boundary search over monotonic existence predicates
pub mod search;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use assembly::{ConcatAssembler, PageAssembler};
pub use config::{Config, DiscoveryConfig, IndeterminatePolicy, RetryConfig, SearchBounds};
pub use downloader::GazetteDownloader;
pub use error::{Error, Result};
pub use ledger::{ArtifactCheck, CompletionCheck, ResumeLedger};
pub use probe::{PDF_SIGNATURE, PageClient, PageService};
pub use retry::{IsRetryable, RequestOutcome};
pub use types::{
    EditionId, EditionOutcome, Event, ExistenceOutcome, FetchResult, PageIndex, PageSummary,
    RunSummary,
};

/// Helper function to run one pass with graceful signal handling.
///
/// Spawns the run and waits for either its completion or a termination
/// signal; on a signal the downloader is cancelled and the run is awaited
/// so in-flight work drains and temp workspaces are released.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with a Ctrl+C fallback if
///   signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(downloader: GazetteDownloader) -> Result<types::RunSummary> {
    let runner = downloader.clone();
    let mut run_task = tokio::spawn(async move { runner.run().await });

    tokio::select! {
        result = &mut run_task => flatten_run(result),
        _ = wait_for_signal() => {
            downloader.cancel();
            flatten_run(run_task.await)
        }
    }
}

fn flatten_run(
    result: std::result::Result<Result<types::RunSummary>, tokio::task::JoinError>,
) -> Result<types::RunSummary> {
    match result {
        Ok(inner) => inner,
        Err(e) => Err(Error::Other(format!("run task failed: {e}"))),
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
    }
}
