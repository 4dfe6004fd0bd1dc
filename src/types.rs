//! Core types for diario-dl

use serde::{Deserialize, Serialize};

/// Unique identifier for a published edition
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditionId(pub u32);

impl EditionId {
    /// Create a new EditionId
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner u32 value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for EditionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<EditionId> for u32 {
    fn from(id: EditionId) -> Self {
        id.0
    }
}

impl std::fmt::Display for EditionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EditionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Index of one page within an edition.
///
/// Pages are 1-based and dense: if page P exists, all pages 1..P exist,
/// because the service assigns page numbers sequentially at publication time.
pub type PageIndex = u32;

/// Outcome of a single existence probe against the remote service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistenceOutcome {
    /// The service explicitly confirmed the resource exists (200)
    Present,
    /// The service explicitly confirmed the resource does not exist (404)
    Absent,
    /// Retries were exhausted without a definitive answer.
    ///
    /// Callers that need correctness must never fold this into
    /// [`Absent`](Self::Absent) without an explicit policy decision
    /// (see [`IndeterminatePolicy`](crate::config::IndeterminatePolicy)).
    Indeterminate,
}

/// Per-page outcome of one fetch attempt within a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchResult {
    /// Page was fetched, validated, and written to its destination (payload size in bytes)
    Retrieved(usize),
    /// Destination already held validated content from a prior run; no network call made
    CachedAlready,
    /// Page could not be retrieved (absent, retry-exhausted, or failed the signature check)
    Failed,
}

/// Terminal state of processing one edition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditionOutcome {
    /// Pages fetched, artifact assembled, ledger updated
    Completed,
    /// Skipped without network access: already in the ledger or artifact on disk
    AlreadyDone,
    /// Page-count discovery found no pages at all
    Empty,
    /// Zero pages available after the fetch pass, or assembly/persistence failed
    Failed,
}

/// Aggregate page counts for one edition's fetch pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Pages fetched over the network this run
    pub retrieved: usize,
    /// Pages already valid on disk from a prior run
    pub cached: usize,
    /// Pages that could not be retrieved or failed validation
    pub failed: usize,
}

impl PageSummary {
    /// Total pages accounted for
    pub fn total(&self) -> usize {
        self.retrieved + self.cached + self.failed
    }

    /// True when at least one page is available for assembly
    pub fn any_available(&self) -> bool {
        self.retrieved + self.cached > 0
    }

    pub(crate) fn record(&mut self, result: FetchResult) {
        match result {
            FetchResult::Retrieved(_) => self.retrieved += 1,
            FetchResult::CachedAlready => self.cached += 1,
            FetchResult::Failed => self.failed += 1,
        }
    }
}

/// Final accounting for one full discovery-and-retrieval pass
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Newest edition id discovered, if any
    pub latest: Option<EditionId>,
    /// Editions completed (assembled and recorded) this run
    pub completed: Vec<EditionId>,
    /// Editions skipped because they were already done
    pub skipped: Vec<EditionId>,
    /// Editions where page-count discovery found no pages at all
    pub empty: Vec<EditionId>,
    /// Editions that ended Failed
    pub failed: Vec<EditionId>,
}

/// Events emitted by the downloader
///
/// Consumers subscribe via [`GazetteDownloader::subscribe`](crate::GazetteDownloader::subscribe).
/// Events are broadcast; slow subscribers may observe lag but never block the pipeline.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Discovery of the newest edition started
    DiscoveryStarted {
        /// Lower bound of the search window
        low: u32,
        /// Upper bound of the search window
        high: u32,
    },

    /// Discovery finished
    DiscoveryFinished {
        /// Newest edition found, if any
        latest: Option<EditionId>,
    },

    /// Processing of one edition started
    EditionStarted {
        /// Edition id
        id: EditionId,
    },

    /// Page count determined for an edition
    PagesDiscovered {
        /// Edition id
        id: EditionId,
        /// Number of pages found
        pages: u32,
    },

    /// One page task finished (completion order, not page order)
    PageFinished {
        /// Edition id
        id: EditionId,
        /// Page index
        page: PageIndex,
        /// Outcome for this page
        result: FetchResult,
    },

    /// Processing of one edition reached a terminal state
    EditionFinished {
        /// Edition id
        id: EditionId,
        /// Terminal outcome
        outcome: EditionOutcome,
        /// Page counts (zeroed for AlreadyDone/Empty)
        summary: PageSummary,
    },

    /// The whole run finished
    RunFinished {
        /// Final accounting
        summary: RunSummary,
    },
}
