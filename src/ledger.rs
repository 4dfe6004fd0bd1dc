//! Resume ledger: which editions were fully completed in prior runs
//!
//! A flat JSON array of edition ids, persisted sorted ascending for
//! reproducible diffs. A missing or corrupt file is treated as an empty set
//! rather than an error, so a damaged ledger only costs redundant work,
//! never a failed run.
//!
//! The ledger is owned exclusively by the orchestrator: fetch tasks never
//! touch it, and it is mutated only between editions.

use crate::error::Result;
use crate::types::EditionId;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Durable record of fully-completed edition ids
#[derive(Debug)]
pub struct ResumeLedger {
    path: PathBuf,
    completed: BTreeSet<EditionId>,
}

impl ResumeLedger {
    /// Load the ledger from disk, read once at process start.
    ///
    /// Decode errors are swallowed at warn: a corrupt backing store means
    /// "nothing completed yet", not a failed run.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let completed = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<Vec<EditionId>>(&raw) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Resume ledger is corrupt, starting from an empty set"
                    );
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Resume ledger could not be read, starting from an empty set"
                );
                BTreeSet::new()
            }
        };
        tracing::info!(
            path = %path.display(),
            completed = completed.len(),
            "Resume ledger loaded"
        );
        Self { path, completed }
    }

    /// Start an empty ledger backed by `path` without touching disk
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            completed: BTreeSet::new(),
        }
    }

    /// Whether an edition was fully completed in a prior run
    pub fn contains(&self, id: EditionId) -> bool {
        self.completed.contains(&id)
    }

    /// Number of completed editions on record
    pub fn len(&self) -> usize {
        self.completed.len()
    }

    /// True when no edition has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Merge newly completed ids into the set and persist it.
    ///
    /// Ids are only ever added, never removed. The full set is written
    /// sorted ascending, via a temp file renamed into place so an
    /// interrupted write can never corrupt the previous ledger.
    pub async fn record_completed(&mut self, ids: &[EditionId]) -> Result<()> {
        self.completed.extend(ids.iter().copied());
        let sorted: Vec<EditionId> = self.completed.iter().copied().collect();
        let serialized = serde_json::to_vec_pretty(&sorted)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &serialized).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::info!(
            path = %self.path.display(),
            added = ids.len(),
            total = self.completed.len(),
            "Resume ledger updated"
        );
        Ok(())
    }
}

/// Pluggable "has this edition already been completed?" predicate.
///
/// Two interchangeable strategies exist: the ledger itself, and the
/// presence of a non-trivially-sized assembled artifact on disk. The
/// orchestrator consults both before spending any network access.
pub trait CompletionCheck: Send + Sync {
    /// Whether the edition needs no further processing
    fn is_completed(&self, id: EditionId) -> bool;
}

impl CompletionCheck for ResumeLedger {
    fn is_completed(&self, id: EditionId) -> bool {
        self.contains(id)
    }
}

/// Completion strategy keyed on the assembled output artifact
pub struct ArtifactCheck {
    output_dir: PathBuf,
    min_bytes: u64,
}

impl ArtifactCheck {
    /// Check against `output_dir`, requiring at least `min_bytes` on disk
    pub fn new(output_dir: impl Into<PathBuf>, min_bytes: u64) -> Self {
        Self {
            output_dir: output_dir.into(),
            min_bytes,
        }
    }

    fn artifact_path(&self, id: EditionId) -> PathBuf {
        self.output_dir.join(format!("edicao_{id}.pdf"))
    }
}

impl CompletionCheck for ArtifactCheck {
    fn is_completed(&self, id: EditionId) -> bool {
        match std::fs::metadata(self.artifact_path(id)) {
            Ok(meta) => meta.is_file() && meta.len() >= self.min_bytes,
            Err(_) => false,
        }
    }
}

/// True when any strategy considers the edition done
pub fn already_completed(checks: &[&dyn CompletionCheck], id: EditionId) -> bool {
    checks.iter().any(|c| c.is_completed(id))
}
