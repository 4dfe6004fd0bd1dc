//! Assembly of retrieved page files into one output artifact
//!
//! The contract is deliberately thin: append page bytes, preserving order,
//! into one output stream. Order comes from sorting page files by numeric
//! index, never from retrieval completion order. A single unreadable page is
//! skipped with a warning rather than forfeiting an otherwise-complete
//! edition.
//!
//! The merge is blocking file I/O and runs under `spawn_blocking` so it
//! never stalls the scheduler driving network tasks.

use crate::error::{Error, Result};
use crate::types::PageIndex;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Collaborator that merges ordered page files into one artifact
#[async_trait]
pub trait PageAssembler: Send + Sync {
    /// Append the pages, in the order given, into `output`.
    ///
    /// Returns the number of pages actually merged. Fails only when no
    /// page could be merged at all.
    async fn assemble(&self, pages: Vec<PathBuf>, output: &Path) -> Result<usize>;
}

/// Default assembler: byte concatenation of the page files
pub struct ConcatAssembler;

#[async_trait]
impl PageAssembler for ConcatAssembler {
    async fn assemble(&self, pages: Vec<PathBuf>, output: &Path) -> Result<usize> {
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || merge_pages(&pages, &output))
            .await
            .map_err(|e| Error::Assembly(format!("assembly task panicked: {e}")))?
    }
}

fn merge_pages(pages: &[PathBuf], output: &Path) -> Result<usize> {
    let file = std::fs::File::create(output)?;
    let mut writer = std::io::BufWriter::new(file);
    let mut merged = 0usize;

    for page in pages {
        match std::fs::read(page) {
            Ok(bytes) => {
                writer.write_all(&bytes)?;
                merged += 1;
            }
            Err(e) => {
                // Best-effort merge: one bad intermediate file must not
                // forfeit the whole edition.
                tracing::warn!(page = %page.display(), error = %e, "Skipping unreadable page file");
            }
        }
    }
    writer.flush()?;

    if merged == 0 {
        let _ = std::fs::remove_file(output);
        return Err(Error::Assembly("no page could be merged".to_string()));
    }
    Ok(merged)
}

/// List the page files of a temp workspace in ascending numeric page order.
///
/// File names are `{index:04}.pdf`; anything that does not parse as a page
/// index is ignored. Sorting is by the parsed index, not lexicographic, so
/// page 2 always precedes page 10.
pub fn numeric_page_order(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut indexed: Vec<(PageIndex, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let stem = path.file_stem().and_then(|s| s.to_str());
        if let Some(index) = stem.and_then(|s| s.parse::<PageIndex>().ok()) {
            indexed.push((index, path));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, path)| path).collect())
}
