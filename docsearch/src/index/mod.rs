//! Per-file hash index used by the indexed search method.
//!
//! Each source file gets its own [`IndexStore`]: a sparse table from token
//! slot to occurrence counter. The store is built in parallel from the file's
//! lines, written to `index_<file name>` in the index directory, and read back
//! with a single point lookup for the search term.
//!
//! Index files are scratch state for one run. [`IndexWorkspace`] owns them,
//! replaces leftovers from earlier runs before building, and deletes its
//! files when the run ends. Deletion is best-effort; a platform may keep the
//! storage around until the last handle to it is gone.

pub mod format;
pub mod store;

pub use store::{slot_for, token_hash, IndexStore, SLOT_COUNT};

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::tokenizer::Normalizer;

const INDEX_PREFIX: &str = "index_";

/// Association between a source file and its on-disk index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    /// File name of the indexed source file
    pub source_name: String,
    /// Location of the index file
    pub path: PathBuf,
    /// Number of slots stored in the index
    pub entries: usize,
}

impl IndexHandle {
    /// Counter for `term`, which must already be normalized the same way the
    /// indexed content was. Unreadable indexes count as 0.
    pub fn lookup(&self, term: &str) -> u64 {
        format::lookup(&self.path, slot_for(term))
    }
}

/// Owns the index files of one run
#[derive(Debug)]
pub struct IndexWorkspace {
    dir: PathBuf,
    created_dir: bool,
    pool: rayon::ThreadPool,
    handles: HashMap<String, IndexHandle>,
    metrics: SearchMetrics,
}

impl IndexWorkspace {
    /// Prepares `dir` for index files and a build pool of `threads` workers.
    pub fn open(dir: &Path, threads: NonZeroUsize, metrics: SearchMetrics) -> SearchResult<Self> {
        let created_dir = !dir.exists();
        fs::create_dir_all(dir).map_err(|e| {
            SearchError::index_error(format!(
                "Cannot create index directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.get())
            .thread_name(|i| format!("docsearch-index-{}", i))
            .build()
            .map_err(|e| SearchError::config_error(format!("Cannot start index workers: {}", e)))?;

        Ok(Self {
            dir: dir.to_path_buf(),
            created_dir,
            pool,
            handles: HashMap::new(),
            metrics,
        })
    }

    /// Where the index for `source_name` lives.
    pub fn index_path(&self, source_name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", INDEX_PREFIX, source_name))
    }

    /// Builds and writes the index for one source file, replacing any index
    /// left behind for the same name.
    pub fn build(
        &mut self,
        source_name: &str,
        content: &str,
        normalizer: Normalizer,
    ) -> SearchResult<&IndexHandle> {
        let path = self.index_path(source_name);
        self.remove_stale(&path)?;

        let store = self.pool.install(|| IndexStore::build(content, normalizer));
        let entries = store.sorted_entries();
        let bytes = self.persist(&path, &entries)?;

        self.metrics
            .record_index_build(store.tokens(), entries.len() as u64, bytes);
        debug!(
            "Indexed {} ({} tokens, {} slots) into {}",
            source_name,
            store.tokens(),
            entries.len(),
            path.display()
        );

        let handle = IndexHandle {
            source_name: source_name.to_string(),
            path,
            entries: entries.len(),
        };
        self.handles.insert(source_name.to_string(), handle);
        self.handles
            .get(source_name)
            .ok_or_else(|| SearchError::index_error(format!("Index for {} vanished", source_name)))
    }

    /// Counter for `term` in the index of `source_name`; 0 when that file
    /// was never indexed or its index cannot be read.
    pub fn lookup(&self, source_name: &str, term: &str) -> u64 {
        self.handles
            .get(source_name)
            .map_or(0, |handle| handle.lookup(term))
    }

    /// Deletes an index file from an earlier run so it can never be read.
    fn remove_stale(&self, path: &Path) -> SearchResult<()> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!("Removed stale index {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SearchError::index_error(format!(
                "Cannot remove stale index {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Writes through a temporary file in the index directory, then renames
    /// it into place.
    fn persist(&self, path: &Path, entries: &[(u32, u64)]) -> SearchResult<u64> {
        let to_index_error = |e: io::Error| {
            SearchError::index_error(format!("Cannot write index {}: {}", path.display(), e))
        };

        let tmp = NamedTempFile::new_in(&self.dir).map_err(to_index_error)?;
        let bytes = {
            let mut writer = BufWriter::new(tmp.as_file());
            format::write_index(&mut writer, entries).map_err(to_index_error)?
        };
        tmp.persist(path).map_err(|e| to_index_error(e.error))?;
        Ok(bytes)
    }

    /// Deletes every index file of this run. Failures are logged and left
    /// for the platform to reclaim later.
    pub fn cleanup(&mut self) {
        for (_, handle) in self.handles.drain() {
            match fs::remove_file(&handle.path) {
                Ok(()) => self.metrics.record_index_removal(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Could not delete index {}: {}", handle.path.display(), e);
                    self.metrics.record_index_removal(false);
                }
            }
        }

        if self.created_dir {
            // Only succeeds if nothing else was put there.
            if fs::remove_dir(&self.dir).is_ok() {
                self.created_dir = false;
            }
        }
    }
}

impl Drop for IndexWorkspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn workspace(dir: &Path) -> IndexWorkspace {
        IndexWorkspace::open(dir, NonZeroUsize::new(4).unwrap(), SearchMetrics::new()).unwrap()
    }

    #[test]
    fn test_build_and_lookup() {
        let dir = tempdir().unwrap();
        let mut ws = workspace(&dir.path().join("index_files"));

        let handle = ws.build("a.txt", "cat bat cat", Normalizer::new(false)).unwrap();
        assert_eq!(handle.entries, 2);
        assert!(handle.path.ends_with("index_a.txt"));
        assert!(handle.path.exists());

        assert_eq!(ws.lookup("a.txt", "cat"), 2);
        assert_eq!(ws.lookup("a.txt", "bat"), 1);
        assert_eq!(ws.lookup("a.txt", "dog"), 0);
        assert_eq!(ws.lookup("never-indexed.txt", "cat"), 0);
    }

    #[test]
    fn test_stale_index_is_replaced() {
        let dir = tempdir().unwrap();
        let index_dir = dir.path().join("index_files");
        std::fs::create_dir_all(&index_dir).unwrap();

        // Leftover from an earlier run with a very different count
        let stale = index_dir.join("index_a.txt");
        let mut file = std::fs::File::create(&stale).unwrap();
        format::write_index(&mut file, &[(slot_for("cat"), 1000)]).unwrap();
        drop(file);

        let mut ws = workspace(&index_dir);
        ws.build("a.txt", "cat", Normalizer::new(false)).unwrap();
        assert_eq!(ws.lookup("a.txt", "cat"), 1);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut ws = workspace(dir.path());

        ws.build("a.txt", "cat bat cat", Normalizer::new(false)).unwrap();
        let first = ws.lookup("a.txt", "cat");
        ws.build("a.txt", "cat bat cat", Normalizer::new(false)).unwrap();
        assert_eq!(ws.lookup("a.txt", "cat"), first);
        assert_eq!(first, 2);
    }

    #[test]
    fn test_cleanup_removes_files_and_created_dir() {
        let dir = tempdir().unwrap();
        let index_dir = dir.path().join("scratch");

        let mut ws = workspace(&index_dir);
        let path = ws.build("a.txt", "cat", Normalizer::new(false)).unwrap().path.clone();
        assert!(path.exists());

        ws.cleanup();
        assert!(!path.exists());
        assert!(!index_dir.exists());
        // Handles are gone, lookups fall back to zero
        assert_eq!(ws.lookup("a.txt", "cat"), 0);
    }

    #[test]
    fn test_cleanup_keeps_preexisting_dir() {
        let dir = tempdir().unwrap();
        {
            let mut ws = workspace(dir.path());
            ws.build("a.txt", "cat", Normalizer::new(false)).unwrap();
        }
        assert!(dir.path().exists());
        assert!(!dir.path().join("index_a.txt").exists());
    }

    #[test]
    fn test_lookup_after_external_delete_is_zero() {
        let dir = tempdir().unwrap();
        let mut ws = workspace(dir.path());
        let path = ws.build("a.txt", "cat", Normalizer::new(false)).unwrap().path.clone();

        std::fs::remove_file(&path).unwrap();
        assert_eq!(ws.lookup("a.txt", "cat"), 0);
    }
}
