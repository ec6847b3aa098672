use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::search::reader::{LARGE_FILE_THRESHOLD, SMALL_FILE_THRESHOLD};

/// Tracks what a search run did, shared across worker threads
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    // File reading metrics
    small_files_processed: Arc<AtomicU64>,
    buffered_files_processed: Arc<AtomicU64>,
    mmap_files_processed: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,

    // Pattern cache metrics
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,

    // Index metrics
    tokens_indexed: Arc<AtomicU64>,
    index_entries: Arc<AtomicU64>,
    index_bytes_written: Arc<AtomicU64>,
    indexes_removed: Arc<AtomicU64>,
    index_removal_failures: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            small_files_processed: Arc::new(AtomicU64::new(0)),
            buffered_files_processed: Arc::new(AtomicU64::new(0)),
            mmap_files_processed: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
            tokens_indexed: Arc::new(AtomicU64::new(0)),
            index_entries: Arc::new(AtomicU64::new(0)),
            index_bytes_written: Arc::new(AtomicU64::new(0)),
            indexes_removed: Arc::new(AtomicU64::new(0)),
            index_removal_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records which read tier a file of `size` bytes goes through
    pub fn record_file_processing(&self, size: u64) {
        if size < SMALL_FILE_THRESHOLD {
            self.small_files_processed.fetch_add(1, Ordering::Relaxed);
        } else if size >= LARGE_FILE_THRESHOLD {
            self.mmap_files_processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.buffered_files_processed
                .fetch_add(1, Ordering::Relaxed);
        }
        let total = self.bytes_read.fetch_add(size, Ordering::Relaxed) + size;
        debug!("Read {} bytes, total read: {} bytes", size, total);
    }

    /// Records a compiled pattern cache lookup
    pub fn record_cache_operation(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a finished index build
    pub fn record_index_build(&self, tokens: u64, entries: u64, bytes: u64) {
        self.tokens_indexed.fetch_add(tokens, Ordering::Relaxed);
        self.index_entries.fetch_add(entries, Ordering::Relaxed);
        let total = self.index_bytes_written.fetch_add(bytes, Ordering::Relaxed) + bytes;
        debug!(
            "Index written: {} tokens into {} entries ({} bytes), total written: {} bytes",
            tokens, entries, bytes, total
        );
    }

    /// Records the outcome of deleting an index file
    pub fn record_index_removal(&self, removed: bool) {
        if removed {
            self.indexes_removed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.index_removal_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Gets a snapshot of the current counters
    pub fn get_stats(&self) -> SearchStats {
        SearchStats {
            small_files: self.small_files_processed.load(Ordering::Relaxed),
            buffered_files: self.buffered_files_processed.load(Ordering::Relaxed),
            mmap_files: self.mmap_files_processed.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            tokens_indexed: self.tokens_indexed.load(Ordering::Relaxed),
            index_entries: self.index_entries.load(Ordering::Relaxed),
            index_bytes_written: self.index_bytes_written.load(Ordering::Relaxed),
            indexes_removed: self.indexes_removed.load(Ordering::Relaxed),
            index_removal_failures: self.index_removal_failures.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Files read (small/buffered/mmap): {}/{}/{}\n\
             Bytes read: {}\n\
             Pattern cache hits/misses: {}/{}\n\
             Tokens indexed: {}\n\
             Index entries/bytes written: {}/{}\n\
             Index files removed/failed: {}/{}",
            stats.small_files,
            stats.buffered_files,
            stats.mmap_files,
            stats.bytes_read,
            stats.cache_hits,
            stats.cache_misses,
            stats.tokens_indexed,
            stats.index_entries,
            stats.index_bytes_written,
            stats.indexes_removed,
            stats.index_removal_failures
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SearchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub small_files: u64,
    pub buffered_files: u64,
    pub mmap_files: u64,
    pub bytes_read: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub tokens_indexed: u64,
    pub index_entries: u64,
    pub index_bytes_written: u64,
    pub indexes_removed: u64,
    pub index_removal_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_processing_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_file_processing(1000); // Small file
        metrics.record_file_processing(100000); // Buffered file
        metrics.record_file_processing(20_000_000); // Memory mapped file

        let stats = metrics.get_stats();
        assert_eq!(stats.small_files, 1);
        assert_eq!(stats.buffered_files, 1);
        assert_eq!(stats.mmap_files, 1);
        assert_eq!(stats.bytes_read, 20_101_000);
    }

    #[test]
    fn test_cache_metrics() {
        let metrics = SearchMetrics::new();

        metrics.record_cache_operation(true);
        assert_eq!(metrics.cache_hits(), 1);
        assert_eq!(metrics.cache_misses(), 0);

        metrics.record_cache_operation(false);
        assert_eq!(metrics.cache_hits(), 1);
        assert_eq!(metrics.cache_misses(), 1);
    }

    #[test]
    fn test_index_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_index_build(3, 2, 40);
        metrics.record_index_build(5, 5, 76);
        metrics.record_index_removal(true);
        metrics.record_index_removal(false);

        let stats = metrics.get_stats();
        assert_eq!(stats.tokens_indexed, 8);
        assert_eq!(stats.index_entries, 7);
        assert_eq!(stats.index_bytes_written, 116);
        assert_eq!(stats.indexes_removed, 1);
        assert_eq!(stats.index_removal_failures, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = SearchMetrics::new();
        let clone = metrics.clone();
        clone.record_cache_operation(false);
        assert_eq!(metrics.cache_misses(), 1);
    }
}
