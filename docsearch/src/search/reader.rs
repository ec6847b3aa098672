use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{trace, warn};

use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;

// Constants for file reading
const BUFFER_CAPACITY: usize = 65536;
pub(crate) const SMALL_FILE_THRESHOLD: u64 = 32 * 1024; // 32KB
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// Helper function to decode bytes into a String according to encoding mode
fn decode_bytes(bytes: &[u8], path: &Path, encoding_mode: EncodingMode) -> SearchResult<String> {
    match encoding_mode {
        EncodingMode::FailFast => match std::str::from_utf8(bytes) {
            Ok(valid_str) => Ok(valid_str.to_owned()),
            Err(_) => {
                // Rebuild the error as FromUtf8Error so the offending bytes travel with it
                match String::from_utf8(bytes.to_vec()) {
                    Ok(s) => Ok(s),
                    Err(e) => Err(SearchError::encoding_error(path, e)),
                }
            }
        },
        EncodingMode::Lossy => {
            let cow = String::from_utf8_lossy(bytes);
            // If it's Owned, at least one invalid sequence was replaced.
            if let std::borrow::Cow::Owned(_) = cow {
                warn!("Invalid UTF-8 replaced in file: {}", path.display());
            }
            Ok(cow.into_owned())
        }
    }
}

/// Reads source files into memory, picking a strategy by file size
#[derive(Debug, Clone)]
pub struct ContentReader {
    encoding_mode: EncodingMode,
    metrics: SearchMetrics,
}

impl ContentReader {
    pub fn new(encoding_mode: EncodingMode, metrics: SearchMetrics) -> Self {
        Self {
            encoding_mode,
            metrics,
        }
    }

    fn read_small_file(&self, path: &Path) -> SearchResult<String> {
        trace!("Using simple file reading for: {}", path.display());
        let bytes = std::fs::read(path).map_err(|e| SearchError::from_io(path, e))?;
        decode_bytes(&bytes, path, self.encoding_mode)
    }

    fn read_file_buffered(&self, path: &Path) -> SearchResult<String> {
        trace!("Using buffered file reading for: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;

        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| SearchError::from_io(path, e))?;

        decode_bytes(&bytes, path, self.encoding_mode)
    }

    fn read_mmap_file(&self, path: &Path) -> SearchResult<String> {
        trace!("Using memory-mapped file reading for: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;

        // The map lives only for the decode below; the file is not written during a run.
        let mmap = unsafe { Mmap::map(&file) }.map_err(SearchError::IoError)?;

        decode_bytes(&mmap, path, self.encoding_mode)
    }

    /// Reads and decodes the whole file.
    ///
    /// Any failure, including the file vanishing after it was listed, is
    /// returned to the caller; runs do not skip unreadable files.
    pub fn read(&self, path: &Path) -> SearchResult<String> {
        let metadata = path.metadata().map_err(|e| SearchError::from_io(path, e))?;
        if !metadata.is_file() {
            return Err(SearchError::file_not_found(path));
        }

        let size = metadata.len();
        self.metrics.record_file_processing(size);

        if size < SMALL_FILE_THRESHOLD {
            self.read_small_file(path)
        } else if size >= LARGE_FILE_THRESHOLD {
            self.read_mmap_file(path)
        } else {
            self.read_file_buffered(path)
        }
    }
}
