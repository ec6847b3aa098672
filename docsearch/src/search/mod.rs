//! Directory-wide term counting.
//!
//! A search run walks the files directly inside one directory and counts a
//! single term in each of them with one of three strategies:
//!
//! 1. **String Match**: the term as a literal. With partial matching every
//!    non-overlapping substring occurrence counts; without it only whole
//!    words do (`\bterm\b`).
//! 2. **Regular Expression**: the term compiled as a regex, counting
//!    non-overlapping matches.
//! 3. **Indexed**: each file's tokens are hashed into a sparse counter table
//!    that is written to disk, then the term's counter is read back.
//!
//! ```rust,ignore
//! let config = SearchConfig::new("cat", SearchMethod::Indexed, "./sample_files");
//! let outcome = search(&config)?;
//! for entry in outcome.results.ranked() {
//!     println!("{} - {} matches", entry.name, entry.count);
//! }
//! ```
//!
//! # Processing Model
//!
//! Files are handled strictly one at a time. The only parallel work is the
//! index build, where every line of a file becomes a rayon task and all tasks
//! write into the file's shared counter table:
//! ```rust,ignore
//! content.par_lines().for_each(|line| {
//!     normalizer.for_each_token(line, |token| store.record_token(token));
//! });
//! ```
//! The parallel loop returns only once every line is counted, so a lookup can
//! never observe a half-built index.
//!
//! # Timing
//!
//! Two durations come back with every run: the time spent inside the matching
//! strategy alone (reading, normalizing and index building excluded) and the
//! wall-clock time of the whole run.
//!
//! # Error Handling
//!
//! Everything is fail-fast:
//! ```rust,ignore
//! match search(&config) {
//!     Ok(outcome) => // every file was counted,
//!     Err(e) => // nothing was counted
//! }
//! ```

pub mod engine;
pub mod matcher;
pub mod reader;

pub use engine::{list_files, search};
pub use matcher::{MatchStrategy, PatternMatcher};
pub use reader::ContentReader;
