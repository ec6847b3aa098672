use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Match count for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCount {
    /// File name, unique within a run
    pub name: String,
    /// Number of matches found in the file
    pub count: u64,
}

/// Filename -> match count, in the order files were processed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultMap {
    entries: Vec<FileCount>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl ResultMap {
    /// Creates a new empty result map
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Records the count for `name`. A repeated name keeps its original
    /// position and returns the count it replaced.
    pub fn insert(&mut self, name: impl Into<String>, count: u64) -> Option<u64> {
        let name = name.into();
        match self.positions.get(&name) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].count, count)),
            None => {
                self.positions.insert(name.clone(), self.entries.len());
                self.entries.push(FileCount { name, count });
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.positions.get(name).map(|&i| self.entries[i].count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by count, highest first. Equal counts keep processing order.
    pub fn ranked(&self) -> Vec<&FileCount> {
        let mut ranked: Vec<&FileCount> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }

    /// Sum of all counts
    pub fn total_matches(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// Number of files with at least one match
    pub fn files_with_matches(&self) -> usize {
        self.entries.iter().filter(|entry| entry.count > 0).count()
    }
}

/// Everything a search run produces
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    /// Per-file counts
    pub results: ResultMap,
    /// Time spent inside the matching strategy only
    pub search_time: Duration,
    /// Wall-clock time of the whole run
    pub total_time: Duration,
}

impl SearchOutcome {
    /// Strategy-only time in whole milliseconds
    pub fn search_millis(&self) -> u64 {
        u64::try_from(self.search_time.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whole-run time in whole milliseconds
    pub fn total_millis(&self) -> u64 {
        u64::try_from(self.total_time.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn files_searched(&self) -> usize {
        self.results.len()
    }

    /// Serializable ranked view for machine-readable output
    pub fn report<'a>(&'a self, term: &'a str) -> SearchReport<'a> {
        SearchReport {
            term,
            results: self.results.ranked(),
            total_matches: self.results.total_matches(),
            files_searched: self.files_searched(),
            search_time_ms: self.search_millis(),
            total_time_ms: self.total_millis(),
        }
    }
}

/// Ranked results plus timings
#[derive(Debug, Serialize)]
pub struct SearchReport<'a> {
    pub term: &'a str,
    pub results: Vec<&'a FileCount>,
    pub total_matches: u64,
    pub files_searched: usize,
    pub search_time_ms: u64,
    pub total_time_ms: u64,
}
