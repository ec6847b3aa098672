use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::matcher::PatternMatcher;
use super::reader::ContentReader;
use crate::config::{SearchConfig, SearchMethod};
use crate::errors::{SearchError, SearchResult};
use crate::index::IndexWorkspace;
use crate::metrics::SearchMetrics;
use crate::results::{ResultMap, SearchOutcome};

/// Counts the configured term in every file directly inside the configured
/// directory.
///
/// Files are processed one after another in file-name order. The first file
/// that cannot be read or indexed aborts the run; no partial results are
/// returned.
pub fn search(config: &SearchConfig) -> SearchResult<SearchOutcome> {
    let started = Instant::now();
    info!(
        "Starting {} search for {:?} in {}",
        config.method,
        config.term,
        config.root_path.display()
    );

    config.validate()?;

    let metrics = SearchMetrics::new();
    let matcher = PatternMatcher::with_metrics(config, metrics.clone())?;
    let reader = ContentReader::new(config.encoding_mode, metrics.clone());

    let files = list_files(&config.root_path)?;
    let names = files
        .iter()
        .map(|path| file_name(path))
        .collect::<SearchResult<Vec<_>>>()?;
    debug!("Found {} files to process", files.len());

    let mut workspace = match config.method {
        SearchMethod::Indexed => Some(IndexWorkspace::open(
            &config.index_dir,
            config.thread_count,
            metrics.clone(),
        )?),
        SearchMethod::Literal | SearchMethod::Regex => None,
    };

    let progress = progress_bar(config.show_progress, files.len() as u64);
    let mut results = ResultMap::with_capacity(files.len());
    let mut search_time = Duration::ZERO;

    for (path, name) in files.iter().zip(names) {
        let content = reader.read(path)?;

        let count = match workspace.as_mut() {
            Some(workspace) => {
                workspace.build(&name, &content, matcher.normalizer())?;
                let start = Instant::now();
                let count = matcher.count_indexed(workspace, &name);
                search_time += start.elapsed();
                count
            }
            None => {
                let content = matcher.normalizer().normalize(&content);
                let start = Instant::now();
                let count = matcher.count_in(&content);
                search_time += start.elapsed();
                count
            }
        };

        debug!("{}: {} matches", name, count);
        results.insert(name, count);
        progress.inc(1);
    }

    if let Some(mut workspace) = workspace {
        workspace.cleanup();
    }
    progress.finish_and_clear();

    metrics.log_stats();

    let outcome = SearchOutcome {
        results,
        search_time,
        total_time: started.elapsed(),
    };

    info!(
        "Search complete. Found {} matches in {} of {} files ({} in strategy, {} total)",
        outcome.results.total_matches(),
        outcome.results.files_with_matches(),
        outcome.files_searched(),
        humantime::format_duration(outcome.search_time),
        humantime::format_duration(outcome.total_time)
    );

    Ok(outcome)
}

/// Regular files directly inside `root`, sorted by file name.
///
/// Nothing is skipped for being hidden or ignored by VCS rules; only
/// subdirectories are left out.
pub fn list_files(root: &Path) -> SearchResult<Vec<PathBuf>> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(true)
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let msg = e.to_string();
            e.into_io_error()
                .map(SearchError::IoError)
                .unwrap_or_else(|| SearchError::IoError(io::Error::new(io::ErrorKind::Other, msg)))
        })?;
        if entry.depth() == 0 {
            continue;
        }
        if entry.file_type().is_some_and(|ft| ft.is_file()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// The file's name as a result key. Names that are not valid UTF-8 are
/// rejected; lossy conversion could give two files the same key.
fn file_name(path: &Path) -> SearchResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| SearchError::invalid_file_name(path))
}

fn progress_bar(visible: bool, len: u64) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files")
    {
        progress.set_style(style.progress_chars("=>-"));
    }
    progress
}
