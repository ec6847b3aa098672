use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use crate::config::{SearchConfig, SearchMethod};
use crate::errors::{SearchError, SearchResult};
use crate::index::{IndexStore, IndexWorkspace};
use crate::metrics::SearchMetrics;
use crate::tokenizer::Normalizer;

/// Compiled patterns keyed by (pattern, case-insensitive)
static PATTERN_CACHE: Lazy<DashMap<(String, bool), Arc<Regex>>> = Lazy::new(DashMap::new);

/// How a term is counted
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Every non-overlapping occurrence of the term as a substring
    Substring(String),
    /// Occurrences of the term as a whole word (`\bterm\b`)
    WholeWord(Arc<Regex>),
    /// Matches of the term compiled as a regular expression
    Regex(Arc<Regex>),
    /// Counter lookup in the file's index store
    Indexed(String),
}

/// Counts one search term with the strategy selected by the configuration
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    strategy: MatchStrategy,
    normalizer: Normalizer,
    metrics: SearchMetrics,
}

impl PatternMatcher {
    /// Creates a new PatternMatcher for the configured term and method
    pub fn new(config: &SearchConfig) -> SearchResult<Self> {
        Self::with_metrics(config, SearchMetrics::new())
    }

    /// Creates a new PatternMatcher with the specified metrics.
    ///
    /// Regular expressions are compiled here, so a bad pattern fails before
    /// any file is read.
    pub fn with_metrics(config: &SearchConfig, metrics: SearchMetrics) -> SearchResult<Self> {
        if config.term.is_empty() {
            return Err(SearchError::config_error("The search term must not be empty"));
        }

        let normalizer = Normalizer::new(config.case_insensitive);
        let term = normalizer.normalize(&config.term).into_owned();

        let strategy = match config.method {
            SearchMethod::Literal if config.effective_partial_match() => {
                MatchStrategy::Substring(term)
            }
            SearchMethod::Literal => {
                let pattern = format!(r"\b{}\b", regex::escape(&term));
                MatchStrategy::WholeWord(compile(&pattern, config.case_insensitive, &metrics)?)
            }
            // The pattern keeps its case; case-folding is left to the regex engine.
            SearchMethod::Regex => {
                MatchStrategy::Regex(compile(&config.term, config.case_insensitive, &metrics)?)
            }
            SearchMethod::Indexed => MatchStrategy::Indexed(term),
        };

        Ok(Self {
            strategy,
            normalizer,
            metrics,
        })
    }

    /// Case policy the content must be normalized with before counting
    pub fn normalizer(&self) -> Normalizer {
        self.normalizer
    }

    /// Gets the current metrics
    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// Counts matches in content already passed through [`Self::normalizer`].
    ///
    /// The indexed strategy builds an in-memory [`IndexStore`] over the
    /// content and reads the term's slot, so colliding tokens inflate the
    /// count exactly as an on-disk index does.
    pub fn count_in(&self, content: &str) -> u64 {
        match &self.strategy {
            MatchStrategy::Substring(term) => count_substring(content, term),
            MatchStrategy::WholeWord(regex) | MatchStrategy::Regex(regex) => {
                count_regex(content, regex)
            }
            // Content is already normalized; building must not fold it twice.
            MatchStrategy::Indexed(term) => {
                IndexStore::build(content, Normalizer::new(false)).count(term)
            }
        }
    }

    /// Counts the term in the index built for `source_name`.
    pub fn count_indexed(&self, workspace: &IndexWorkspace, source_name: &str) -> u64 {
        workspace.lookup(source_name, self.term())
    }

    /// The term as the strategy sees it
    pub fn term(&self) -> &str {
        match &self.strategy {
            MatchStrategy::Substring(term) | MatchStrategy::Indexed(term) => term,
            MatchStrategy::WholeWord(regex) | MatchStrategy::Regex(regex) => regex.as_str(),
        }
    }
}

/// Compiles `pattern`, reusing an earlier compilation when possible
fn compile(pattern: &str, case_insensitive: bool, metrics: &SearchMetrics) -> SearchResult<Arc<Regex>> {
    let key = (pattern.to_string(), case_insensitive);
    if let Some(entry) = PATTERN_CACHE.get(&key) {
        metrics.record_cache_operation(true);
        return Ok(entry.clone());
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| SearchError::invalid_pattern(format!("{}: {}", pattern, e)))?;
    let regex = Arc::new(regex);

    metrics.record_cache_operation(false);
    PATTERN_CACHE.insert(key, regex.clone());
    Ok(regex)
}

/// Non-overlapping occurrences of `term`, scanning left to right
pub fn count_substring(content: &str, term: &str) -> u64 {
    if term.is_empty() {
        return 0;
    }
    content.matches(term).count() as u64
}

/// Non-overlapping matches of `regex`
pub fn count_regex(content: &str, regex: &Regex) -> u64 {
    regex.find_iter(content).count() as u64
}


#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(term: &str, method: SearchMethod, partial: bool, insensitive: bool) -> PatternMatcher {
        let mut config = SearchConfig::new(term, method, ".");
        config.partial_match = partial;
        config.case_insensitive = insensitive;
        PatternMatcher::new(&config).unwrap()
    }

    fn count(m: &PatternMatcher, content: &str) -> u64 {
        let content = m.normalizer().normalize(content);
        m.count_in(&content)
    }

    #[test]
    fn test_cat_bat_cat() {
        let content = "cat bat cat";
        assert_eq!(count(&matcher("cat", SearchMethod::Literal, false, false), content), 2);
        assert_eq!(count(&matcher("cat", SearchMethod::Regex, false, false), content), 2);
        assert_eq!(count(&matcher("cat", SearchMethod::Indexed, false, false), content), 2);
    }

    #[test]
    fn test_partial_versus_whole_word() {
        let content = "cat bat";
        assert_eq!(count(&matcher("at", SearchMethod::Literal, true, false), content), 2);
        assert_eq!(count(&matcher("at", SearchMethod::Literal, false, false), content), 0);
    }

    #[test]
    fn test_substring_is_non_overlapping() {
        assert_eq!(count_substring("aaaa", "aa"), 2);
        assert_eq!(count_substring("abababa", "aba"), 2);
        assert_eq!(count_substring("", "a"), 0);
        assert_eq!(count_substring("abc", ""), 0);
    }

    #[test]
    fn test_whole_word_equals_bounded_regex() {
        let contents = [
            "the cat sat on the cat-mat; concatenate cat.",
            "cat\ncat\tcats scat",
            "",
        ];
        for content in contents {
            let literal = count(&matcher("cat", SearchMethod::Literal, false, false), content);
            let regex = count(&matcher(r"\bcat\b", SearchMethod::Regex, false, false), content);
            assert_eq!(literal, regex, "content: {:?}", content);
        }
    }

    #[test]
    fn test_whole_word_escapes_metacharacters() {
        let m = matcher("c.t", SearchMethod::Literal, false, false);
        assert_eq!(count(&m, "cat c.t cot"), 1);
    }

    #[test]
    fn test_case_insensitive_equals_lowercased_input() {
        let content = "Cat CAT cat bAT";
        for (method, partial) in [
            (SearchMethod::Literal, true),
            (SearchMethod::Literal, false),
            (SearchMethod::Regex, false),
            (SearchMethod::Indexed, false),
        ] {
            let insensitive = count(&matcher("CaT", method, partial, true), content);
            let lowered = count(
                &matcher("cat", method, partial, false),
                &content.to_lowercase(),
            );
            assert_eq!(insensitive, lowered, "method: {:?}", method);
            assert_eq!(insensitive, 3);
        }
    }

    #[test]
    fn test_regex_case_folding_keeps_pattern_classes() {
        // \D must stay \D even when the search is case-insensitive
        let m = matcher(r"\D\d", SearchMethod::Regex, false, true);
        assert_eq!(count(&m, "A1b2"), 2);
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let config = SearchConfig::new("(unclosed", SearchMethod::Regex, ".");
        let err = PatternMatcher::new(&config).unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern(_)));
    }

    #[test]
    fn test_empty_term_is_rejected() {
        let config = SearchConfig::new("", SearchMethod::Literal, ".");
        assert!(matches!(
            PatternMatcher::new(&config),
            Err(SearchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_pattern_caching() {
        // Unique pattern so other tests cannot have compiled it already
        let unique = format!(
            "cache_probe_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        let config = SearchConfig::new(unique.clone(), SearchMethod::Regex, ".");
        let metrics = SearchMetrics::new();

        let _first = PatternMatcher::with_metrics(&config, metrics.clone()).unwrap();
        assert_eq!(metrics.cache_hits(), 0, "First creation should have no cache hits");
        assert_eq!(metrics.cache_misses(), 1, "First creation should have one cache miss");

        let _second = PatternMatcher::with_metrics(&config, metrics.clone()).unwrap();
        assert_eq!(metrics.cache_hits(), 1, "Second creation should hit the cache");
        assert_eq!(metrics.cache_misses(), 1);

        // Same pattern, different case mode is a separate entry
        let mut folded = config.clone();
        folded.case_insensitive = true;
        let _third = PatternMatcher::with_metrics(&folded, metrics.clone()).unwrap();
        assert_eq!(metrics.cache_hits(), 1);
        assert_eq!(metrics.cache_misses(), 2);
    }

    #[test]
    fn test_indexed_count_shares_colliding_slots() {
        let m = matcher("BB", SearchMethod::Indexed, false, false);
        assert_eq!(count(&m, "Aa Aa BB"), 3);
        assert_eq!(count(&m, "cat BB cats"), 1);
        assert_eq!(count(&m, ""), 0);
    }

    #[test]
    fn test_indexed_count_in_agrees_with_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SearchConfig::new("CAT", SearchMethod::Indexed, dir.path());
        config.case_insensitive = true;
        let m = PatternMatcher::new(&config).unwrap();
        let content = "Cat cat\nCAT Aa BB dog";

        let mut workspace = IndexWorkspace::open(
            &dir.path().join("index_files"),
            std::num::NonZeroUsize::new(2).unwrap(),
            SearchMetrics::new(),
        )
        .unwrap();
        workspace.build("a.txt", content, m.normalizer()).unwrap();

        assert_eq!(count(&m, content), 3);
        assert_eq!(m.count_indexed(&workspace, "a.txt"), count(&m, content));
    }
}
