use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{unify_path, SearchError, SearchResult};

/// Directory searched when none is given.
pub const DEFAULT_ROOT: &str = "./sample_files";

/// Scratch directory holding per-file index stores.
pub const DEFAULT_INDEX_DIR: &str = "./index_files";

/// The three interchangeable matching strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SearchMethod {
    /// Substring or whole-word counting on the file content
    #[default]
    Literal,
    /// Regular expression counting on the file content
    Regex,
    /// Hash-indexed token counting through a per-file index store
    Indexed,
}

impl SearchMethod {
    /// All methods, in menu order.
    pub const ALL: [SearchMethod; 3] = [Self::Literal, Self::Regex, Self::Indexed];

    /// Human-readable name shown in menus.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Literal => "String Match",
            Self::Regex => "Regular Expression",
            Self::Indexed => "Indexed",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SearchMethod {
    type Err = SearchError;

    /// Accepts menu names, short names and menu numbers, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "string match" | "string" | "literal" => Ok(Self::Literal),
            "2" | "regular expression" | "regex" => Ok(Self::Regex),
            "3" | "indexed" | "index" => Ok(Self::Indexed),
            other => Err(SearchError::config_error(format!(
                "The specified Search Method: {} does not exist",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SearchMethod {
    type Error = SearchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SearchMethod> for String {
    fn from(method: SearchMethod) -> Self {
        method.display_name().to_string()
    }
}

/// How invalid UTF-8 in a source file is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Abort the run on the first invalid sequence
    #[default]
    FailFast,
    /// Replace invalid sequences with U+FFFD and keep going
    Lossy,
}

impl FromStr for EncodingMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "failfast" => Ok(Self::FailFast),
            "lossy" => Ok(Self::Lossy),
            other => Err(SearchError::config_error(format!(
                "Unknown encoding mode: {}",
                other
            ))),
        }
    }
}

/// Configuration for one search run.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations, later ones
/// overriding earlier ones:
/// 1. Global `$CONFIG_DIR/docsearch/config.yaml`
/// 2. Local `.docsearch.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// # Configuration Format
///
/// ```yaml
/// # Term to count
/// term: "cat"
///
/// # String Match | Regular Expression | Indexed
/// method: "Indexed"
///
/// # Lowercase content and term before matching
/// case_insensitive: true
///
/// # String Match only: count substrings instead of whole words
/// partial_match: false
///
/// # Directory whose files are searched
/// root_path: "./sample_files"
///
/// # Scratch directory for index stores
/// index_dir: "./index_files"
///
/// # Worker threads used while building an index
/// thread_count: 4
///
/// log_level: "info"
/// ```
///
/// Command-line arguments take precedence over file values; see
/// [`SearchConfig::merge_with_cli`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The term to count
    #[serde(default)]
    pub term: String,

    /// Which strategy counts the term
    #[serde(default)]
    pub method: SearchMethod,

    /// Lowercase both the content and the term before matching
    #[serde(default)]
    pub case_insensitive: bool,

    /// Literal method only: count every substring occurrence rather than
    /// whole words
    #[serde(default)]
    pub partial_match: bool,

    /// Directory whose files are searched (not recursive)
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Scratch directory holding the per-file index stores
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Number of threads used while building an index.
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How invalid UTF-8 is handled
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Draw a progress bar while files are processed
    #[serde(default)]
    pub show_progress: bool,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

fn default_index_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INDEX_DIR)
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            term: String::new(),
            method: SearchMethod::default(),
            case_insensitive: false,
            partial_match: false,
            root_path: default_root_path(),
            index_dir: default_index_dir(),
            thread_count: default_thread_count(),
            log_level: default_log_level(),
            encoding_mode: EncodingMode::default(),
            show_progress: false,
        }
    }
}

impl SearchConfig {
    /// Creates a configuration for `term` over `root_path` with defaults
    /// for everything else.
    pub fn new(term: impl Into<String>, method: SearchMethod, root_path: impl Into<PathBuf>) -> Self {
        Self {
            term: term.into(),
            method,
            root_path: root_path.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("docsearch/config.yaml")),
            Some(PathBuf::from(".docsearch.yaml")),
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            } else if Some(path.as_path()) == config_path {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        if !cli_config.term.is_empty() {
            self.term = cli_config.term;
        }
        if cli_config.method != SearchMethod::default() {
            self.method = cli_config.method;
        }
        if cli_config.case_insensitive {
            self.case_insensitive = true;
        }
        if cli_config.partial_match {
            self.partial_match = true;
        }
        if cli_config.root_path != default_root_path() {
            self.root_path = cli_config.root_path;
        }
        if cli_config.index_dir != default_index_dir() {
            self.index_dir = cli_config.index_dir;
        }
        // Always use CLI thread count if specified
        self.thread_count = cli_config.thread_count;
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        if cli_config.encoding_mode != EncodingMode::default() {
            self.encoding_mode = cli_config.encoding_mode;
        }
        if cli_config.show_progress {
            self.show_progress = true;
        }
        self
    }

    /// Checks the configuration before any file is touched.
    pub fn validate(&self) -> SearchResult<()> {
        if self.term.trim().is_empty() {
            return Err(SearchError::config_error("The search term must not be empty"));
        }
        if !self.root_path.is_dir() {
            return Err(SearchError::config_error(format!(
                "The specified directory: {} does not exist",
                self.root_path.display()
            )));
        }
        // Indexing replaces and deletes `index_*` files in the index directory.
        if self.method == SearchMethod::Indexed
            && unify_path(&self.index_dir) == unify_path(&self.root_path)
        {
            return Err(SearchError::config_error(format!(
                "The index directory must differ from the searched directory: {}",
                self.index_dir.display()
            )));
        }
        Ok(())
    }

    /// Partial matching only applies to the literal method.
    pub fn effective_partial_match(&self) -> bool {
        self.method == SearchMethod::Literal && self.partial_match
    }
}
