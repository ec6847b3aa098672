use clap::Parser;
use colored::Colorize;
use docsearch::{
    search, EncodingMode, SearchConfig, SearchError, SearchMethod, SearchOutcome,
};
use std::io::{self, BufRead, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Count a search term across the files of a directory",
    long_about = None
)]
struct Cli {
    /// Term to count (prompted for when missing)
    #[arg(short, long)]
    term: Option<String>,

    /// Search method: "String Match", "Regular Expression" or "Indexed" (1, 2, 3)
    #[arg(short, long, value_parser = parse_method)]
    method: Option<SearchMethod>,

    /// Ignore case when matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// String Match only: count substrings instead of whole words
    #[arg(short, long)]
    partial: bool,

    /// Directory to search (default: ./sample_files)
    #[arg(short = 'd', long = "path")]
    path: Option<PathBuf>,

    /// Legacy `path <dir>` arguments (deprecated)
    #[arg(hide = true)]
    legacy_args: Vec<String>,

    /// Scratch directory for index files (default: ./index_files)
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Number of threads used to build indexes
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long, default_value = "failfast")]
    encoding: String,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Show a progress bar while files are processed
    #[arg(long)]
    progress: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Fail instead of prompting for missing values
    #[arg(long)]
    no_prompt: bool,
}

fn parse_method(value: &str) -> std::result::Result<SearchMethod, String> {
    value.parse().map_err(|e: SearchError| e.to_string())
}

/// Picks the directory out of legacy `path <dir>` arguments. Anything
/// other than nothing or exactly that pair is rejected.
fn legacy_path(args: &[String]) -> Result<Option<PathBuf>> {
    match args {
        [] => Ok(None),
        [keyword, dir] if keyword.eq_ignore_ascii_case("path") && !dir.trim().is_empty() => {
            Ok(Some(PathBuf::from(dir)))
        }
        _ => Err(SearchError::config_error(format!(
            "Unexpected arguments: {} (use -t <term> and -d <dir>)",
            args.join(" ")
        ))),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let file_config = SearchConfig::load_from(cli.config.as_deref())
        .map_err(|e| SearchError::config_error(format!("Failed to load config: {}", e)))?;

    let legacy_root = legacy_path(&cli.legacy_args)?;
    let cli_config = SearchConfig {
        term: cli.term.as_deref().map(str::trim).unwrap_or_default().to_string(),
        method: cli.method.unwrap_or_default(),
        case_insensitive: cli.ignore_case,
        partial_match: cli.partial,
        root_path: cli
            .path
            .clone()
            .or(legacy_root)
            .unwrap_or_else(|| SearchConfig::default().root_path),
        index_dir: cli
            .index_dir
            .clone()
            .unwrap_or_else(|| SearchConfig::default().index_dir),
        thread_count: cli.threads.unwrap_or(file_config.thread_count),
        log_level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| SearchConfig::default().log_level),
        encoding_mode: cli.encoding.parse::<EncodingMode>()?,
        show_progress: cli.progress,
    };

    let mut config = file_config.merge_with_cli(cli_config);
    if let Some(method) = cli.method {
        config.method = method;
    }
    init_logging(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    if config.term.is_empty() {
        if cli.no_prompt {
            return Err(SearchError::config_error("No search term provided"));
        }
        let questions = Questions::unanswered(&config, cli.method.is_some());
        let stdin = io::stdin();
        let stdout = io::stdout();
        prompt_user(&mut stdin.lock(), &mut stdout.lock(), &mut config, questions)?;
    }

    let outcome = search(&config)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&outcome.report(&config.term))
            .map_err(io::Error::from)?;
        println!("{}", json);
    } else {
        print_search_results(&config, &outcome);
    }
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Which values still need asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Questions {
    method: bool,
    partial: bool,
    case: bool,
}

impl Questions {
    /// Options already enabled by a flag or the config file are not asked
    /// again, so an answer can never switch them back off.
    fn unanswered(config: &SearchConfig, method_given: bool) -> Self {
        Self {
            method: !method_given,
            partial: !config.partial_match,
            case: !config.case_insensitive,
        }
    }
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn ask_yes_no<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
    write!(output, "{} (yes / no): ", question)?;
    output.flush()?;
    Ok(read_answer(input)?.is_some_and(|answer| answer.eq_ignore_ascii_case("yes")))
}

/// Asks for the term and whichever options the command line left open.
fn prompt_user<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    config: &mut SearchConfig,
    questions: Questions,
) -> Result<()> {
    writeln!(output, "--- Welcome to the Document Search Tool ---")?;
    writeln!(output, "\nPlease enter your desired Search Term.")?;
    write!(output, "Desired Search Term: ")?;
    output.flush()?;
    config.term = read_answer(input)?.unwrap_or_default();
    if config.term.is_empty() {
        return Err(SearchError::config_error("No search term provided"));
    }

    if questions.method {
        writeln!(output, "\nPlease select one of the provided Document Search Methods:\n")?;
        for (i, method) in SearchMethod::ALL.iter().enumerate() {
            writeln!(output, "\t{}.) {}", i + 1, method)?;
        }
        write!(output, "\nDesired Document Search Method: ")?;
        output.flush()?;

        config.method = loop {
            let answer = read_answer(input)?
                .ok_or_else(|| SearchError::config_error("No search method provided"))?;
            match answer.parse::<SearchMethod>() {
                Ok(method) => break method,
                Err(_) => {
                    writeln!(
                        output,
                        "\nIt appears you have not entered a valid Document Search Method, please do so now."
                    )?;
                    write!(output, "Desired Document Search Method: ")?;
                    output.flush()?;
                }
            }
        };
    }

    if questions.partial && config.method == SearchMethod::Literal {
        writeln!(
            output,
            "By default, the Document Search will only return Exact Matches, would you like to disable Exact Matching?"
        )?;
        config.partial_match = ask_yes_no(input, output, "Disable Exact Matching")?;
        writeln!(output)?;
    }

    if questions.case {
        writeln!(
            output,
            "By default, the Document Search will be Case-Sensitive, would you like to disable Case-Sensitivity?"
        )?;
        config.case_insensitive = ask_yes_no(input, output, "Disable Case-Sensitive Searching")?;
    }

    Ok(())
}

fn print_search_results(config: &SearchConfig, outcome: &SearchOutcome) {
    let term = if config.case_insensitive {
        config.term.to_lowercase()
    } else {
        config.term.clone()
    };
    println!("\nSearch results for term: {}\n", term);

    for entry in outcome.results.ranked() {
        println!(
            "\t{} - {} matches",
            entry.name.blue(),
            entry.count.to_string().green()
        );
    }

    println!("\nTotal Search Time: {}", outcome.search_millis());
    println!("Total Elapsed Time: {}", outcome.total_millis());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ALL_QUESTIONS: Questions = Questions {
        method: true,
        partial: true,
        case: true,
    };

    fn run_prompt(script: &str, questions: Questions) -> (Result<()>, SearchConfig, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        let mut config = SearchConfig::default();
        let result = prompt_user(&mut input, &mut output, &mut config, questions);
        (result, config, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_prompt_literal_flow() {
        let (result, config, output) = run_prompt("cat\nString Match\nyes\nno\n", ALL_QUESTIONS);
        result.unwrap();
        assert_eq!(config.term, "cat");
        assert_eq!(config.method, SearchMethod::Literal);
        assert!(config.partial_match);
        assert!(!config.case_insensitive);
        assert!(output.contains("Disable Exact Matching"));
    }

    #[test]
    fn test_prompt_reasks_invalid_method() {
        let (result, config, output) = run_prompt("  Cat \nfuzzy\n3\nYES\n", ALL_QUESTIONS);
        result.unwrap();
        assert_eq!(config.term, "Cat");
        assert_eq!(config.method, SearchMethod::Indexed);
        assert!(config.case_insensitive);
        assert!(!config.partial_match);
        assert!(output.contains("not entered a valid Document Search Method"));
        assert!(!output.contains("Disable Exact Matching"));
    }

    #[test]
    fn test_prompt_skips_answered_questions() {
        let questions = Questions {
            method: false,
            partial: false,
            case: false,
        };
        let (result, config, output) = run_prompt("dog\n", questions);
        result.unwrap();
        assert_eq!(config.term, "dog");
        assert!(!output.contains("Search Methods"));
    }

    #[test]
    fn test_prompt_eof_fails() {
        let (result, _, _) = run_prompt("", ALL_QUESTIONS);
        assert!(matches!(result, Err(SearchError::ConfigError(_))));

        let (result, _, _) = run_prompt("cat\n", ALL_QUESTIONS);
        assert!(matches!(result, Err(SearchError::ConfigError(_))));
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_legacy_path() {
        assert_eq!(
            legacy_path(&args(&["path", "./docs"])).unwrap(),
            Some(PathBuf::from("./docs"))
        );
        assert_eq!(
            legacy_path(&args(&["PATH", "docs"])).unwrap(),
            Some(PathBuf::from("docs"))
        );
        assert_eq!(legacy_path(&[]).unwrap(), None);
    }

    #[test]
    fn test_legacy_path_rejects_stray_arguments() {
        for stray in [
            &["cat"][..],
            &["path"][..],
            &["path", "  "][..],
            &["path", "docs", "extra"][..],
            &["dir", "docs"][..],
        ] {
            let err = legacy_path(&args(stray)).unwrap_err();
            assert!(matches!(err, SearchError::ConfigError(_)), "args: {:?}", stray);
        }
    }

    #[test]
    fn test_config_file_options_are_not_asked_again() {
        let mut config = SearchConfig {
            case_insensitive: true,
            partial_match: true,
            ..SearchConfig::default()
        };

        let questions = Questions::unanswered(&config, false);
        assert_eq!(
            questions,
            Questions {
                method: true,
                partial: false,
                case: false,
            }
        );

        // Only the term and method are read; the options stay enabled
        let mut input = Cursor::new(b"cat\nString Match\n".to_vec());
        let mut output = Vec::new();
        prompt_user(&mut input, &mut output, &mut config, questions).unwrap();
        assert!(config.case_insensitive);
        assert!(config.partial_match);

        assert_eq!(
            Questions::unanswered(&SearchConfig::default(), true),
            Questions {
                method: false,
                partial: true,
                case: true,
            }
        );
    }
}
