pub mod config;
pub mod errors;
pub mod index;
pub mod metrics;
pub mod results;
pub mod search;
pub mod tokenizer;

pub use config::{EncodingMode, SearchConfig, SearchMethod};
pub use errors::{SearchError, SearchResult};
pub use results::{FileCount, ResultMap, SearchOutcome, SearchReport};
pub use search::search;
