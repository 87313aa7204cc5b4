//! ztgrep - search file names and contents inside nested compressed archives

pub mod config;
pub mod decode;
pub mod error;
pub mod extract;
pub mod format;
pub mod output;
pub mod path_chain;
pub mod pattern;
pub mod search;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{DEFAULT_MAX_ZIP_SIZE, SearchConfig, parse_size};
pub use error::{ContainerKind, ErrorKind, PatternError, SearchError};
pub use format::Format;
pub use output::{EventOutput, JsonOutput, TextOutput};
pub use path_chain::PathChain;
pub use pattern::SearchPattern;
pub use search::{EventSink, Limiter, SearchEvent, Searcher};
