//! Recursive search over root inputs
//!
//! A [`Searcher`] walks each root depth-first, decoding and extracting
//! nested archives as it goes, and reports every name or content match and
//! every per-node failure as a [`SearchEvent`]. Roots can be searched one at
//! a time into any [`EventSink`], or concurrently with [`Searcher::start`].

mod coordinator;
mod traversal;

use std::io::{self, Read};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::config::SearchConfig;
use crate::decode::Input;
use crate::error::SearchError;
use crate::path_chain::PathChain;
use crate::pattern::SearchPattern;

pub use coordinator::Limiter;
use traversal::Traversal;

/// One record of the result stream.
#[derive(Debug)]
pub enum SearchEvent {
    /// The last segment's name or content matched the pattern.
    Match(PathChain),
    /// The node at `path` could not be fully searched.
    Error { path: PathChain, error: SearchError },
}

impl SearchEvent {
    pub fn path(&self) -> &PathChain {
        match self {
            SearchEvent::Match(path) => path,
            SearchEvent::Error { path, .. } => path,
        }
    }

    pub fn error(&self) -> Option<&SearchError> {
        match self {
            SearchEvent::Match(_) => None,
            SearchEvent::Error { error, .. } => Some(error),
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, SearchEvent::Match(_))
    }
}

/// Destination for events produced by a traversal.
pub trait EventSink {
    fn emit(&mut self, event: SearchEvent);
}

impl EventSink for Vec<SearchEvent> {
    fn emit(&mut self, event: SearchEvent) {
        self.push(event);
    }
}

impl EventSink for Sender<SearchEvent> {
    fn emit(&mut self, event: SearchEvent) {
        // The consumer hung up; there is nobody left to tell.
        let _ = self.send(event);
    }
}

/// Searches root inputs for a pattern.
///
/// Cloning is cheap; the pattern and settings are shared read-only.
#[derive(Debug, Clone)]
pub struct Searcher {
    traversal: Arc<Traversal>,
}

impl Searcher {
    pub fn new(pattern: SearchPattern, config: SearchConfig) -> Self {
        Self {
            traversal: Arc::new(Traversal::new(pattern, config)),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        self.traversal.config()
    }

    pub fn pattern(&self) -> &SearchPattern {
        self.traversal.pattern()
    }

    /// Search a caller-supplied stream as if it were a root named `name`.
    ///
    /// The name drives format dispatch just like a file path would.
    pub fn search_reader<R: Read>(&self, reader: R, name: &str, sink: &mut dyn EventSink) {
        let path = PathChain::root(name);
        self.traversal.search_node(Input::Stream(Box::new(reader)), &path, sink);
    }

    /// Search one root path, `-` meaning standard input, on the calling thread.
    pub fn search_path(&self, root: &str, sink: &mut dyn EventSink) {
        self.traversal.search_root(root, sink);
    }

    /// Search every root concurrently, one worker per root, on `limiter`.
    ///
    /// Events arrive on the returned channel as workers produce them; each
    /// send waits for the consumer. The channel disconnects once every root
    /// has been searched. Events of one root keep their depth-first order,
    /// events of different roots interleave arbitrarily.
    pub fn start(
        &self,
        roots: Vec<String>,
        limiter: &Limiter,
    ) -> io::Result<Receiver<SearchEvent>> {
        coordinator::start(Arc::clone(&self.traversal), roots, limiter)
    }
}
