//! Depth-first traversal of one root

use std::cell::Cell;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::config::SearchConfig;
use crate::decode::{DecodedStream, DecoderKind, Input};
use crate::error::{ContainerKind, SearchError};
use crate::extract;
use crate::format::Format;
use crate::path_chain::{PathChain, STDIN_ROOT};
use crate::pattern::SearchPattern;

use super::{EventSink, SearchEvent};

#[derive(Debug)]
pub(super) struct Traversal {
    pattern: SearchPattern,
    config: SearchConfig,
}

impl Traversal {
    pub(super) fn new(pattern: SearchPattern, config: SearchConfig) -> Self {
        Self { pattern, config }
    }

    pub(super) fn pattern(&self) -> &SearchPattern {
        &self.pattern
    }

    pub(super) fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Open `root` and search it. A root that cannot be opened produces a
    /// single error event and nothing else.
    pub(super) fn search_root(&self, root: &str, sink: &mut dyn EventSink) {
        let path = PathChain::root(root);
        log::debug!("searching {}", root);

        if root == STDIN_ROOT {
            self.search_node(Input::Stream(Box::new(io::stdin().lock())), &path, sink);
            return;
        }

        let (file, regular) = match open_root(Path::new(root)) {
            Ok(opened) => opened,
            Err(err) => {
                sink.emit(SearchEvent::Error {
                    path,
                    error: SearchError::PathOpen(err),
                });
                return;
            }
        };
        let input = if regular {
            Input::File(&file)
        } else {
            Input::Stream(Box::new(&file))
        };
        self.search_node(input, &path, sink);
    }

    /// Search a node and report its own failure, if any, on its path.
    pub(super) fn search_node(
        &self,
        input: Input<'_>,
        path: &PathChain,
        sink: &mut dyn EventSink,
    ) {
        if let Err(error) = self.find(input, path, sink) {
            log::trace!("{}: {}", path, error);
            sink.emit(SearchEvent::Error {
                path: path.clone(),
                error,
            });
        }
    }

    /// Search one node and, for containers, everything below it.
    ///
    /// Failures below the node are reported as they happen. The node's own
    /// failure is returned unreported so the caller can attribute it.
    fn find(
        &self,
        input: Input<'_>,
        path: &PathChain,
        sink: &mut dyn EventSink,
    ) -> Result<(), SearchError> {
        let format = Format::for_name(path.last());
        if format.container.is_none() && self.config.skip_body {
            return Ok(());
        }

        let mut stream = format.decoder.open(input)?;
        let outcome = match format.container {
            Some(kind) => self.walk_container(kind, &mut stream, path, sink),
            None => self.scan_leaf(format.decoder, &mut stream, path, sink),
        };
        // A node that already failed is not reported twice.
        outcome.and(stream.close())
    }

    fn scan_leaf(
        &self,
        decoder: DecoderKind,
        stream: &mut DecodedStream<'_>,
        path: &PathChain,
        sink: &mut dyn EventSink,
    ) -> Result<(), SearchError> {
        let found = self
            .pattern
            .scan(&mut *stream)
            .map_err(|e| SearchError::decode(decoder.name(), e))?;
        if found {
            sink.emit(SearchEvent::Match(path.clone()));
        }
        Ok(())
    }

    /// Walk the entries of a container.
    ///
    /// An entry whose own bytes cannot be read (a truncated or corrupt
    /// member) ends the container with a single container error; whatever
    /// the child made of the short read is dropped.
    fn walk_container(
        &self,
        kind: ContainerKind,
        stream: &mut DecodedStream<'_>,
        path: &PathChain,
        sink: &mut dyn EventSink,
    ) -> Result<(), SearchError> {
        extract::for_each_entry(kind, stream, self.config.max_zip_size, &mut |name, entry| {
            let child = path.child(name);
            if !self.config.skip_name && self.pattern.matches_name(name) {
                sink.emit(SearchEvent::Match(child.clone()));
            }

            let fault = Cell::new(None);
            let entry = EntryReader {
                inner: entry.into_reader(),
                fault: &fault,
            };
            let outcome = self.find(Input::Stream(Box::new(entry)), &child, &mut *sink);
            if let Some(err) = fault.take() {
                log::trace!("{}: entry unreadable: {}", child, err);
                return Err(SearchError::container(kind, err));
            }
            if let Err(error) = outcome {
                log::trace!("{}: {}", child, error);
                sink.emit(SearchEvent::Error { path: child, error });
            }
            Ok(())
        })
    }
}

/// Entry stream that remembers the first read failure of the container
/// beneath it.
struct EntryReader<'f, R> {
    inner: R,
    fault: &'f Cell<Option<io::Error>>,
}

impl<R: Read> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Err(err) if err.kind() != io::ErrorKind::Interrupted => {
                let seen = io::Error::new(err.kind(), err.to_string());
                let first = self.fault.take();
                self.fault.set(first.or(Some(err)));
                Err(seen)
            }
            other => other,
        }
    }
}

/// Open a root path, reporting whether it is a regular file.
fn open_root(path: &Path) -> io::Result<(File, bool)> {
    let file = File::open(path)?;
    let metadata = file.metadata()?;
    if metadata.is_dir() {
        return Err(io::Error::new(io::ErrorKind::IsADirectory, "is a directory"));
    }
    Ok((file, metadata.is_file()))
}
