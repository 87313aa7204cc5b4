//! Error types produced while searching archives

use std::fmt;
use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Archive formats that yield named entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Tar,
    Zip,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Tar => f.write_str("tar"),
            ContainerKind::Zip => f.write_str("zip"),
        }
    }
}

/// Broad failure class of a [`SearchError`].
///
/// Each class isolates a different amount of work: a root, a node's subtree,
/// the unvisited entries of one container, or a single zip node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PathOpen,
    Decode,
    Container,
    ZipSizeExceeded,
}

/// A pattern that cannot be compiled for searching.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error(transparent)]
    Syntax(#[from] regex_syntax::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Nfa(#[from] regex_automata::nfa::thompson::BuildError),

    #[error(transparent)]
    Dfa(#[from] regex_automata::hybrid::BuildError),
}

/// Failure attached to a single node of the search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// A root input could not be opened or is not searchable.
    #[error("cannot open: {0}")]
    PathOpen(#[source] io::Error),

    /// The compressed stream is corrupt or the decoder could not be started.
    #[error("{format} decode failed: {source}")]
    Decode {
        format: &'static str,
        #[source]
        source: io::Error,
    },

    /// An external decoder process exited unsuccessfully.
    #[error("{program} exited with {status}")]
    DecoderExit {
        program: String,
        status: ExitStatus,
    },

    /// The archive structure is malformed or an entry is truncated.
    #[error("malformed {kind} archive: {source}")]
    Container {
        kind: ContainerKind,
        #[source]
        source: io::Error,
    },

    /// A zip read from a non-seekable stream is larger than the buffer limit.
    #[error("zip file larger than limit of {limit} bytes")]
    ZipSizeExceeded { limit: u64 },
}

impl SearchError {
    pub fn decode(format: &'static str, source: io::Error) -> Self {
        SearchError::Decode { format, source }
    }

    pub fn container(kind: ContainerKind, source: io::Error) -> Self {
        SearchError::Container { kind, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::PathOpen(_) => ErrorKind::PathOpen,
            SearchError::Decode { .. } | SearchError::DecoderExit { .. } => ErrorKind::Decode,
            SearchError::Container { .. } => ErrorKind::Container,
            SearchError::ZipSizeExceeded { .. } => ErrorKind::ZipSizeExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_decoder_exit_with_decode() {
        let err = SearchError::decode("gzip", io::Error::other("bad header"));
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = SearchError::ZipSizeExceeded { limit: 10 };
        assert_eq!(err.kind(), ErrorKind::ZipSizeExceeded);

        let err = SearchError::container(ContainerKind::Tar, io::Error::other("checksum"));
        assert_eq!(err.kind(), ErrorKind::Container);
    }

    #[test]
    fn test_display_messages() {
        let err = SearchError::container(ContainerKind::Zip, io::Error::other("bad directory"));
        assert_eq!(err.to_string(), "malformed zip archive: bad directory");

        let err = SearchError::ZipSizeExceeded { limit: 1024 };
        assert_eq!(err.to_string(), "zip file larger than limit of 1024 bytes");

        let err = SearchError::PathOpen(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(err.to_string(), "cannot open: missing");
    }
}
