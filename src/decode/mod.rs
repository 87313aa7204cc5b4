//! Streaming decoders
//!
//! Every decoder turns an [`Input`] into a [`DecodedStream`] without
//! buffering the whole content:
//!
//! - `identity` passes the input through, keeping a seekable file seekable
//! - `gzip`, `bzip2` and `zstd` decode in-process
//! - `xz` pipes the input through an external `xz -d` process
//!
//! A decoded stream must be released with [`DecodedStream::close`], which
//! waits for an external decoder and reports an unsuccessful exit.

mod command;

use std::fs::File;
use std::io::{self, Cursor, Read};

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;

use crate::error::SearchError;

pub use command::{CommandDecoder, CommandReader};

/// Byte stream of a node before decoding.
pub enum Input<'a> {
    /// A regular file opened from disk. Containers that need random
    /// access read it in place.
    File(&'a File),
    /// Any forward-only stream: standard input, pipes, archive entries.
    Stream(Box<dyn Read + 'a>),
}

impl<'a> Input<'a> {
    pub fn into_reader(self) -> Box<dyn Read + 'a> {
        match self {
            Input::File(file) => Box::new(file),
            Input::Stream(reader) => reader,
        }
    }
}

/// Decompression applied to a node, chosen by [`crate::Format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderKind {
    Identity,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

impl DecoderKind {
    pub fn name(self) -> &'static str {
        match self {
            DecoderKind::Identity => "identity",
            DecoderKind::Gzip => "gzip",
            DecoderKind::Bzip2 => "bzip2",
            DecoderKind::Xz => "xz",
            DecoderKind::Zstd => "zstd",
        }
    }

    /// Start decoding `input`.
    ///
    /// Compressed formats are checked for their magic number up front, so a
    /// corrupt or mislabelled stream fails here rather than mid-read.
    pub fn open<'a>(self, input: Input<'a>) -> Result<DecodedStream<'a>, SearchError> {
        match self {
            DecoderKind::Identity => Ok(DecodedStream::passthrough(input)),
            DecoderKind::Gzip => {
                let reader = sniff(input.into_reader(), self.name(), GZIP_MAGIC.len(), |head| {
                    head == GZIP_MAGIC
                })?;
                Ok(DecodedStream::native(MultiGzDecoder::new(reader)))
            }
            DecoderKind::Bzip2 => {
                let reader = sniff(input.into_reader(), self.name(), BZIP2_MAGIC.len(), |head| {
                    head == BZIP2_MAGIC
                })?;
                Ok(DecodedStream::native(MultiBzDecoder::new(reader)))
            }
            DecoderKind::Zstd => {
                let reader = sniff(input.into_reader(), self.name(), ZSTD_MAGIC.len(), |head| {
                    head == ZSTD_MAGIC || is_skippable_zstd_frame(head)
                })?;
                let decoder = zstd::stream::read::Decoder::new(reader)
                    .map_err(|e| SearchError::decode(self.name(), e))?;
                Ok(DecodedStream::native(decoder))
            }
            DecoderKind::Xz => CommandDecoder::xz().open(input),
        }
    }
}

/// Skippable frames use magic numbers 0x184D2A50..=0x184D2A5F.
fn is_skippable_zstd_frame(head: &[u8]) -> bool {
    head.len() == 4 && head[0] & 0xf0 == 0x50 && head[1..] == [0x2a_u8, 0x4d, 0x18]
}

/// Read the first `len` bytes, check them, and hand back a reader that
/// replays them before the rest of the stream.
fn sniff<'a>(
    mut reader: Box<dyn Read + 'a>,
    format: &'static str,
    len: usize,
    accept: fn(&[u8]) -> bool,
) -> Result<Box<dyn Read + 'a>, SearchError> {
    let mut head = Vec::with_capacity(len);
    reader
        .by_ref()
        .take(len as u64)
        .read_to_end(&mut head)
        .map_err(|e| SearchError::decode(format, e))?;
    if head.len() < len {
        return Err(SearchError::decode(
            format,
            io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected end of stream"),
        ));
    }
    if !accept(&head) {
        return Err(SearchError::decode(
            format,
            io::Error::new(io::ErrorKind::InvalidData, "invalid header"),
        ));
    }
    Ok(Box::new(Cursor::new(head).chain(reader)))
}

enum Source<'a> {
    File(&'a File),
    Reader(Box<dyn Read + 'a>),
    Command(CommandReader<'a>),
}

/// Decompressed content of a node.
pub struct DecodedStream<'a> {
    source: Source<'a>,
}

impl<'a> DecodedStream<'a> {
    fn passthrough(input: Input<'a>) -> Self {
        let source = match input {
            Input::File(file) => Source::File(file),
            Input::Stream(reader) => Source::Reader(reader),
        };
        Self { source }
    }

    fn native(reader: impl Read + 'a) -> Self {
        Self {
            source: Source::Reader(Box::new(reader)),
        }
    }

    pub(crate) fn command(reader: CommandReader<'a>) -> Self {
        Self {
            source: Source::Command(reader),
        }
    }

    /// The underlying file when the stream was not transformed and can be
    /// read with random access.
    pub fn seekable_file(&self) -> Option<&'a File> {
        match self.source {
            Source::File(file) => Some(file),
            _ => None,
        }
    }

    /// Release the stream. For external decoders this blocks until the
    /// process exits and reports a non-zero exit status.
    pub fn close(self) -> Result<(), SearchError> {
        match self.source {
            Source::Command(reader) => reader.finish(),
            Source::File(_) | Source::Reader(_) => Ok(()),
        }
    }
}

impl Read for DecodedStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::File(file) => file.read(buf),
            Source::Reader(reader) => reader.read(buf),
            Source::Command(reader) => reader.read(buf),
        }
    }
}
