//! Container extractors
//!
//! Extractors walk a decoded stream and hand every entry to a visitor as a
//! `(name, stream)` pair, in the container's native order:
//!
//! - `tar` is forward-only; an entry's stream is only valid until the
//!   visitor returns
//! - `zip` needs random access to its trailing directory; a seekable file is
//!   read in place, anything else is buffered up to a size limit

mod tar_reader;
mod zip_reader;

use crate::decode::{DecodedStream, Input};
use crate::error::{ContainerKind, SearchError};

/// Receives each entry of a container. The entry stream must be consumed
/// or abandoned before returning; an error ends the walk.
pub type EntryVisitor<'v> = dyn FnMut(&str, Input<'_>) -> Result<(), SearchError> + 'v;

/// Visit every entry of `stream`, stopping at the first structural error or
/// the first error returned by `visit`.
///
/// Entries visited before an error are unaffected by it.
pub fn for_each_entry(
    kind: ContainerKind,
    stream: &mut DecodedStream<'_>,
    max_zip_size: u64,
    visit: &mut EntryVisitor<'_>,
) -> Result<(), SearchError> {
    match kind {
        ContainerKind::Tar => tar_reader::for_each_entry(stream, visit),
        ContainerKind::Zip => zip_reader::for_each_entry(stream, max_zip_size, visit),
    }
}
