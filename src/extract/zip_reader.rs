//! Random-access zip extraction

use std::io::{self, Cursor, Read, Seek};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::decode::{DecodedStream, Input};
use crate::error::{ContainerKind, SearchError};

use super::EntryVisitor;

fn malformed(err: ZipError) -> SearchError {
    SearchError::container(ContainerKind::Zip, io::Error::from(err))
}

pub(super) fn for_each_entry(
    stream: &mut DecodedStream<'_>,
    max_zip_size: u64,
    visit: &mut EntryVisitor<'_>,
) -> Result<(), SearchError> {
    match stream.seekable_file() {
        Some(file) => walk(file, visit),
        None => {
            let data = buffer_limited(stream, max_zip_size)?;
            log::trace!("buffered {} byte zip", data.len());
            walk(Cursor::new(data), visit)
        }
    }
}

/// Read the whole stream into memory, refusing anything over `limit` bytes.
fn buffer_limited<R: Read>(mut reader: R, limit: u64) -> Result<Vec<u8>, SearchError> {
    let mut data = Vec::new();
    reader
        .by_ref()
        .take(limit.saturating_add(1))
        .read_to_end(&mut data)
        .map_err(|e| SearchError::container(ContainerKind::Zip, e))?;
    if data.len() as u64 > limit {
        return Err(SearchError::ZipSizeExceeded { limit });
    }
    Ok(data)
}

/// Visit entries in central-directory order. Each entry is opened only when
/// its turn comes.
fn walk<R: Read + Seek>(reader: R, visit: &mut EntryVisitor<'_>) -> Result<(), SearchError> {
    let mut archive = ZipArchive::new(reader).map_err(malformed)?;
    for index in 0..archive.len() {
        let file = archive.by_index(index).map_err(malformed)?;
        let name = file.name().to_string();
        log::trace!("zip entry {}", name);
        visit(&name, Input::Stream(Box::new(file)))?;
    }
    Ok(())
}
