//! Forward-only tar extraction

use std::io::{self, Read};

use tar::Archive;

use crate::decode::Input;
use crate::error::{ContainerKind, SearchError};

use super::EntryVisitor;

fn malformed(err: io::Error) -> SearchError {
    SearchError::container(ContainerKind::Tar, err)
}

/// Visit tar entries in stream order. Every entry kind is yielded
/// (directories and links have empty content); names come from the raw
/// header path, including GNU long names and PAX paths.
pub(super) fn for_each_entry<R: Read>(
    reader: R,
    visit: &mut EntryVisitor<'_>,
) -> Result<(), SearchError> {
    let mut archive = Archive::new(reader);
    for entry in archive.entries().map_err(malformed)? {
        let entry = entry.map_err(malformed)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        log::trace!("tar entry {}", name);
        let remaining = entry.size();
        visit(&name, Input::Stream(Box::new(Complete { entry, remaining })))?;
    }
    Ok(())
}

/// Entry content that fails, rather than ending early, when the archive is
/// cut short inside it.
struct Complete<R> {
    entry: R,
    remaining: u64,
}

impl<R: Read> Read for Complete<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.entry.read(buf)?;
        if n == 0 && self.remaining > 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("entry truncated with {} bytes missing", self.remaining),
            ));
        }
        self.remaining = self.remaining.saturating_sub(n as u64);
        Ok(n)
    }
}
