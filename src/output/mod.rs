//! Rendering of search events
//!
//! - `text` - `grep`-style lines, matches on stdout and errors on stderr
//! - `json` - one JSON object per event

mod json;
mod text;

use std::io;

use crate::search::SearchEvent;

pub use json::JsonOutput;
pub use text::TextOutput;

/// Writes events as they arrive from a search.
pub trait EventOutput {
    fn write_event(&mut self, event: &SearchEvent) -> io::Result<()>;

    /// Flush anything still buffered.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}
