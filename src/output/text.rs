//! Plain text output

use std::io;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::path_chain::{PathChain, SEGMENT_SEPARATOR};
use crate::search::SearchEvent;

use super::EventOutput;

/// Prints each match as `root:entry:...` on `out` and each error as
/// `ztgrep: root:entry: message` on `err`.
pub struct TextOutput<O, E> {
    out: O,
    err: E,
}

impl TextOutput<StandardStream, StandardStream> {
    /// Write to the process's stdout and stderr.
    pub fn stdio(use_color: bool) -> Self {
        let choice = if use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self::new(StandardStream::stdout(choice), StandardStream::stderr(choice))
    }
}

impl<O: WriteColor, E: WriteColor> TextOutput<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

/// Write the segments of `path` with highlighted separators.
fn write_path<W: WriteColor>(w: &mut W, path: &PathChain) -> io::Result<()> {
    for (i, segment) in path.segments().iter().enumerate() {
        if i > 0 {
            w.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(w, "{}", SEGMENT_SEPARATOR)?;
            w.reset()?;
        }
        write!(w, "{}", segment)?;
    }
    Ok(())
}

impl<O: WriteColor, E: WriteColor> EventOutput for TextOutput<O, E> {
    fn write_event(&mut self, event: &SearchEvent) -> io::Result<()> {
        match event {
            SearchEvent::Match(path) => {
                write_path(&mut self.out, path)?;
                writeln!(self.out)
            }
            SearchEvent::Error { path, error } => {
                write!(self.err, "ztgrep: ")?;
                write_path(&mut self.err, path)?;
                write!(self.err, ": ")?;
                self.err.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                write!(self.err, "{}", error)?;
                self.err.reset()?;
                writeln!(self.err)
            }
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}
