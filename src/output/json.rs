//! JSON lines output

use std::io::{self, Write};

use serde::Serialize;

use crate::path_chain::PathChain;
use crate::search::SearchEvent;

use super::EventOutput;

#[derive(Serialize)]
struct JsonEvent<'a> {
    path: &'a PathChain,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Prints each event as a single-line JSON object:
/// `{"path":["a.tar","b"]}` or `{"path":["a.tar"],"error":"..."}`.
pub struct JsonOutput<W> {
    writer: W,
}

impl<W: Write> JsonOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventOutput for JsonOutput<W> {
    fn write_event(&mut self, event: &SearchEvent) -> io::Result<()> {
        let record = JsonEvent {
            path: event.path(),
            error: event.error().map(ToString::to_string),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        writeln!(self.writer)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
