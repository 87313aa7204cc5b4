//! Decoding through an external process

use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::error::SearchError;

use super::{DecodedStream, Input};

const CHUNK_SIZE: usize = 32 * 1024;

/// A decoder that runs `program args...` with the node's bytes on stdin
/// and reads the decoded bytes from its stdout.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    format: &'static str,
    program: String,
    args: Vec<String>,
}

impl CommandDecoder {
    pub fn new<I, S>(format: &'static str, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            format,
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `xz -d -T0`
    pub fn xz() -> Self {
        Self::new("xz", "xz", ["-d", "-T0"])
    }

    pub fn open<'a>(&self, input: Input<'a>) -> Result<DecodedStream<'a>, SearchError> {
        self.spawn(input.into_reader()).map(DecodedStream::command)
    }

    /// Start the process. A missing executable is a decode error.
    pub fn spawn<'a>(&self, input: Box<dyn Read + 'a>) -> Result<CommandReader<'a>, SearchError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SearchError::decode(self.format, e))?;
        log::trace!("spawned {} (pid {})", self.program, child.id());

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let (sender, receiver) = crossbeam_channel::unbounded();
        let pump = match stdout {
            Some(stdout) => thread::Builder::new()
                .name(format!("{}-output", self.program))
                .spawn(move || pump_output(stdout, sender)),
            None => Err(io::Error::other("decoder stdout was not captured")),
        };
        let pump = match pump {
            Ok(handle) => handle,
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SearchError::decode(self.format, err));
            }
        };

        Ok(CommandReader {
            format: self.format,
            program: self.program.clone(),
            child,
            input,
            stdin,
            output: Some(receiver),
            pending: Vec::new(),
            offset: 0,
            pump: Some(pump),
            reaped: false,
        })
    }
}

/// Copy the decoder's stdout into `chunks` until EOF.
///
/// Once the receiving side is gone the rest of the output is discarded, so
/// the process can never block on a full pipe.
fn pump_output(mut stdout: ChildStdout, chunks: Sender<io::Result<Vec<u8>>>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match stdout.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                if chunks.send(Ok(buf[..n].to_vec())).is_err() {
                    let _ = io::copy(&mut stdout, &mut io::sink());
                    return;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let _ = chunks.send(Err(err));
                return;
            }
        }
    }
}

/// Decoded output of a running decoder process.
///
/// Input is fed to the process only while no decoded output is waiting, so
/// at most a pipe's worth of input is in flight ahead of the reader.
pub struct CommandReader<'a> {
    format: &'static str,
    program: String,
    child: Child,
    input: Box<dyn Read + 'a>,
    stdin: Option<ChildStdin>,
    output: Option<Receiver<io::Result<Vec<u8>>>>,
    pending: Vec<u8>,
    offset: usize,
    pump: Option<JoinHandle<()>>,
    reaped: bool,
}

impl CommandReader<'_> {
    /// Push one chunk of input to the process, closing its stdin at EOF.
    fn feed(&mut self) -> io::Result<()> {
        let mut buf = [0u8; CHUNK_SIZE];
        let n = loop {
            match self.input.read(&mut buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        };
        if n == 0 {
            self.stdin = None;
            return Ok(());
        }
        if let Some(stdin) = self.stdin.as_mut() {
            if let Err(err) = stdin.write_all(&buf[..n]) {
                if err.kind() != io::ErrorKind::BrokenPipe {
                    return Err(err);
                }
                // The process stopped reading; its exit status says why.
                self.stdin = None;
            }
        }
        Ok(())
    }

    /// Feed the remaining input, wait for the process and check its status.
    pub fn finish(mut self) -> Result<(), SearchError> {
        self.output = None;
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(err) = io::copy(&mut self.input, &mut stdin) {
                log::trace!("{}: input not fully delivered: {}", self.program, err);
            }
        }

        let status = self.child.wait();
        self.reaped = true;
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
        let status = status.map_err(|e| SearchError::decode(self.format, e))?;
        log::trace!("{} exited with {}", self.program, status);

        if status.success() {
            Ok(())
        } else {
            Err(SearchError::DecoderExit {
                program: self.program.clone(),
                status,
            })
        }
    }
}

impl Read for CommandReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.offset < self.pending.len() {
                let n = (self.pending.len() - self.offset).min(buf.len());
                buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
                self.offset += n;
                return Ok(n);
            }

            let Some(output) = &self.output else {
                return Ok(0);
            };
            let next = if self.stdin.is_some() {
                match output.try_recv() {
                    Ok(chunk) => Some(chunk),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => return Ok(0),
                }
            } else {
                match output.recv() {
                    Ok(chunk) => Some(chunk),
                    Err(_) => return Ok(0),
                }
            };

            match next {
                Some(chunk) => {
                    self.pending = chunk?;
                    self.offset = 0;
                }
                None => self.feed()?,
            }
        }
    }
}

impl Drop for CommandReader<'_> {
    fn drop(&mut self) {
        if !self.reaped {
            self.stdin = None;
            self.output = None;
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Cursor;

    fn run(
        decoder: &CommandDecoder,
        data: Vec<u8>,
    ) -> (io::Result<Vec<u8>>, Result<(), SearchError>) {
        let mut reader = decoder
            .spawn(Box::new(Cursor::new(data)))
            .expect("spawn should succeed");
        let mut out = Vec::new();
        let read = reader.read_to_end(&mut out).map(|_| out);
        (read, reader.finish())
    }

    #[test]
    fn test_passes_output_through() {
        let cat = CommandDecoder::new("cat", "cat", Vec::<String>::new());
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let (read, finished) = run(&cat, data.clone());
        assert_eq!(read.unwrap(), data);
        assert!(finished.is_ok());
    }

    #[test]
    fn test_non_zero_exit_is_reported_on_finish() {
        let failing = CommandDecoder::new("sh", "sh", ["-c", "cat >/dev/null; exit 3"]);
        let (read, finished) = run(&failing, b"ignored".to_vec());
        assert!(read.unwrap().is_empty());
        let err = finished.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(matches!(err, SearchError::DecoderExit { .. }));
    }

    #[test]
    fn test_missing_program_fails_at_spawn() {
        let missing =
            CommandDecoder::new("none", "ztgrep-test-no-such-decoder", Vec::<String>::new());
        let result = missing.spawn(Box::new(io::empty()));
        assert_eq!(result.err().map(|e| e.kind()), Some(ErrorKind::Decode));
    }

    #[test]
    fn test_finish_after_partial_read_delivers_remaining_input() {
        let cat = CommandDecoder::new("cat", "cat", Vec::<String>::new());
        let data = vec![b'x'; 300_000];
        let mut reader = cat.spawn(Box::new(Cursor::new(data))).unwrap();
        let mut first = [0u8; 1];
        let _ = reader.read(&mut first).unwrap();
        assert!(reader.finish().is_ok());
    }
}
