//! Compiled search pattern shared by every worker

use std::io::{self, Read};

use regex::bytes::Regex;
use regex_automata::Input;
use regex_automata::hybrid::dfa::DFA;
use regex_automata::nfa::thompson;
use regex_syntax::hir::{Hir, HirKind, Look};

use crate::error::PatternError;

const SCAN_CHUNK: usize = 64 * 1024;

/// An immutable compiled regular expression.
///
/// Names are matched as a whole. Leaf content is matched as one haystack
/// through a lazy DFA fed a chunk at a time, so a match may span lines and
/// `^`/`$` anchor at the ends of the content while memory stays bounded.
/// Word boundaries are ASCII in both cases; a streaming DFA cannot look
/// around non-ASCII characters.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    expr: String,
    regex: Regex,
    dfa: DFA,
}

impl SearchPattern {
    pub fn new(expr: &str) -> Result<Self, PatternError> {
        let hir = regex_syntax::ParserBuilder::new()
            .utf8(false)
            .build()
            .parse(expr)?;
        let hir = ascii_word_boundaries(hir);

        let regex = Regex::new(&hir.to_string())?;
        let nfa = thompson::Compiler::new().build_from_hir(&hir)?;
        let dfa = DFA::builder().build_from_nfa(nfa)?;
        Ok(Self {
            expr: expr.to_string(),
            regex,
            dfa,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.regex.is_match(name.as_bytes())
    }

    /// Scan `reader` until the pattern matches or the stream ends.
    ///
    /// Reading stops as soon as a match is certain, or as soon as no match
    /// is possible any more; the rest of the stream is left unread. Empty
    /// content matches only if the pattern matches `""`.
    pub fn scan<R: Read>(&self, mut reader: R) -> io::Result<bool> {
        let mut cache = self.dfa.create_cache();
        let mut state = self
            .dfa
            .start_state_forward(&mut cache, &Input::new(&b""[..]))
            .map_err(io::Error::other)?;

        let mut chunk = vec![0u8; SCAN_CHUNK];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            for &byte in &chunk[..n] {
                state = self
                    .dfa
                    .next_state(&mut cache, state, byte)
                    .map_err(io::Error::other)?;
                if state.is_tagged() {
                    if state.is_match() {
                        return Ok(true);
                    }
                    if state.is_dead() {
                        return Ok(false);
                    }
                }
            }
        }

        let state = self
            .dfa
            .next_eoi_state(&mut cache, state)
            .map_err(io::Error::other)?;
        Ok(state.is_match())
    }
}

/// Rewrite Unicode word boundaries as their ASCII forms.
fn ascii_word_boundaries(hir: Hir) -> Hir {
    match hir.into_kind() {
        HirKind::Empty => Hir::empty(),
        HirKind::Literal(literal) => Hir::literal(literal.0),
        HirKind::Class(class) => Hir::class(class),
        HirKind::Look(look) => Hir::look(match look {
            Look::WordUnicode => Look::WordAscii,
            Look::WordUnicodeNegate => Look::WordAsciiNegate,
            Look::WordStartUnicode => Look::WordStartAscii,
            Look::WordEndUnicode => Look::WordEndAscii,
            Look::WordStartHalfUnicode => Look::WordStartHalfAscii,
            Look::WordEndHalfUnicode => Look::WordEndHalfAscii,
            other => other,
        }),
        HirKind::Repetition(mut rep) => {
            rep.sub = Box::new(ascii_word_boundaries(*rep.sub));
            Hir::repetition(rep)
        }
        HirKind::Capture(mut cap) => {
            cap.sub = Box::new(ascii_word_boundaries(*cap.sub));
            Hir::capture(cap)
        }
        HirKind::Concat(subs) => Hir::concat(subs.into_iter().map(ascii_word_boundaries).collect()),
        HirKind::Alternation(subs) => {
            Hir::alternation(subs.into_iter().map(ascii_word_boundaries).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};

    /// Yields its data, then fails every later read.
    struct FailAfter<'a>(&'a [u8]);

    impl Read for FailAfter<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0.is_empty() {
                return Err(io::Error::other("read past the end"));
            }
            let n = self.0.len().min(buf.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    /// Returns one byte per read.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((&byte, rest)) if !buf.is_empty() => {
                    buf[0] = byte;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    fn scan(expr: &str, content: &[u8]) -> bool {
        SearchPattern::new(expr)
            .unwrap()
            .scan(Cursor::new(content))
            .unwrap()
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(SearchPattern::new("(unclosed").is_err());
    }

    #[test]
    fn test_matches_name() {
        let pattern = SearchPattern::new("test").unwrap();
        assert!(pattern.matches_name("testfile1"));
        assert!(pattern.matches_name("a-test.tar.gz"));
        assert!(!pattern.matches_name("README"));
        assert_eq!(pattern.as_str(), "test");
    }

    #[test]
    fn test_scan_finds_match_on_later_line() {
        assert!(scan("needle", b"hay\nmore hay\nthe needle is here\nhay\n"));
        assert!(!scan("needle", b"hay\nhay"));
    }

    #[test]
    fn test_scan_matches_across_lines() {
        assert!(scan(r"hello\nworld", b"hello\nworld\n"));
        assert!(scan(r"(?s)BEGIN.*END", b"BEGIN\nx\nEND\n"));
        assert!(!scan(r"BEGIN.*END", b"BEGIN\nx\nEND\n"));
    }

    #[test]
    fn test_scan_anchors_at_content_ends() {
        assert!(!scan("^end$", b"start\nend\n"));
        assert!(scan("^start", b"start\nend\n"));
        assert!(scan(r"end\n$", b"start\nend\n"));
        assert!(scan("(?m)^end$", b"start\nend\n"));
    }

    #[test]
    fn test_scan_across_read_boundaries() {
        let pattern = SearchPattern::new(r"needle\nthread").unwrap();
        assert!(pattern.scan(Trickle(b"xx needle\nthread yy")).unwrap());

        let mut content = vec![b'.'; SCAN_CHUNK - 3];
        content.extend_from_slice(b"needle\nthread");
        assert!(pattern.scan(Cursor::new(content)).unwrap());
    }

    #[test]
    fn test_scan_long_content_without_newlines() {
        let mut content = vec![0xAAu8; 4 * SCAN_CHUNK];
        content.extend_from_slice(b"tail-marker");
        assert!(scan("tail-marker$", &content));
        assert!(!scan("absent", &content));
    }

    #[test]
    fn test_scan_binary_content() {
        let mut content = vec![0xFF, 0x00, 0xFE];
        content.extend_from_slice(b"secret");
        content.push(0x80);
        assert!(scan("secret", &content));
        assert!(scan(r"(?-u)\xFE", &content));
    }

    #[test]
    fn test_word_boundaries_are_ascii() {
        assert!(scan(r"\bword\b", "é word é".as_bytes()));
        assert!(!scan(r"\bword\b", b"swordfish"));

        let pattern = SearchPattern::new(r"\bword\b").unwrap();
        assert!(pattern.matches_name("a word"));
        assert!(!pattern.matches_name("swordfish"));
    }

    #[test]
    fn test_scan_empty_content() {
        assert!(!scan("x", b""));
        assert!(scan("", b""));
        assert!(scan("^$", b""));
    }

    #[test]
    fn test_scan_stops_at_first_match() {
        let pattern = SearchPattern::new("hit").unwrap();
        assert!(pattern.scan(FailAfter(b"hit\n")).unwrap());

        // Without a match the whole stream is read, so the failure surfaces.
        let err = pattern.scan(FailAfter(b"miss\n")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_scan_stops_when_no_match_is_possible() {
        let pattern = SearchPattern::new("^abc").unwrap();
        assert!(!pattern.scan(FailAfter(b"xyz")).unwrap());
    }
}
