//! Test harness for ztgrep integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use ztgrep::test_utils::{TestDir, has_xz, nested_tar_fixture, nested_zip_fixture};
use ztgrep::{Limiter, SearchConfig, SearchEvent, SearchPattern, Searcher};

/// A directory holding `test-l2.tar.gz` and `test-l2.zip`.
pub fn fixture_dir() -> TestDir {
    let dir = TestDir::new();
    dir.add_file("test-l2.tar.gz", &nested_tar_fixture());
    dir.add_file("test-l2.zip", &nested_zip_fixture());
    dir
}

/// Paths reported when searching the two-level tar fixture for `test`.
///
/// Every test file is reported twice, once for its name and once for its
/// content. `.tar.xz` members are missing when `xz` is not installed.
pub fn nested_tar_matches(root: &str) -> Vec<String> {
    let compressed: &[&str] = if has_xz() {
        &["test.tar.bz2", "test.tar.gz", "test.tar.xz", "test.tar.zst"]
    } else {
        &["test.tar.bz2", "test.tar.gz", "test.tar.zst"]
    };

    let test_files = |prefix: &str, count: usize, out: &mut Vec<String>| {
        for i in 1..=count {
            for _ in 0..2 {
                out.push(format!("{}:testfile{}", prefix, i));
            }
        }
    };
    let compressed_tars = |prefix: &str, out: &mut Vec<String>| {
        for name in compressed {
            let path = format!("{}:{}", prefix, name);
            out.push(path.clone());
            test_files(&path, 3, &mut *out);
        }
    };

    let mut expected = Vec::new();
    for l1 in ["test-l1.tar", "test-l1.tar.zst"] {
        let path = format!("{}:{}", root, l1);
        expected.push(path.clone());
        compressed_tars(&path, &mut expected);
        test_files(&path, 3, &mut expected);
    }
    compressed_tars(root, &mut expected);
    test_files(root, 3, &mut expected);
    expected
}

/// Paths reported when searching the nested zip fixture for `test`.
pub fn nested_zip_matches(root: &str) -> Vec<String> {
    [
        "test-l1.zip",
        "test-l1.zip:test.tgz",
        "test-l1.zip:test.tgz:testfile1",
        "test-l1.zip:test.tgz:testfile1",
        "test-l1.zip:test.tgz:testfile2",
        "test-l1.zip:test.tgz:testfile2",
        "test-l1.zip:test.zip",
        "test-l1.zip:test.zip:testfile1",
        "test-l1.zip:test.zip:testfile1",
        "test-l1.zip:test.zip:testfile2",
        "test-l1.zip:test.zip:testfile2",
        "test-l1.zip:testfile1",
        "test-l1.zip:testfile1",
        "test-l1.zip:testfile2",
        "test-l1.zip:testfile2",
        "test.tgz",
        "test.tgz:testfile1",
        "test.tgz:testfile1",
        "test.tgz:testfile2",
        "test.tgz:testfile2",
    ]
    .iter()
    .map(|rest| format!("{}:{}", root, rest))
    .collect()
}

/// Run a search through the concurrent coordinator and collect every event.
pub fn search_all(
    expr: &str,
    config: SearchConfig,
    roots: &[&str],
    workers: usize,
) -> Vec<SearchEvent> {
    let searcher = Searcher::new(SearchPattern::new(expr).expect("valid pattern"), config);
    let limiter = Limiter::new(workers).expect("Failed to build limiter");
    let roots = roots.iter().map(|r| r.to_string()).collect();
    searcher
        .start(roots, &limiter)
        .expect("Failed to start search")
        .iter()
        .collect()
}

pub fn joined(events: &[SearchEvent]) -> Vec<String> {
    events.iter().map(|e| e.path().to_string()).collect()
}

pub fn run_ztgrep(dir: &Path, args: &[&str]) -> (String, String, bool) {
    run_ztgrep_with_stdin(dir, args, &[])
}

pub fn run_ztgrep_with_stdin(dir: &Path, args: &[&str], stdin: &[u8]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_ztgrep");
    let mut child = Command::new(binary)
        .args(args)
        .current_dir(dir)
        .env_remove("ZTGREP_LOG")
        .env_remove("FORCE_COLOR")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run ztgrep");

    {
        let mut input = child.stdin.take().expect("stdin is piped");
        // ztgrep may exit without reading (e.g. on a bad pattern).
        let _ = input.write_all(stdin);
    }
    let output = child.wait_with_output().expect("Failed to wait for ztgrep");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_dir_has_both_archives() {
        let dir = fixture_dir();
        assert!(dir.path().join("test-l2.tar.gz").exists());
        assert!(dir.path().join("test-l2.zip").exists());
    }

    #[test]
    fn test_nested_tar_oracle_size() {
        let per_compressed = 1 + 3 * 2;
        let compressed = if has_xz() { 4 } else { 3 };
        let per_l1 = 1 + compressed * per_compressed + 3 * 2;
        let expected = 2 * per_l1 + compressed * per_compressed + 3 * 2;
        assert_eq!(nested_tar_matches("r").len(), expected);
    }
}
