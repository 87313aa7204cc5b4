//! Archive fixtures built on the fly for tests and benchmarks.
//!
//! This module is only compiled for tests and with the `test-utils` feature.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;

use tempfile::TempDir;

/// A plain tar archive holding `entries` in the given order.
pub fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        builder
            .append_data(&mut header, name, *data)
            .expect("Failed to append tar entry");
    }
    builder.into_inner().expect("Failed to finish tar")
}

/// A zip archive holding `entries` in the given order, deflated.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer
            .start_file(*name, options)
            .expect("Failed to start zip entry");
        writer.write_all(data).expect("Failed to write zip entry");
    }
    writer.finish().expect("Failed to finish zip").into_inner()
}

/// `len` pseudo-random ASCII digits; compresses poorly and never spells a word.
pub fn digit_noise(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            b'0' + ((state >> 16) % 10) as u8
        })
        .collect()
}

pub fn gzip_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).expect("Failed to gzip");
    encoder.finish().expect("Failed to finish gzip")
}

pub fn bzip2_bytes(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data).expect("Failed to bzip2");
    encoder.finish().expect("Failed to finish bzip2")
}

pub fn zstd_bytes(data: &[u8]) -> Vec<u8> {
    zstd::stream::encode_all(data, 0).expect("Failed to zstd")
}

/// Whether an `xz` executable is on the `PATH`.
pub fn has_xz() -> bool {
    static HAS_XZ: OnceLock<bool> = OnceLock::new();
    *HAS_XZ.get_or_init(|| {
        Command::new("xz")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    })
}

/// Compress with the `xz` executable, or `None` when it is not installed.
pub fn xz_bytes(data: &[u8]) -> Option<Vec<u8>> {
    if !has_xz() {
        return None;
    }
    let mut child = Command::new("xz")
        .args(["-z", "-c"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;
    let mut stdin = child.stdin.take()?;
    let input = data.to_vec();
    let writer = thread::spawn(move || stdin.write_all(&input));
    let output = child.wait_with_output().ok()?;
    writer.join().ok()?.ok()?;
    output.status.success().then_some(output.stdout)
}

fn tar_of(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let refs: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.as_slice()))
        .collect();
    tar_bytes(&refs)
}

fn zip_of(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let refs: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.as_slice()))
        .collect();
    zip_bytes(&refs)
}

/// `testfile1` .. `testfileN`, each containing `this is test file N`.
pub fn test_files(count: usize) -> Vec<(String, Vec<u8>)> {
    (1..=count)
        .map(|i| {
            (
                format!("testfile{}", i),
                format!("this is test file {}\n", i).into_bytes(),
            )
        })
        .collect()
}

/// One tar of three test files, compressed every supported way.
/// The `.tar.xz` member is left out when `xz` is not installed.
fn compressed_tars() -> Vec<(String, Vec<u8>)> {
    let tar = tar_of(&test_files(3));
    let mut members = vec![
        ("test.tar.bz2".to_string(), bzip2_bytes(&tar)),
        ("test.tar.gz".to_string(), gzip_bytes(&tar)),
    ];
    if let Some(xz) = xz_bytes(&tar) {
        members.push(("test.tar.xz".to_string(), xz));
    }
    members.push(("test.tar.zst".to_string(), zstd_bytes(&tar)));
    members
}

/// Two levels of nested tars, gzip-compressed at the top:
///
/// ```text
/// test-l2.tar.gz
/// ├── test-l1.tar          (compressed tars + test files)
/// ├── test-l1.tar.zst      (same, zstd-compressed)
/// ├── test.tar.{bz2,gz,xz,zst}
/// └── testfile1..3
/// ```
pub fn nested_tar_fixture() -> Vec<u8> {
    let mut l1 = compressed_tars();
    l1.extend(test_files(3));
    let l1 = tar_of(&l1);

    let mut l2 = vec![
        ("test-l1.tar".to_string(), l1.clone()),
        ("test-l1.tar.zst".to_string(), zstd_bytes(&l1)),
    ];
    l2.extend(compressed_tars());
    l2.extend(test_files(3));
    gzip_bytes(&tar_of(&l2))
}

/// Zips nested in zips, with a gzipped tar at each level:
///
/// ```text
/// test-l2.zip
/// ├── test-l1.zip   (test.tgz, test.zip, testfile1, testfile2)
/// └── test.tgz      (testfile1, testfile2)
/// ```
pub fn nested_zip_fixture() -> Vec<u8> {
    let files = test_files(2);
    let tgz = gzip_bytes(&tar_of(&files));

    let mut l1 = vec![
        ("test.tgz".to_string(), tgz.clone()),
        ("test.zip".to_string(), zip_of(&files)),
    ];
    l1.extend(files);
    zip_of(&[
        ("test-l1.zip".to_string(), zip_of(&l1)),
        ("test.tgz".to_string(), tgz),
    ])
}

/// A temporary directory of fixture files, removed when dropped.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `name` below the directory, creating parents.
    pub fn add_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let full_path = self.dir.path().join(name);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
