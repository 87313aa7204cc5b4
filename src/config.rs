//! Per-run search settings

/// Default limit for zip archives that have to be buffered in memory (10 MiB).
pub const DEFAULT_MAX_ZIP_SIZE: u64 = 10 * 1024 * 1024;

/// Immutable settings shared by every worker of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Do not match entry names inside containers.
    pub skip_name: bool,
    /// Do not scan leaf content.
    pub skip_body: bool,
    /// Largest zip read from a non-seekable stream that will be buffered.
    /// Zips opened directly from a regular file are never limited.
    pub max_zip_size: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            skip_name: false,
            skip_body: false,
            max_zip_size: DEFAULT_MAX_ZIP_SIZE,
        }
    }
}

/// Parse a size string like "5M", "100K", "1G" into bytes.
/// Supports suffixes: K/KB (1024), M/MB (1024^2), G/GB (1024^3)
/// Without suffix, interprets as bytes.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim().to_uppercase();
    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('G') {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str.trim()))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}
