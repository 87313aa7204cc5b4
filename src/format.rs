//! Map entry names to a decoder and an optional extractor

use crate::decode::DecoderKind;
use crate::error::ContainerKind;

/// How a node is decoded and whether its decoded stream has entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub decoder: DecoderKind,
    /// `None` means the decoded stream is leaf content.
    pub container: Option<ContainerKind>,
}

/// Suffix table, most specific families first so `.tar.gz` wins over `.gz`.
const FORMATS: &[(&[&str], DecoderKind, Option<ContainerKind>)] = &[
    (
        &[".tar.gz", ".tgz", ".taz"],
        DecoderKind::Gzip,
        Some(ContainerKind::Tar),
    ),
    (
        &[".tar.bz2", ".tar.bz", ".tbz", ".tbz2", ".tz2", ".tb2"],
        DecoderKind::Bzip2,
        Some(ContainerKind::Tar),
    ),
    (
        &[".tar.xz", ".txz"],
        DecoderKind::Xz,
        Some(ContainerKind::Tar),
    ),
    (
        &[".tar.zst", ".tzst", ".tar.zstd"],
        DecoderKind::Zstd,
        Some(ContainerKind::Tar),
    ),
    (&[".tar"], DecoderKind::Identity, Some(ContainerKind::Tar)),
    (&[".zip"], DecoderKind::Identity, Some(ContainerKind::Zip)),
    (&[".gz"], DecoderKind::Gzip, None),
    (&[".bz2", ".bz"], DecoderKind::Bzip2, None),
    (&[".xz"], DecoderKind::Xz, None),
    (&[".zst", ".zstd"], DecoderKind::Zstd, None),
];

impl Format {
    /// Dispatch on the final path segment, ignoring case.
    ///
    /// Unrecognized names are plain leaves; dispatch never fails.
    pub fn for_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        FORMATS
            .iter()
            .find(|(suffixes, _, _)| suffixes.iter().any(|s| lower.ends_with(s)))
            .map(|&(_, decoder, container)| Format { decoder, container })
            .unwrap_or(Format {
                decoder: DecoderKind::Identity,
                container: None,
            })
    }

    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }
}
