//! Entry classification and cover selection.

use crate::archive::{EntryMeta, extension_of};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Image extensions treated as comic pages (lowercase).
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Base names that mark a cover image regardless of "cover" appearing in them.
const COVER_STEMS: [&str; 3] = ["000", "0000", "folder"];

/// Role of an archive entry in a comic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A regular page.
    PageImage,
    /// An image named like a cover.
    CoverCandidate,
    /// Anything that is not a page image.
    Ignored,
}

/// Classify an entry by its path inside the archive.
pub fn classify(entry_name: &str) -> EntryKind {
    let file_name = entry_name.rsplit(['/', '\\']).next().unwrap_or(entry_name);

    // Resource forks and Finder metadata written by macOS archivers.
    if entry_name.starts_with("__MACOSX/")
        || entry_name.contains("/__MACOSX/")
        || file_name.starts_with("._")
    {
        return EntryKind::Ignored;
    }

    let Some(ext) = extension_of(file_name) else {
        return EntryKind::Ignored;
    };
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return EntryKind::Ignored;
    }

    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem)
        .to_lowercase();
    if stem.contains("cover") || COVER_STEMS.contains(&stem.as_str()) {
        EntryKind::CoverCandidate
    } else {
        EntryKind::PageImage
    }
}

/// An archive entry with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEntry {
    /// Entry metadata as streamed.
    pub meta: EntryMeta,
    /// Classification tag.
    pub kind: EntryKind,
}

impl ClassifiedEntry {
    /// Classify `meta` by its name.
    pub fn new(meta: EntryMeta) -> Self {
        let kind = classify(&meta.name);
        Self { meta, kind }
    }

    /// Path inside the archive.
    pub fn name(&self) -> &str {
        &self.meta.name
    }
}

/// Pick the cover among classified entries in archive order.
///
/// The first cover candidate wins; otherwise the page with the naturally
/// smallest name. `None` when there are no images.
pub fn select_cover(entries: &[ClassifiedEntry]) -> Option<&ClassifiedEntry> {
    entries
        .iter()
        .find(|e| e.kind == EntryKind::CoverCandidate)
        .or_else(|| {
            entries
                .iter()
                .filter(|e| e.kind == EntryKind::PageImage)
                .min_by(|a, b| natural_cmp(a.name(), b.name()))
        })
}

/// Compare two names, treating runs of ASCII digits as numbers.
///
/// Digit runs compare by value, leading zeros ignored, the shorter run
/// first on equal value. Everything else compares ignoring ASCII case.
/// Names that only differ in case fall back to a byte-wise comparison so
/// the order stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    folded_cmp(a.as_bytes(), b.as_bytes()).then_with(|| a.cmp(b))
}

fn folded_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let a_end = digit_run_end(a, i);
            let b_end = digit_run_end(b, j);
            match cmp_digit_runs(&a[i..a_end], &b[j..b_end]) {
                Ordering::Equal => {}
                other => return other,
            }
            i = a_end;
            j = b_end;
        } else {
            match a[i].to_ascii_lowercase().cmp(&b[j].to_ascii_lowercase()) {
                Ordering::Equal => {}
                other => return other,
            }
            i += 1;
            j += 1;
        }
    }

    (a.len() - i).cmp(&(b.len() - j))
}

fn digit_run_end(s: &[u8], start: usize) -> usize {
    s[start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(s.len(), |n| start + n)
}

fn cmp_digit_runs(a: &[u8], b: &[u8]) -> Ordering {
    let trim = |run: &[u8]| -> usize { run.iter().take_while(|c| **c == b'0').count() };
    let a_sig = &a[trim(a)..];
    let b_sig = &b[trim(b)..];

    // No overflow: significant digits compare by length first, then lexically.
    a_sig
        .len()
        .cmp(&b_sig.len())
        .then_with(|| a_sig.cmp(b_sig))
        .then_with(|| a.len().cmp(&b.len()))
}
