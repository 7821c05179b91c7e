//! Archive format detection and streaming entry readers.
//!
//! Entries are handed out one at a time and borrow the reader: each one
//! must be drained or skipped before the next is requested. ZIP archives
//! are walked front to back over a plain `Read` stream and never seek.
//! RAR archives are decoded by libunrar, which needs a file on disk, so
//! sources without a local path are spooled to a temporary file first.

mod rar;
mod zip;

pub use self::rar::RarReader;
pub use self::zip::ZipReader;

use crate::error::{ImportError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::path::Path;

/// File extensions accepted by the importer (lowercase).
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["cbz", "zip", "cbr", "rar"];

const ZIP_LOCAL_MAGIC: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
const RAR4_MAGIC: &[u8] = b"Rar!\x1a\x07\x00";
const RAR5_MAGIC: &[u8] = b"Rar!\x1a\x07\x01\x00";

/// Number of leading bytes needed by [`ArchiveFormat::detect`].
pub const HEADER_LEN: usize = RAR5_MAGIC.len();

/// Container format of a comic archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// ZIP family (`.zip`, `.cbz`).
    Zip,
    /// RAR family (`.rar`, `.cbr`).
    Rar,
    /// Anything else.
    Unsupported,
}

impl ArchiveFormat {
    /// Detect the format from header bytes, falling back to the file extension.
    ///
    /// Magic bytes win over a disagreeing extension.
    pub fn detect(name: &str, header: &[u8]) -> Self {
        if header.starts_with(ZIP_LOCAL_MAGIC) || header.starts_with(ZIP_EMPTY_MAGIC) {
            return ArchiveFormat::Zip;
        }
        if header.starts_with(RAR4_MAGIC) || header.starts_with(RAR5_MAGIC) {
            return ArchiveFormat::Rar;
        }

        extension_of(name)
            .map(|ext| Self::from_extension(&ext))
            .unwrap_or(ArchiveFormat::Unsupported)
    }

    /// Map a file extension to a format.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "zip" | "cbz" => ArchiveFormat::Zip,
            "rar" | "cbr" => ArchiveFormat::Rar,
            _ => ArchiveFormat::Unsupported,
        }
    }
}

/// Lowercased extension of a file name, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Whether a file name carries one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported_name(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Hard ceilings applied while streaming one archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Maximum number of yielded entries.
    pub max_entries: usize,
    /// Maximum sum of uncompressed entry sizes.
    pub max_total_uncompressed: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_total_uncompressed: 2 * 1024 * 1024 * 1024,
        }
    }
}

/// Metadata of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Path inside the archive, `/`-separated.
    pub name: String,
    /// Declared uncompressed size (0 when only known after decoding).
    pub size: u64,
    /// Compressed size as stored in the archive (0 when the container
    /// does not report it).
    pub compressed_size: u64,
    /// Last modification time, when recorded.
    pub modified: Option<DateTime<Utc>>,
    /// Ordinal among yielded entries.
    pub index: usize,
}

/// Format-specific access to the data of the entry last yielded.
pub(crate) trait EntryBody {
    /// Read decoded bytes of the current entry.
    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard whatever is left of the current entry.
    fn skip_body(&mut self) -> Result<()>;
}

/// One entry yielded by an [`EntryReader`].
///
/// Reading consumes the underlying archive stream, so bytes come out once,
/// in order. Call [`ArchiveEntry::skip`] to move past an entry unread.
pub struct ArchiveEntry<'a> {
    meta: EntryMeta,
    body: Box<dyn EntryBody + 'a>,
}

impl<'a> ArchiveEntry<'a> {
    pub(crate) fn new(meta: EntryMeta, body: Box<dyn EntryBody + 'a>) -> Self {
        Self { meta, body }
    }

    /// Entry metadata.
    pub fn meta(&self) -> &EntryMeta {
        &self.meta
    }

    /// Path inside the archive.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Consume the entry, returning its metadata.
    pub fn into_meta(self) -> EntryMeta {
        self.meta
    }

    /// Move past this entry without decoding it.
    pub fn skip(mut self) -> Result<EntryMeta> {
        self.body.skip_body()?;
        Ok(self.meta)
    }

    /// Read the whole entry into memory.
    ///
    /// Returns `Ok(None)` (with the entry skipped) when it holds more than
    /// `max_len` bytes.
    pub fn read_to_vec(mut self, max_len: u64) -> Result<Option<Vec<u8>>> {
        if self.meta.size > max_len {
            self.body.skip_body()?;
            return Ok(None);
        }

        let mut data = Vec::with_capacity(self.meta.size as usize);
        self.by_ref()
            .take(max_len + 1)
            .read_to_end(&mut data)
            .map_err(ImportError::from_archive_io)?;

        if data.len() as u64 > max_len {
            self.body.skip_body()?;
            return Ok(None);
        }
        Ok(Some(data))
    }
}

impl Read for ArchiveEntry<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read_body(buf)
    }
}

/// A lazy, forward-only sequence of archive entries.
pub trait EntryReader {
    /// Advance to the next entry.
    ///
    /// Fails with [`ImportError::Sequencing`] if the previous entry was
    /// neither drained nor skipped. Returns `Ok(None)` once the archive
    /// is exhausted; the reader cannot be rewound.
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_>>>;

    /// Number of entries the archive will yield, when known up front.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

/// Open a reader for the given format.
///
/// `path` is the source's location on disk, when it has one. RAR archives
/// are opened from it directly; without it the stream is spooled to a
/// temporary file.
pub fn open(
    format: ArchiveFormat,
    source: Box<dyn Read + Send>,
    path: Option<&Path>,
    limits: ArchiveLimits,
) -> Result<Box<dyn EntryReader>> {
    match format {
        ArchiveFormat::Zip => Ok(Box::new(ZipReader::new(source, limits)?)),
        ArchiveFormat::Rar => match path {
            Some(path) => Ok(Box::new(RarReader::open(path, limits)?)),
            None => Ok(Box::new(RarReader::spool(source, limits)?)),
        },
        ArchiveFormat::Unsupported => Err(ImportError::UnsupportedFormat(
            "not a ZIP or RAR archive".into(),
        )),
    }
}

/// Entry count and size accounting shared by the readers.
#[derive(Debug)]
pub(crate) struct Budget {
    limits: ArchiveLimits,
    entries: usize,
    total: u64,
}

impl Budget {
    pub(crate) fn new(limits: ArchiveLimits) -> Self {
        Self {
            limits,
            entries: 0,
            total: 0,
        }
    }

    /// Account for a new entry, returning its ordinal.
    pub(crate) fn admit(&mut self, declared_size: u64) -> Result<usize> {
        if self.entries >= self.limits.max_entries {
            return Err(ImportError::ArchiveTooLarge(format!(
                "more than {} entries",
                self.limits.max_entries
            )));
        }
        self.charge(declared_size)?;
        self.entries += 1;
        Ok(self.entries - 1)
    }

    /// Account for uncompressed bytes not declared up front.
    pub(crate) fn charge(&mut self, bytes: u64) -> Result<()> {
        self.total = self.total.saturating_add(bytes);
        if self.total > self.limits.max_total_uncompressed {
            return Err(ImportError::ArchiveTooLarge(format!(
                "more than {} bytes uncompressed",
                self.limits.max_total_uncompressed
            )));
        }
        Ok(())
    }
}

/// Convert an MS-DOS date/time pair.
pub(crate) fn dos_datetime(date: u16, time: u16) -> Option<DateTime<Utc>> {
    let year = 1980 + i32::from(date >> 9);
    let month = u32::from((date >> 5) & 0x0f);
    let day = u32::from(date & 0x1f);
    let hour = u32::from(time >> 11);
    let minute = u32::from((time >> 5) & 0x3f);
    let second = u32::from(time & 0x1f) * 2;

    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(hour, minute, second)
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_prefers_magic_over_extension() {
        assert_eq!(
            ArchiveFormat::detect("book.cbr", b"PK\x03\x04\x14\x00"),
            ArchiveFormat::Zip
        );
        assert_eq!(
            ArchiveFormat::detect("book.cbz", b"Rar!\x1a\x07\x01\x00"),
            ArchiveFormat::Rar
        );
        assert_eq!(
            ArchiveFormat::detect("book.zip", b"Rar!\x1a\x07\x00"),
            ArchiveFormat::Rar
        );
    }

    #[test]
    fn detect_falls_back_to_extension() {
        assert_eq!(
            ArchiveFormat::detect("Book.CBZ", b"garbage!"),
            ArchiveFormat::Zip
        );
        assert_eq!(ArchiveFormat::detect("book.rar", b""), ArchiveFormat::Rar);
        assert_eq!(
            ArchiveFormat::detect("book.pdf", b"%PDF-1.7"),
            ArchiveFormat::Unsupported
        );
        assert_eq!(
            ArchiveFormat::detect("README", b"hello"),
            ArchiveFormat::Unsupported
        );
    }

    #[test]
    fn extension_helpers() {
        assert_eq!(extension_of("dir.v2/Vol 01.CbZ").as_deref(), Some("cbz"));
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("noext"), None);
        assert!(is_supported_name("a.cbr"));
        assert!(!is_supported_name("a.7z"));
    }

    #[test]
    fn budget_enforces_both_ceilings() {
        let mut budget = Budget::new(ArchiveLimits {
            max_entries: 2,
            max_total_uncompressed: 100,
        });
        assert_eq!(budget.admit(40).unwrap(), 0);
        assert_eq!(budget.admit(40).unwrap(), 1);
        assert!(matches!(budget.admit(0), Err(ImportError::ArchiveTooLarge(_))));

        let mut budget = Budget::new(ArchiveLimits {
            max_entries: 10,
            max_total_uncompressed: 100,
        });
        budget.admit(90).unwrap();
        assert!(matches!(budget.charge(11), Err(ImportError::ArchiveTooLarge(_))));
    }

    #[test]
    fn dos_datetime_decodes_fields() {
        // 2021-03-14 15:09:26
        let date = ((2021 - 1980) << 9) | (3 << 5) | 14;
        let time = (15 << 11) | (9 << 5) | 13;
        let dt = dos_datetime(date, time).unwrap();
        assert_eq!(dt.to_rfc3339(), "2021-03-14T15:09:26+00:00");
        assert!(dos_datetime(0, 0).is_none());
    }
}
