//! Normalized description of one comic archive.

use crate::archive::ArchiveFormat;
use crate::classify::{ClassifiedEntry, EntryKind, natural_cmp};
use crate::error::{ImportError, Result};
use crate::metadata::ComicMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One entry of a comic, as recorded in the library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicEntry {
    /// Path inside the archive.
    pub name: String,
    /// Uncompressed size.
    pub size: u64,
    /// Compressed size.
    pub compressed_size: u64,
    /// Last modification time, when recorded.
    pub modified: Option<DateTime<Utc>>,
    /// Position in the archive stream.
    pub index: usize,
    /// Role of the entry in the comic.
    pub kind: EntryKind,
    /// Whether the entry was selected as the cover.
    pub is_cover: bool,
}

impl ComicEntry {
    fn from_classified(entry: &ClassifiedEntry, is_cover: bool) -> Self {
        Self {
            name: entry.meta.name.clone(),
            size: entry.meta.size,
            compressed_size: entry.meta.compressed_size,
            modified: entry.meta.modified,
            index: entry.meta.index,
            kind: entry.kind,
            is_cover,
        }
    }
}

/// Everything known about a comic before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComicInfo {
    /// Display title.
    pub title: String,
    /// Author, empty when unknown.
    pub author: String,
    /// Description, empty when unknown.
    pub description: String,
    /// Local path, when the source has one.
    pub file_path: Option<PathBuf>,
    /// Source URI.
    pub file_uri: String,
    /// Container format.
    pub file_format: ArchiveFormat,
    /// Lowercased file extension.
    pub file_extension: String,
    /// Archive size in bytes.
    pub file_size: u64,
    /// Number of page images (covers excluded).
    pub page_count: u32,
    /// All entries in natural name order.
    pub entries: Vec<ComicEntry>,
    /// The selected cover, when there is one.
    pub cover_entry: Option<ComicEntry>,
    /// When the record was built.
    pub date_added: DateTime<Utc>,
    /// Last modification of the record.
    pub date_modified: DateTime<Utc>,
}

impl ComicInfo {
    /// Page entries only, in reading order.
    ///
    /// Yields exactly [`ComicInfo::page_count`] entries, including a page
    /// that doubles as the fallback cover.
    pub fn pages(&self) -> impl Iterator<Item = &ComicEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::PageImage)
    }
}

/// Aggregates streamed entries and source facts into a [`ComicInfo`].
#[derive(Debug, Clone)]
pub struct ComicInfoBuilder {
    file_name: String,
    format: ArchiveFormat,
    file_size: u64,
    file_uri: String,
    file_path: Option<PathBuf>,
    metadata: Option<ComicMetadata>,
}

impl ComicInfoBuilder {
    /// Start a record for `file_name`.
    pub fn new(file_name: impl Into<String>, format: ArchiveFormat, file_size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            format,
            file_size,
            file_uri: String::new(),
            file_path: None,
            metadata: None,
        }
    }

    /// Set the source URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.file_uri = uri.into();
        self
    }

    /// Set the local path.
    pub fn path(mut self, path: Option<PathBuf>) -> Self {
        self.file_path = path;
        self
    }

    /// Attach embedded `ComicInfo.xml` metadata.
    pub fn metadata(mut self, metadata: Option<ComicMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Build the record.
    ///
    /// `cover` must be one of `entries`. Fails with
    /// [`ImportError::EmptyArchive`] only when there are no entries at all.
    pub fn build(
        self,
        entries: &[ClassifiedEntry],
        cover: Option<&ClassifiedEntry>,
    ) -> Result<ComicInfo> {
        if entries.is_empty() {
            return Err(ImportError::EmptyArchive);
        }

        let cover_index = cover.map(|c| c.meta.index);
        let mut sorted: Vec<&ClassifiedEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| natural_cmp(a.name(), b.name()));

        let records: Vec<ComicEntry> = sorted
            .into_iter()
            .map(|e| ComicEntry::from_classified(e, Some(e.meta.index) == cover_index))
            .collect();
        let cover_entry = records.iter().find(|e| e.is_cover).cloned();

        let page_count = entries
            .iter()
            .filter(|e| e.kind == EntryKind::PageImage)
            .count();

        let metadata = self.metadata.unwrap_or_default();
        let title = metadata
            .display_title()
            .unwrap_or_else(|| title_from_file_name(&self.file_name));
        let now = Utc::now();

        Ok(ComicInfo {
            title,
            author: metadata.writer.unwrap_or_default(),
            description: metadata.summary.unwrap_or_default(),
            file_path: self.file_path,
            file_uri: self.file_uri,
            file_format: self.format,
            file_extension: crate::archive::extension_of(&self.file_name).unwrap_or_default(),
            file_size: self.file_size,
            page_count: u32::try_from(page_count).unwrap_or(u32::MAX),
            entries: records,
            cover_entry,
            date_added: now,
            date_modified: now,
        })
    }
}

/// Derive a title from a file name: extension dropped, `_` and `.` as spaces.
pub fn title_from_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };

    let title = stem
        .replace(['_', '.'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        "Unknown".to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::EntryMeta;
    use crate::classify::select_cover;

    fn classified(names: &[&str]) -> Vec<ClassifiedEntry> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                ClassifiedEntry::new(EntryMeta {
                    name: name.to_string(),
                    size: 100,
                    compressed_size: 80,
                    modified: None,
                    index,
                })
            })
            .collect()
    }

    #[test]
    fn page_count_excludes_covers_and_other_files() {
        let entries = classified(&[
            "p10.jpg",
            "cover.jpg",
            "p2.jpg",
            "ComicInfo.xml",
            "p1.png",
        ]);
        let cover = select_cover(&entries);
        let info = ComicInfoBuilder::new("My_Comic.v01.cbz", ArchiveFormat::Zip, 4096)
            .uri("file:///comics/My_Comic.v01.cbz")
            .build(&entries, cover)
            .unwrap();

        assert_eq!(info.page_count, 3);
        assert_eq!(info.title, "My Comic v01");
        assert_eq!(info.file_extension, "cbz");
        assert_eq!(info.cover_entry.as_ref().unwrap().name, "cover.jpg");
        assert_eq!(info.entries.iter().filter(|e| e.is_cover).count(), 1);

        let pages: Vec<&str> = info.pages().map(|e| e.name.as_str()).collect();
        assert_eq!(pages, vec!["p1.png", "p2.jpg", "p10.jpg"]);
    }

    #[test]
    fn fallback_cover_page_is_still_a_page() {
        let entries = classified(&["p2.jpg", "p1.jpg", "notes.txt"]);
        let cover = select_cover(&entries);
        let info = ComicInfoBuilder::new("plain.cbz", ArchiveFormat::Zip, 4096)
            .build(&entries, cover)
            .unwrap();

        assert_eq!(info.cover_entry.as_ref().unwrap().name, "p1.jpg");
        assert_eq!(info.pages().count(), info.page_count as usize);
        let pages: Vec<&str> = info.pages().map(|e| e.name.as_str()).collect();
        assert_eq!(pages, vec!["p1.jpg", "p2.jpg"]);
    }

    #[test]
    fn archives_without_images_still_build() {
        let entries = classified(&["readme.txt"]);
        let info = ComicInfoBuilder::new("notes.zip", ArchiveFormat::Zip, 10)
            .build(&entries, None)
            .unwrap();
        assert_eq!(info.page_count, 0);
        assert!(info.cover_entry.is_none());
    }

    #[test]
    fn no_entries_is_an_error() {
        let result = ComicInfoBuilder::new("empty.cbz", ArchiveFormat::Zip, 22).build(&[], None);
        assert!(matches!(result, Err(ImportError::EmptyArchive)));
    }

    #[test]
    fn embedded_metadata_overrides_file_name() {
        let entries = classified(&["1.jpg"]);
        let metadata = ComicMetadata {
            series: Some("Planetes".into()),
            number: Some("2".into()),
            writer: Some("Makoto Yukimura".into()),
            ..Default::default()
        };
        let info = ComicInfoBuilder::new("planetes_02.cbr", ArchiveFormat::Rar, 10)
            .metadata(Some(metadata))
            .build(&entries, None)
            .unwrap();
        assert_eq!(info.title, "Planetes #2");
        assert_eq!(info.author, "Makoto Yukimura");
        assert_eq!(info.description, "");
    }

    #[test]
    fn titles_from_file_names() {
        assert_eq!(title_from_file_name("One_Piece_v01.cbz"), "One Piece v01");
        assert_eq!(title_from_file_name("dir/Akira.Vol.1.rar"), "Akira Vol 1");
        assert_eq!(title_from_file_name("noext"), "noext");
        assert_eq!(title_from_file_name("___.zip"), "Unknown");
    }
}
