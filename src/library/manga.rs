//! Library entity stored for each imported comic.

use super::ComicInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reading state of a library entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    /// Not opened yet.
    #[default]
    Unread,
    /// Partially read.
    Reading,
    /// Finished.
    Completed,
}

impl ReadingStatus {
    /// Stable database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Unread => "unread",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Completed => "completed",
        }
    }

    /// Parse the database representation, defaulting to `Unread`.
    pub fn parse(value: &str) -> Self {
        match value {
            "reading" => ReadingStatus::Reading,
            "completed" => ReadingStatus::Completed,
            _ => ReadingStatus::Unread,
        }
    }
}

/// A comic in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manga {
    /// Row id, assigned once saved.
    pub id: Option<i64>,
    /// Display title.
    pub title: String,
    /// Author, empty when unknown.
    pub author: String,
    /// Description, empty when unknown.
    pub description: String,
    /// Local path, when the source has one.
    pub file_path: Option<PathBuf>,
    /// Source URI (unique within the library).
    pub file_uri: String,
    /// Lowercased file extension, e.g. `cbz`.
    pub file_format: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Number of pages.
    pub page_count: u32,
    /// Last page read.
    pub current_page: u32,
    /// Stored cover, if one could be extracted.
    pub cover_image_path: Option<PathBuf>,
    /// Reading state.
    pub reading_status: ReadingStatus,
    /// Favourite flag.
    pub is_favorite: bool,
    /// When the comic entered the library.
    pub date_added: DateTime<Utc>,
    /// Last change to the record.
    pub date_modified: DateTime<Utc>,
}

impl Manga {
    /// Build an unsaved entity from an import record and its cover.
    pub fn from_comic(info: &ComicInfo, cover_image_path: Option<PathBuf>) -> Self {
        Self {
            id: None,
            title: info.title.clone(),
            author: info.author.clone(),
            description: info.description.clone(),
            file_path: info.file_path.clone(),
            file_uri: info.file_uri.clone(),
            file_format: info.file_extension.clone(),
            file_size: info.file_size,
            page_count: info.page_count,
            current_page: 0,
            cover_image_path,
            reading_status: ReadingStatus::Unread,
            is_favorite: false,
            date_added: info.date_added,
            date_modified: info.date_modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveFormat;

    fn info() -> ComicInfo {
        let now = Utc::now();
        ComicInfo {
            title: "Akira".into(),
            author: "Katsuhiro Otomo".into(),
            description: String::new(),
            file_path: Some(PathBuf::from("/comics/akira.cbz")),
            file_uri: "file:///comics/akira.cbz".into(),
            file_format: ArchiveFormat::Zip,
            file_extension: "cbz".into(),
            file_size: 3 * 1024 * 1024,
            page_count: 40,
            entries: Vec::new(),
            cover_entry: None,
            date_added: now,
            date_modified: now,
        }
    }

    #[test]
    fn from_comic_starts_unread() {
        let manga = Manga::from_comic(&info(), Some(PathBuf::from("covers/a.jpg")));
        assert_eq!(manga.id, None);
        assert_eq!(manga.reading_status, ReadingStatus::Unread);
        assert_eq!(manga.current_page, 0);
        assert_eq!(manga.file_format, "cbz");
        assert_eq!(manga.file_size, 3 * 1024 * 1024);
        assert_eq!(manga.page_count, 40);
        assert!(!manga.is_favorite);
    }

    #[test]
    fn reading_status_round_trips_through_text() {
        let all = [
            ReadingStatus::Unread,
            ReadingStatus::Reading,
            ReadingStatus::Completed,
        ];
        for status in all {
            assert_eq!(ReadingStatus::parse(status.as_str()), status);
        }
    }
}
