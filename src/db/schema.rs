use crate::error::{ImportError, Result};
use crate::library::{Manga, ReadingStatus};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MANGA_COLUMNS: &str = "id, title, author, description, file_path, file_uri, file_format,
     file_size, page_count, current_page, cover_image_path, reading_status, is_favorite,
     date_added, date_modified";

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| ImportError::Persistence(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ImportError::Persistence(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS manga (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                file_path TEXT,
                file_uri TEXT NOT NULL UNIQUE,
                file_format TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                page_count INTEGER NOT NULL DEFAULT 0,
                current_page INTEGER NOT NULL DEFAULT 0,
                cover_image_path TEXT,
                reading_status TEXT NOT NULL DEFAULT 'unread',
                is_favorite INTEGER NOT NULL DEFAULT 0,
                date_added INTEGER NOT NULL,
                date_modified INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_manga_title ON manga(title);
            "#,
        )
        .map_err(|e| ImportError::Persistence(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    /// Insert a library entry, or refresh the one with the same file URI.
    ///
    /// Reading state and favourites of an existing entry are kept.
    pub fn upsert_manga(&self, manga: &Manga) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row(
            "INSERT INTO manga
             (title, author, description, file_path, file_uri, file_format, file_size,
              page_count, current_page, cover_image_path, reading_status, is_favorite,
              date_added, date_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT (file_uri) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                description = excluded.description,
                file_path = excluded.file_path,
                file_format = excluded.file_format,
                file_size = excluded.file_size,
                page_count = excluded.page_count,
                cover_image_path = excluded.cover_image_path,
                date_modified = excluded.date_modified
             RETURNING id",
            params![
                manga.title,
                manga.author,
                manga.description,
                manga.file_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                manga.file_uri,
                manga.file_format,
                manga.file_size as i64,
                manga.page_count,
                manga.current_page,
                manga.cover_image_path.as_ref().map(|p| p.to_string_lossy().to_string()),
                manga.reading_status.as_str(),
                manga.is_favorite,
                manga.date_added.timestamp_millis(),
                manga.date_modified.timestamp_millis(),
            ],
            |row| row.get(0),
        )
        .map_err(|e| ImportError::Persistence(format!("Failed to save manga: {}", e)))
    }

    /// Get a library entry by id.
    pub fn get_manga(&self, id: i64) -> Result<Option<Manga>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM manga WHERE id = ?1", MANGA_COLUMNS),
            params![id],
            manga_from_row,
        )
        .optional()
        .map_err(|e| ImportError::Persistence(format!("Failed to get manga: {}", e)))
    }

    /// Get a library entry by file URI.
    pub fn get_manga_by_uri(&self, file_uri: &str) -> Result<Option<Manga>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {} FROM manga WHERE file_uri = ?1", MANGA_COLUMNS),
            params![file_uri],
            manga_from_row,
        )
        .optional()
        .map_err(|e| ImportError::Persistence(format!("Failed to get manga: {}", e)))
    }

    /// List all library entries by title.
    pub fn list_manga(&self) -> Result<Vec<Manga>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM manga ORDER BY title COLLATE NOCASE, id",
                MANGA_COLUMNS
            ))
            .map_err(|e| ImportError::Persistence(format!("Failed to prepare query: {}", e)))?;

        let manga = stmt
            .query_map([], manga_from_row)
            .map_err(|e| ImportError::Persistence(format!("Failed to list manga: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ImportError::Persistence(format!("Failed to collect manga: {}", e)))?;

        Ok(manga)
    }
}

fn manga_from_row(row: &Row<'_>) -> rusqlite::Result<Manga> {
    let file_size: i64 = row.get(7)?;
    let status: String = row.get(11)?;
    Ok(Manga {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        author: row.get(2)?,
        description: row.get(3)?,
        file_path: row.get::<_, Option<String>>(4)?.map(PathBuf::from),
        file_uri: row.get(5)?,
        file_format: row.get(6)?,
        file_size: u64::try_from(file_size).unwrap_or_default(),
        page_count: row.get(8)?,
        current_page: row.get(9)?,
        cover_image_path: row.get::<_, Option<String>>(10)?.map(PathBuf::from),
        reading_status: ReadingStatus::parse(&status),
        is_favorite: row.get(12)?,
        date_added: from_millis(row.get(13)?),
        date_modified: from_millis(row.get(14)?),
    })
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LibraryStore;

    fn manga(uri: &str, title: &str) -> Manga {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        Manga {
            id: None,
            title: title.into(),
            author: String::new(),
            description: String::new(),
            file_path: Some(PathBuf::from("/comics/a.cbz")),
            file_uri: uri.into(),
            file_format: "cbz".into(),
            file_size: 1234,
            page_count: 20,
            current_page: 0,
            cover_image_path: None,
            reading_status: ReadingStatus::Unread,
            is_favorite: false,
            date_added: now,
            date_modified: now,
        }
    }

    #[test]
    fn save_and_read_back() {
        let db = Database::open_memory().unwrap();
        let id = db.save(&manga("file:///a.cbz", "Akira")).unwrap();

        let stored = db.get_manga(id).unwrap().unwrap();
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.title, "Akira");
        assert_eq!(stored.page_count, 20);
        assert_eq!(stored.date_added.timestamp_millis(), 1_700_000_000_123);
        assert!(db.contains("file:///a.cbz").unwrap());
        assert!(!db.contains("file:///b.cbz").unwrap());
    }

    #[test]
    fn saving_the_same_uri_updates_in_place() {
        let db = Database::open_memory().unwrap();
        let first = db.save(&manga("file:///a.cbz", "Akira")).unwrap();
        let mut updated = manga("file:///a.cbz", "Akira Vol 1");
        updated.page_count = 30;
        let second = db.save(&updated).unwrap();

        assert_eq!(first, second);
        let all = db.list_manga().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Akira Vol 1");
        assert_eq!(all[0].page_count, 30);
    }

    #[test]
    fn list_is_ordered_by_title() {
        let db = Database::open_memory().unwrap();
        db.save(&manga("file:///z.cbz", "zeta")).unwrap();
        db.save(&manga("file:///a.cbz", "Alpha")).unwrap();
        let titles: Vec<String> = db.list_manga().unwrap().into_iter().map(|m| m.title).collect();
        assert_eq!(titles, vec!["Alpha", "zeta"]);
    }
}
