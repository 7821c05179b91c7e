mod schema;

pub use schema::Database;

use crate::error::Result;
use crate::library::Manga;

/// Persistence collaborator used by the importer.
pub trait LibraryStore: Send + Sync {
    /// Insert or update a library entry keyed by its file URI, returning its id.
    fn save(&self, manga: &Manga) -> Result<i64>;

    /// Whether an entry with this file URI is already stored.
    fn contains(&self, file_uri: &str) -> Result<bool>;
}

impl LibraryStore for Database {
    fn save(&self, manga: &Manga) -> Result<i64> {
        self.upsert_manga(manga)
    }

    fn contains(&self, file_uri: &str) -> Result<bool> {
        Ok(self.get_manga_by_uri(file_uri)?.is_some())
    }
}
