//! Byte sources handed to the import pipeline.
//!
//! A source is an opaque reference: the pipeline only asks for a display
//! name, a declared size and a fresh forward-only byte stream. Local files
//! are the common case, but nothing downstream assumes a filesystem path.

use crate::archive;
use crate::classify::natural_cmp;
use crate::error::{ImportError, Result};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A comic file reference resolvable to a byte stream.
pub trait ComicSource: Send + Sync {
    /// File name used for format fallback and title derivation.
    fn name(&self) -> String;

    /// Stable URI identifying the source in the library.
    fn uri(&self) -> String;

    /// Local filesystem path, when there is one.
    fn path(&self) -> Option<PathBuf> {
        None
    }

    /// Declared size in bytes.
    fn size(&self) -> Result<u64>;

    /// Open a new stream positioned at the first byte.
    fn open_stream(&self) -> Result<Box<dyn Read + Send>>;
}

/// A comic file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Create a source for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ComicSource for FileSource {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn uri(&self) -> String {
        let absolute = std::path::absolute(&self.path).unwrap_or_else(|_| self.path.clone());
        let encoded: Vec<String> = absolute
            .to_string_lossy()
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("file://{}", encoded.join("/"))
    }

    fn path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    fn size(&self) -> Result<u64> {
        let metadata = std::fs::metadata(&self.path).map_err(|e| {
            ImportError::UnreadableSource(format!("{}: {}", self.path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(ImportError::UnreadableSource(format!(
                "{}: not a regular file",
                self.path.display()
            )));
        }
        Ok(metadata.len())
    }

    fn open_stream(&self) -> Result<Box<dyn Read + Send>> {
        let file = File::open(&self.path).map_err(|e| {
            ImportError::UnreadableSource(format!("{}: {}", self.path.display(), e))
        })?;
        Ok(Box::new(file))
    }
}

/// An in-memory comic, e.g. bytes received from a content provider.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Arc<[u8]>,
}

impl MemorySource {
    /// Create a source from a name and its bytes.
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

impl ComicSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn uri(&self) -> String {
        format!("memory://{}", urlencoding::encode(&self.name))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn open_stream(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.data))))
    }
}

/// Collect supported comic files below `dir`, in natural order.
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ImportError::UnreadableSource(format!(
            "{}: not a directory",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| archive::is_supported_name(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect();

    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));

    tracing::debug!(dir = %dir.display(), files = files.len(), "Scanned directory");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_streams_its_bytes() {
        let source = MemorySource::new("Vol 1.cbz", b"PK\x03\x04rest".to_vec());
        assert_eq!(source.size().unwrap(), 8);

        let mut data = Vec::new();
        source.open_stream().unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"PK\x03\x04rest");
        assert_eq!(source.uri(), "memory://Vol%201.cbz");
    }

    #[test]
    fn missing_file_is_unreadable() {
        let source = FileSource::new("/definitely/not/here.cbz");
        assert!(matches!(
            source.size(),
            Err(ImportError::UnreadableSource(_))
        ));
    }

    #[test]
    fn scan_directory_keeps_supported_files_in_natural_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["vol10.cbz", "vol2.cbr", "notes.txt", "vol1.ZIP"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("extra.rar"), b"x").unwrap();

        let files = scan_directory(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();

        assert_eq!(names, vec!["nested/extra.rar", "vol1.ZIP", "vol2.cbr", "vol10.cbz"]);
    }
}
