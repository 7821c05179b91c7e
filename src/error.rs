use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Main error type for the import pipeline.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The source could not be opened or sized.
    #[error("Unreadable source: {0}")]
    UnreadableSource(String),

    /// The file is not a supported comic archive.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file exceeds the configured archive size ceiling.
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge {
        /// Declared size of the file.
        size: u64,
        /// Configured ceiling.
        limit: u64,
    },

    /// The archive container could not be parsed.
    #[error("Cannot open archive: {0}")]
    ArchiveOpen(String),

    /// The archive exceeds the entry count or uncompressed size ceiling.
    #[error("Archive too large: {0}")]
    ArchiveTooLarge(String),

    /// An entry was advanced past before being drained or skipped.
    #[error("Entry sequencing violated: {0}")]
    Sequencing(String),

    /// The archive contains no entries at all.
    #[error("Archive contains no entries")]
    EmptyArchive,

    /// Image bytes could not be decoded or re-encoded.
    #[error("Image decode error: {0}")]
    Decode(String),

    /// A cover artifact could not be written.
    #[error("Storage write error: {0}")]
    StorageWrite(String),

    /// The library store rejected the entity.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Cancellation was observed.
    #[error("Import cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Serializable discriminant of [`ImportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ImportError::UnreadableSource`].
    UnreadableSource,
    /// See [`ImportError::UnsupportedFormat`].
    UnsupportedFormat,
    /// See [`ImportError::FileTooLarge`].
    FileTooLarge,
    /// See [`ImportError::ArchiveOpen`].
    ArchiveOpen,
    /// See [`ImportError::ArchiveTooLarge`].
    ArchiveTooLarge,
    /// See [`ImportError::Sequencing`].
    Sequencing,
    /// See [`ImportError::EmptyArchive`].
    EmptyArchive,
    /// See [`ImportError::Decode`].
    Decode,
    /// See [`ImportError::StorageWrite`].
    StorageWrite,
    /// See [`ImportError::Persistence`].
    Persistence,
    /// See [`ImportError::Cancelled`].
    Cancelled,
    /// See [`ImportError::Config`].
    Config,
    /// See [`ImportError::Io`].
    Io,
}

impl ImportError {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::UnreadableSource(_) => ErrorKind::UnreadableSource,
            ImportError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ImportError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            ImportError::ArchiveOpen(_) => ErrorKind::ArchiveOpen,
            ImportError::ArchiveTooLarge(_) => ErrorKind::ArchiveTooLarge,
            ImportError::Sequencing(_) => ErrorKind::Sequencing,
            ImportError::EmptyArchive => ErrorKind::EmptyArchive,
            ImportError::Decode(_) => ErrorKind::Decode,
            ImportError::StorageWrite(_) => ErrorKind::StorageWrite,
            ImportError::Persistence(_) => ErrorKind::Persistence,
            ImportError::Cancelled => ErrorKind::Cancelled,
            ImportError::Config(_) => ErrorKind::Config,
            ImportError::Io(_) => ErrorKind::Io,
        }
    }

    /// Wrap this error so it can travel through an `io::Read` implementation.
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::other(self)
    }

    /// Convert an I/O error raised while reading archive data.
    ///
    /// Errors produced by [`ImportError::into_io`] are unwrapped back to
    /// their original variant; anything else means the container is broken.
    pub(crate) fn from_archive_io(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<ImportError>()) {
            if let Some(inner) = err.into_inner() {
                return match inner.downcast::<ImportError>() {
                    Ok(typed) => *typed,
                    Err(other) => ImportError::ArchiveOpen(other.to_string()),
                };
            }
            return ImportError::ArchiveOpen("corrupt archive data".into());
        }

        match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                ImportError::ArchiveOpen("unexpected end of archive data".into())
            }
            _ => ImportError::ArchiveOpen(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for ImportError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => ImportError::from_archive_io(e),
            other => ImportError::ArchiveOpen(other.to_string()),
        }
    }
}

/// Result type alias for the import pipeline.
pub type Result<T> = std::result::Result<T, ImportError>;
