//! comic-import: streaming import of comic archives into a manga library.
//!
//! This crate opens comic archives (CBZ/ZIP and CBR/RAR) from any byte
//! source, walks their entries front to back without loading the whole
//! file, picks and stores a cover, and records the comic in a library.
//!
//! # Features
//!
//! - Format detection by magic bytes with extension fallback
//! - Streaming ZIP (stored, deflate, data descriptors, Zip64) and RAR 4/5 readers
//! - Entry and uncompressed-size ceilings against decompression bombs
//! - Cover selection by naming convention and natural page order
//! - Atomic cover storage as normalized JPEG
//! - `ComicInfo.xml` metadata
//! - Single and batch imports with ordered progress events and cancellation
//! - SQLite-backed library store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Archive detection and entry readers.
pub mod archive;
/// Entry classification and cover selection.
pub mod classify;
/// Configuration and CLI.
pub mod config;
/// Cover storage.
pub mod cover;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Import pipeline.
pub mod import;
/// Library models.
pub mod library;
/// Embedded comic metadata.
pub mod metadata;
/// Comic byte sources.
pub mod source;


pub use archive::{ArchiveFormat, ArchiveLimits};
pub use config::{Cli, Command, Config};
pub use db::{Database, LibraryStore};
pub use error::{ErrorKind, ImportError, Result};
pub use import::{
    BatchImportResult, BatchImportStatus, BatchImporter, ImportProgress, ImportProgressState,
    ImportResult, ImportService, ImportStatus, Importer,
};
pub use source::{ComicSource, FileSource, MemorySource};
