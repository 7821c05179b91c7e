//! Single-file import state machine.

use super::status::{ImportResult, ImportStatus};
use crate::archive::{self, ArchiveFormat, ArchiveLimits, HEADER_LEN};
use crate::classify::{ClassifiedEntry, EntryKind, select_cover};
use crate::config::ImportConfig;
use crate::cover::{CoverMaterializer, remove_cover};
use crate::db::LibraryStore;
use crate::error::{ImportError, Result};
use crate::library::{ComicInfo, ComicInfoBuilder, Manga};
use crate::metadata::{self, ComicMetadata};
use crate::source::ComicSource;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Largest cover entry decoded, in bytes.
pub const MAX_COVER_BYTES: u64 = 64 * 1024 * 1024;

const PARSING_START: u8 = 10;
const PARSING_END: u8 = 50;
const SAVING_PROGRESS: u8 = 80;

/// Drives one comic source through validation, parsing, cover extraction
/// and persistence.
#[derive(Clone)]
pub struct Importer {
    store: Arc<dyn LibraryStore>,
    covers: CoverMaterializer,
    max_archive_size: u64,
    limits: ArchiveLimits,
}

/// Entries and side data gathered while streaming an archive.
struct Parsed {
    entries: Vec<ClassifiedEntry>,
    /// Ordinal of the cover candidate read while streaming.
    cover_tried: Option<usize>,
    cover_bytes: Option<Vec<u8>>,
    metadata: Option<ComicMetadata>,
}

/// Book-keeping for one attempt; every transition goes through `emit`.
struct Attempt<'s> {
    sink: &'s mut dyn FnMut(ImportResult),
    status: ImportStatus,
    progress: u8,
    comic: Option<Arc<ComicInfo>>,
    cover_path: Option<PathBuf>,
}

impl<'s> Attempt<'s> {
    fn new(sink: &'s mut dyn FnMut(ImportResult)) -> Self {
        Self {
            sink,
            status: ImportStatus::Idle,
            progress: 0,
            comic: None,
            cover_path: None,
        }
    }

    fn emit(&mut self, status: ImportStatus, progress: u8) {
        self.status = status;
        self.progress = self.progress.max(progress);
        let snapshot = ImportResult {
            comic: self.comic.clone(),
            ..ImportResult::new(self.status, self.progress)
        };
        (self.sink)(snapshot);
    }

    fn finish(self, result: ImportResult) -> ImportResult {
        (self.sink)(result.clone());
        result
    }

    fn complete(self, manga: Manga) -> ImportResult {
        let result = ImportResult {
            manga_id: manga.id,
            manga: Some(Arc::new(manga)),
            comic: self.comic.clone(),
            ..ImportResult::new(ImportStatus::Completed, 100)
        };
        self.finish(result)
    }

    fn abort(mut self, err: ImportError) -> ImportResult {
        if let Some(path) = self.cover_path.take() {
            remove_cover(&path);
        }

        let result = match err {
            ImportError::Cancelled => ImportResult {
                comic: self.comic.clone(),
                ..ImportResult::new(ImportStatus::Cancelled, self.progress)
            },
            err => ImportResult {
                comic: self.comic.clone(),
                ..ImportResult::failed(&err, self.status, self.progress)
            },
        };
        self.finish(result)
    }
}

impl Importer {
    /// Create an importer.
    pub fn new(
        store: Arc<dyn LibraryStore>,
        covers: CoverMaterializer,
        config: &ImportConfig,
    ) -> Self {
        Self {
            store,
            covers,
            max_archive_size: config.max_archive_size,
            limits: config.limits(),
        }
    }

    /// The persistence collaborator.
    pub fn store(&self) -> &Arc<dyn LibraryStore> {
        &self.store
    }

    /// Import one source.
    ///
    /// Every status transition is passed to `sink` in order; the returned
    /// value is the terminal snapshot (also the last one passed to `sink`).
    pub fn import(
        &self,
        source: &dyn ComicSource,
        cancel: &CancellationToken,
        sink: &mut dyn FnMut(ImportResult),
    ) -> ImportResult {
        let name = source.name();
        tracing::info!(file = %name, "Importing comic");

        let mut attempt = Attempt::new(sink);
        match self.run(source, cancel, &mut attempt) {
            Ok(manga) => {
                tracing::info!(
                    file = %name,
                    id = manga.id,
                    pages = manga.page_count,
                    cover = manga.cover_image_path.is_some(),
                    "Imported comic"
                );
                attempt.complete(manga)
            }
            Err(ImportError::Cancelled) => {
                tracing::info!(
                    file = %name,
                    stage = attempt.status.label(),
                    "Import cancelled"
                );
                attempt.abort(ImportError::Cancelled)
            }
            Err(e) => {
                tracing::warn!(
                    file = %name,
                    stage = attempt.status.label(),
                    "Import failed: {}",
                    e
                );
                attempt.abort(e)
            }
        }
    }

    fn run(
        &self,
        source: &dyn ComicSource,
        cancel: &CancellationToken,
        attempt: &mut Attempt<'_>,
    ) -> Result<Manga> {
        attempt.emit(ImportStatus::Validating, 0);
        checkpoint(cancel)?;
        let (format, size, stream) = self.validate(source)?;

        checkpoint(cancel)?;
        attempt.emit(ImportStatus::Parsing, PARSING_START);
        let parsed = self.parse(source, format, size, stream, cancel, attempt)?;

        let cover = select_cover(&parsed.entries).cloned();
        let comic = ComicInfoBuilder::new(source.name(), format, size)
            .uri(source.uri())
            .path(source.path())
            .metadata(parsed.metadata)
            .build(&parsed.entries, cover.as_ref())?;
        let comic = Arc::new(comic);
        attempt.comic = Some(Arc::clone(&comic));
        tracing::debug!(
            file = %comic.title,
            entries = comic.entries.len(),
            pages = comic.page_count,
            "Parsed archive"
        );

        checkpoint(cancel)?;
        attempt.emit(ImportStatus::ExtractingCover, PARSING_END);
        if let Some(cover) = &cover {
            let buffered = Buffered {
                tried: parsed.cover_tried,
                bytes: parsed.cover_bytes,
            };
            attempt.cover_path = self.extract_cover(source, format, cover, buffered, cancel)?;
        }

        checkpoint(cancel)?;
        attempt.emit(ImportStatus::Saving, SAVING_PROGRESS);
        let mut manga = Manga::from_comic(&comic, attempt.cover_path.clone());
        checkpoint(cancel)?;
        let id = self.store.save(&manga).map_err(|e| match e {
            ImportError::Persistence(_) => e,
            other => ImportError::Persistence(other.to_string()),
        })?;
        manga.id = Some(id);

        Ok(manga)
    }

    /// Check extension, size and format; hand back a stream positioned at byte 0.
    fn validate(
        &self,
        source: &dyn ComicSource,
    ) -> Result<(ArchiveFormat, u64, Box<dyn Read + Send>)> {
        let name = source.name();
        if !archive::is_supported_name(&name) {
            return Err(ImportError::UnsupportedFormat(format!(
                "{}: expected one of .{}",
                name,
                archive::SUPPORTED_EXTENSIONS.join(", .")
            )));
        }

        let size = source.size()?;
        if size > self.max_archive_size {
            return Err(ImportError::FileTooLarge {
                size,
                limit: self.max_archive_size,
            });
        }

        let mut stream = source.open_stream()?;
        let header = read_header(&mut stream)
            .map_err(|e| ImportError::UnreadableSource(format!("{}: {}", name, e)))?;

        let format = ArchiveFormat::detect(&name, &header);
        if format == ArchiveFormat::Unsupported {
            return Err(ImportError::UnsupportedFormat(name));
        }

        let stream: Box<dyn Read + Send> = Box::new(Cursor::new(header).chain(stream));
        Ok((format, size, stream))
    }

    fn parse(
        &self,
        source: &dyn ComicSource,
        format: ArchiveFormat,
        size: u64,
        stream: Box<dyn Read + Send>,
        cancel: &CancellationToken,
        attempt: &mut Attempt<'_>,
    ) -> Result<Parsed> {
        let consumed = Arc::new(AtomicU64::new(0));
        let stream = CountingReader {
            inner: stream,
            count: Arc::clone(&consumed),
        };
        let path = source.path();
        let mut reader = archive::open(format, Box::new(stream), path.as_deref(), self.limits)?;
        // Entry counts beat byte counts when the whole archive was read up front.
        let total = reader.len_hint();

        let mut parsed = Parsed {
            entries: Vec::new(),
            cover_tried: None,
            cover_bytes: None,
            metadata: None,
        };

        loop {
            checkpoint(cancel)?;
            let Some(entry) = reader.next_entry()? else {
                break;
            };
            let classified = ClassifiedEntry::new(entry.meta().clone());

            if classified.kind == EntryKind::CoverCandidate && parsed.cover_tried.is_none() {
                parsed.cover_tried = Some(classified.meta.index);
                parsed.cover_bytes = entry.read_to_vec(MAX_COVER_BYTES)?;
                if parsed.cover_bytes.is_none() {
                    tracing::debug!(
                        entry = %classified.name(),
                        limit = MAX_COVER_BYTES,
                        "Cover entry too large to buffer"
                    );
                }
            } else if metadata::is_comic_info(classified.name()) && parsed.metadata.is_none() {
                parsed.metadata = read_metadata(entry)?;
            } else {
                entry.skip()?;
            }
            parsed.entries.push(classified);

            let (done, whole) = match total {
                Some(total) => (parsed.entries.len() as u64, total as u64),
                None => (consumed.load(Ordering::Relaxed), size),
            };
            if whole > 0 {
                let span = u64::from(PARSING_END - PARSING_START);
                let percent = PARSING_START + (done.min(whole) * span / whole) as u8;
                if percent > attempt.progress {
                    attempt.emit(ImportStatus::Parsing, percent);
                }
            }
        }

        Ok(parsed)
    }

    /// Store the cover, recovering from anything but cancellation.
    fn extract_cover(
        &self,
        source: &dyn ComicSource,
        format: ArchiveFormat,
        cover: &ClassifiedEntry,
        buffered: Buffered,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        let bytes = match buffered.bytes {
            Some(bytes) => Ok(Some(bytes)),
            // Already streamed once and found oversized.
            None if buffered.tried == Some(cover.meta.index) => Ok(None),
            None => self.read_entry(source, format, cover.meta.index, cancel),
        };

        let stored = bytes.and_then(|bytes| match bytes {
            Some(bytes) => {
                checkpoint(cancel)?;
                self.covers.materialize(&bytes).map(|artifact| Some(artifact.path))
            }
            None => Ok(None),
        });

        match stored {
            Ok(path) => Ok(path),
            Err(ImportError::Cancelled) => Err(ImportError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    file = %source.name(),
                    entry = %cover.name(),
                    "Continuing without cover: {}",
                    e
                );
                Ok(None)
            }
        }
    }

    /// Re-open the archive and read the entry with the given ordinal.
    fn read_entry(
        &self,
        source: &dyn ComicSource,
        format: ArchiveFormat,
        index: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<u8>>> {
        let path = source.path();
        let stream = source.open_stream()?;
        let mut reader = archive::open(format, stream, path.as_deref(), self.limits)?;
        loop {
            checkpoint(cancel)?;
            let Some(entry) = reader.next_entry()? else {
                return Ok(None);
            };
            if entry.meta().index == index {
                return entry.read_to_vec(MAX_COVER_BYTES);
            }
            entry.skip()?;
        }
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ImportError::Cancelled);
    }
    Ok(())
}

fn read_header(stream: &mut dyn Read) -> std::io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    stream.take(HEADER_LEN as u64).read_to_end(&mut header)?;
    Ok(header)
}

fn read_metadata(entry: archive::ArchiveEntry<'_>) -> Result<Option<ComicMetadata>> {
    let Some(data) = entry.read_to_vec(metadata::MAX_COMIC_INFO_SIZE)? else {
        return Ok(None);
    };
    match ComicMetadata::from_bytes(&data) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) => {
            tracing::debug!("Ignoring ComicInfo.xml: {}", e);
            Ok(None)
        }
    }
}

/// What parsing left behind for cover extraction.
struct Buffered {
    tried: Option<usize>,
    bytes: Option<Vec<u8>>,
}

/// Counts bytes pulled from the archive stream.
struct CountingReader {
    inner: Box<dyn Read + Send>,
    count: Arc<AtomicU64>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}
