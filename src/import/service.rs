use super::batch::BatchImporter;
use super::orchestrator::Importer;
use super::progress::{ImportProgress, ImportProgressState};
use super::status::{BatchImportResult, ImportResult};
use crate::config::Config;
use crate::cover::CoverMaterializer;
use crate::db::LibraryStore;
use crate::error::{ImportError, Result};
use crate::source::{self, ComicSource, FileSource};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Runs imports on the blocking thread pool and streams their events.
///
/// Every event is also pushed to the shared [`ImportProgressState`].
#[derive(Clone)]
pub struct ImportService {
    importer: Importer,
    progress: ImportProgressState,
    skip_existing: bool,
}

/// A running import: its event stream, cancellation and final outcome.
pub struct ImportHandle<T> {
    events: mpsc::UnboundedReceiver<T>,
    cancel: CancellationToken,
    task: JoinHandle<T>,
}

impl<T> ImportHandle<T> {
    /// Next event, or `None` once the import has finished.
    pub async fn next(&mut self) -> Option<T> {
        self.events.recv().await
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observed by the running import.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the terminal outcome.
    pub async fn finish(self) -> Result<T> {
        self.task.await.map_err(|e| {
            ImportError::Io(std::io::Error::other(format!("Import task failed: {}", e)))
        })
    }
}

impl ImportService {
    /// Create a service around an importer and the shared progress holder.
    pub fn new(importer: Importer, progress: ImportProgressState, skip_existing: bool) -> Self {
        Self {
            importer,
            progress,
            skip_existing,
        }
    }

    /// Wire a service from configuration.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn LibraryStore>,
        progress: ImportProgressState,
    ) -> Self {
        let covers = CoverMaterializer::from_config(&config.cover);
        let importer = Importer::new(store, covers, &config.import);
        Self::new(importer, progress, config.import.skip_existing)
    }

    /// Shared progress holder.
    pub fn progress(&self) -> &ImportProgressState {
        &self.progress
    }

    /// Import a single source.
    pub fn import(&self, source: Arc<dyn ComicSource>) -> ImportHandle<ImportResult> {
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let importer = self.importer.clone();
        let progress = self.progress.clone();
        let token = cancel.clone();

        let task = tokio::task::spawn_blocking(move || {
            let name = source.name();
            let mut sink = |result: ImportResult| {
                progress.push(ImportProgress::from_result(&result, Some(&name)));
                // Receiver may be gone; the outcome is still returned by the task.
                let _ = tx.send(result);
            };
            importer.import(source.as_ref(), &token, &mut sink)
        });

        ImportHandle {
            events,
            cancel,
            task,
        }
    }

    /// Import several sources sequentially.
    pub fn import_batch(
        &self,
        sources: Vec<Arc<dyn ComicSource>>,
    ) -> ImportHandle<BatchImportResult> {
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let batch = BatchImporter::new(self.importer.clone());
        let progress = self.progress.clone();
        let token = cancel.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut sink = |result: BatchImportResult| {
                progress.push(ImportProgress::from_batch(&result));
                let _ = tx.send(result);
            };
            batch.import(&sources, &token, &mut sink)
        });

        ImportHandle {
            events,
            cancel,
            task,
        }
    }

    /// Import every supported file below `dir` as one batch.
    pub fn import_directory(&self, dir: &Path) -> Result<ImportHandle<BatchImportResult>> {
        let sources = self.directory_sources(dir)?;
        Ok(self.import_batch(sources))
    }

    /// Supported files below `dir` in natural order, as sources.
    ///
    /// Files already in the library are left out when `skip_existing` is set.
    pub fn directory_sources(&self, dir: &Path) -> Result<Vec<Arc<dyn ComicSource>>> {
        let files = source::scan_directory(dir)?;
        let found = files.len();

        let mut sources: Vec<Arc<dyn ComicSource>> = Vec::with_capacity(found);
        for path in files {
            let file = FileSource::new(path);
            if self.skip_existing && self.is_stored(&file) {
                tracing::debug!(file = %file.name(), "Already in library, skipping");
                continue;
            }
            sources.push(Arc::new(file));
        }

        tracing::info!(
            dir = %dir.display(),
            found,
            queued = sources.len(),
            "Scanned directory for import"
        );
        Ok(sources)
    }

    fn is_stored(&self, file: &FileSource) -> bool {
        match self.importer.store().contains(&file.uri()) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(file = %file.name(), "Library lookup failed: {}", e);
                false
            }
        }
    }
}
