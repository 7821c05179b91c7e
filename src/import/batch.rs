use super::orchestrator::Importer;
use super::status::{BatchImportResult, BatchImportStatus, ImportResult};
use crate::source::ComicSource;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Imports a list of sources one after another.
///
/// A failed item is recorded and the batch moves on; only an empty input
/// fails the batch as a whole.
#[derive(Clone)]
pub struct BatchImporter {
    importer: Importer,
}

impl BatchImporter {
    /// Create a batch importer around a single-file importer.
    pub fn new(importer: Importer) -> Self {
        Self { importer }
    }

    /// Run the batch.
    ///
    /// `cancel` is checked before each item; an item already running
    /// finishes normally. Returns the final batch snapshot, which is also
    /// the last one passed to `sink`.
    pub fn import(
        &self,
        sources: &[Arc<dyn ComicSource>],
        cancel: &CancellationToken,
        sink: &mut dyn FnMut(BatchImportResult),
    ) -> BatchImportResult {
        let total = sources.len();
        if total == 0 {
            let result = BatchImportResult {
                status: BatchImportStatus::Failed,
                current_index: 0,
                total: 0,
                current_file: None,
                current: None,
                results: Vec::new(),
                error: Some("No files to import".to_string()),
            };
            sink(result.clone());
            return result;
        }

        tracing::info!(total, "Starting batch import");
        let mut results: Vec<ImportResult> = Vec::with_capacity(total);

        for (i, source) in sources.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(done = results.len(), total, "Batch import cancelled");
                let result = BatchImportResult {
                    status: BatchImportStatus::Cancelled,
                    current_index: results.len(),
                    total,
                    current_file: None,
                    current: None,
                    results,
                    error: None,
                };
                sink(result.clone());
                return result;
            }

            let index = i + 1;
            let name = source.name();
            let item_cancel = CancellationToken::new();

            let outcome = {
                let done = &results;
                let mut forward = |result: ImportResult| {
                    if result.status.is_terminal() {
                        return;
                    }
                    sink(BatchImportResult {
                        status: BatchImportStatus::Processing,
                        current_index: index,
                        total,
                        current_file: Some(name.clone()),
                        current: Some(result),
                        results: done.clone(),
                        error: None,
                    });
                };
                self.importer.import(source.as_ref(), &item_cancel, &mut forward)
            };

            results.push(outcome.clone());
            sink(BatchImportResult {
                status: BatchImportStatus::ItemCompleted,
                current_index: index,
                total,
                current_file: Some(name),
                current: Some(outcome),
                results: results.clone(),
                error: None,
            });
        }

        let result = BatchImportResult {
            status: BatchImportStatus::Completed,
            current_index: total,
            total,
            current_file: None,
            current: None,
            results,
            error: None,
        };
        tracing::info!(
            total,
            succeeded = result.succeeded(),
            failed = result.failed(),
            "Batch import finished"
        );
        sink(result.clone());
        result
    }
}
