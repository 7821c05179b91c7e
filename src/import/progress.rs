use super::status::{BatchImportResult, BatchImportStatus, ImportResult, ImportStatus};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Batch position attached to an [`ImportProgress`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchContext {
    /// Batch stage.
    pub status: BatchImportStatus,
    /// 1-based position of the current item.
    pub current_index: usize,
    /// Number of items.
    pub total: usize,
    /// Finished items that completed.
    pub succeeded: usize,
    /// Finished items that did not complete.
    pub failed: usize,
}

/// What a UI needs to render the running import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    /// Stage of the current item.
    pub status: ImportStatus,
    /// Progress of the current item (0-100).
    pub progress: u8,
    /// Library id of the current item, once saved.
    pub manga_id: Option<i64>,
    /// Error of the current item or batch.
    pub error: Option<String>,
    /// File being imported.
    pub current_file: Option<String>,
    /// Batch position, for batch imports.
    pub batch: Option<BatchContext>,
}

impl ImportProgress {
    /// Nothing running.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Progress of a single import.
    pub fn from_result(result: &ImportResult, file_name: Option<&str>) -> Self {
        Self {
            status: result.status,
            progress: result.progress,
            manga_id: result.manga_id,
            error: result.error.clone(),
            current_file: file_name.map(str::to_string),
            batch: None,
        }
    }

    /// Progress of a batch import.
    pub fn from_batch(batch: &BatchImportResult) -> Self {
        let mut progress = match &batch.current {
            Some(current) => Self::from_result(current, batch.current_file.as_deref()),
            None => Self {
                status: match batch.status {
                    BatchImportStatus::Completed => ImportStatus::Completed,
                    BatchImportStatus::Failed => ImportStatus::Failed,
                    BatchImportStatus::Cancelled => ImportStatus::Cancelled,
                    _ => ImportStatus::Idle,
                },
                progress: if batch.status == BatchImportStatus::Completed { 100 } else { 0 },
                ..Self::default()
            },
        };
        if batch.error.is_some() {
            progress.error = batch.error.clone();
        }
        progress.batch = Some(BatchContext {
            status: batch.status,
            current_index: batch.current_index,
            total: batch.total,
            succeeded: batch.succeeded(),
            failed: batch.failed(),
        });
        progress
    }
}

/// Last-value holder of the import progress, shared by clones.
///
/// One writer pushes snapshots; any number of readers poll
/// [`ImportProgressState::current`] or wait on a subscription.
#[derive(Debug, Clone)]
pub struct ImportProgressState {
    tx: Arc<watch::Sender<ImportProgress>>,
}

impl Default for ImportProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportProgressState {
    /// Create a holder starting at `Idle`.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ImportProgress::idle());
        Self { tx: Arc::new(tx) }
    }

    /// Replace the held snapshot.
    pub fn push(&self, progress: ImportProgress) {
        self.tx.send_replace(progress);
    }

    /// Latest snapshot.
    pub fn current(&self) -> ImportProgress {
        self.tx.borrow().clone()
    }

    /// Return to `Idle`.
    pub fn reset(&self) {
        self.tx.send_replace(ImportProgress::idle());
    }

    /// Receive change notifications.
    pub fn subscribe(&self) -> watch::Receiver<ImportProgress> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_keeps_last_value() {
        let state = ImportProgressState::new();
        assert_eq!(state.current(), ImportProgress::idle());

        state.push(ImportProgress::from_result(
            &ImportResult::new(ImportStatus::Parsing, 20),
            Some("a.cbz"),
        ));
        state.push(ImportProgress::from_result(
            &ImportResult::new(ImportStatus::Saving, 80),
            Some("a.cbz"),
        ));

        let current = state.current();
        assert_eq!(current.status, ImportStatus::Saving);
        assert_eq!(current.current_file.as_deref(), Some("a.cbz"));

        state.reset();
        assert_eq!(state.current().status, ImportStatus::Idle);
    }

    #[test]
    fn clones_share_the_same_state() {
        let writer = ImportProgressState::new();
        let reader = writer.clone();
        writer.push(ImportProgress::from_result(
            &ImportResult::new(ImportStatus::Validating, 0),
            None,
        ));
        assert_eq!(reader.current().status, ImportStatus::Validating);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let state = ImportProgressState::new();
        let mut rx = state.subscribe();
        state.push(ImportProgress::from_result(
            &ImportResult::new(ImportStatus::Completed, 100),
            None,
        ));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().progress, 100);
    }

    #[test]
    fn batch_snapshot_carries_counts() {
        let batch = BatchImportResult {
            status: BatchImportStatus::ItemCompleted,
            current_index: 2,
            total: 3,
            current_file: Some("b.cbz".into()),
            current: Some(ImportResult::new(ImportStatus::Failed, 10)),
            results: vec![
                ImportResult::new(ImportStatus::Completed, 100),
                ImportResult::new(ImportStatus::Failed, 10),
            ],
            error: None,
        };
        let progress = ImportProgress::from_batch(&batch);
        let context = progress.batch.unwrap();
        assert_eq!(context.current_index, 2);
        assert_eq!((context.succeeded, context.failed), (1, 1));
        assert_eq!(progress.current_file.as_deref(), Some("b.cbz"));
    }
}
