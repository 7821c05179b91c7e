use crate::error::{ErrorKind, ImportError};
use crate::library::{ComicInfo, Manga};
use serde::Serialize;
use std::sync::Arc;

/// Stage of one import attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Nothing running.
    #[default]
    Idle,
    /// Checking the source and its format.
    Validating,
    /// Streaming and classifying entries.
    Parsing,
    /// Decoding and storing the cover.
    ExtractingCover,
    /// Persisting the library entry.
    Saving,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Stopped on request.
    Cancelled,
}

impl ImportStatus {
    /// Whether no further transition can follow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStatus::Completed | ImportStatus::Failed | ImportStatus::Cancelled
        )
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            ImportStatus::Idle => "idle",
            ImportStatus::Validating => "validating",
            ImportStatus::Parsing => "parsing",
            ImportStatus::ExtractingCover => "extracting cover",
            ImportStatus::Saving => "saving",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
            ImportStatus::Cancelled => "cancelled",
        }
    }
}

/// Snapshot of one import attempt, emitted at every transition.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    /// Current stage.
    pub status: ImportStatus,
    /// Progress percentage (0-100).
    pub progress: u8,
    /// Library id, once saved.
    pub manga_id: Option<i64>,
    /// Saved library entity, once saved.
    pub manga: Option<Arc<Manga>>,
    /// Parsed description, from the end of parsing on.
    pub comic: Option<Arc<ComicInfo>>,
    /// Error message, only when failed.
    pub error: Option<String>,
    /// Error kind, only when failed.
    pub error_kind: Option<ErrorKind>,
    /// Stage the failure happened in, only when failed.
    pub failed_at: Option<ImportStatus>,
}

impl ImportResult {
    /// A plain status snapshot.
    pub fn new(status: ImportStatus, progress: u8) -> Self {
        Self {
            status,
            progress,
            ..Default::default()
        }
    }

    /// A failed snapshot carrying `err`.
    pub fn failed(err: &ImportError, failed_at: ImportStatus, progress: u8) -> Self {
        Self {
            status: ImportStatus::Failed,
            progress,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            failed_at: Some(failed_at),
            ..Default::default()
        }
    }

    /// Whether the attempt completed successfully.
    pub fn is_success(&self) -> bool {
        self.status == ImportStatus::Completed
    }
}

/// Stage of a batch import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchImportStatus {
    /// An item is in progress.
    Processing,
    /// An item reached a terminal state.
    ItemCompleted,
    /// Every item was attempted.
    Completed,
    /// The batch could not run at all.
    Failed,
    /// Stopped before the last item.
    Cancelled,
}

/// Snapshot of a batch import.
#[derive(Debug, Clone, Serialize)]
pub struct BatchImportResult {
    /// Batch stage.
    pub status: BatchImportStatus,
    /// 1-based position of the current item.
    pub current_index: usize,
    /// Number of items in the batch.
    pub total: usize,
    /// File name of the current item.
    pub current_file: Option<String>,
    /// Latest snapshot of the current item.
    pub current: Option<ImportResult>,
    /// Terminal results of finished items, in order.
    pub results: Vec<ImportResult>,
    /// Batch-level error message, only when failed.
    pub error: Option<String>,
}

impl BatchImportResult {
    /// Number of finished items that completed.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of finished items that did not complete.
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_are_ordered_and_terminal_ones_flagged() {
        assert!(ImportStatus::Validating < ImportStatus::Parsing);
        assert!(ImportStatus::ExtractingCover < ImportStatus::Saving);
        assert!(ImportStatus::Cancelled.is_terminal());
        assert!(!ImportStatus::Saving.is_terminal());
    }

    #[test]
    fn failed_result_carries_diagnostics() {
        let err = ImportError::ArchiveOpen("bad header".into());
        let result = ImportResult::failed(&err, ImportStatus::Parsing, 10);
        assert_eq!(result.status, ImportStatus::Failed);
        assert_eq!(result.error_kind, Some(ErrorKind::ArchiveOpen));
        assert_eq!(result.failed_at, Some(ImportStatus::Parsing));
        assert!(result.error.unwrap().contains("bad header"));
        assert!(result.manga_id.is_none());
    }

    #[test]
    fn serializes_with_snake_case_tags() {
        let result = ImportResult::new(ImportStatus::ExtractingCover, 50);
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["status"], "extracting_cover");
        assert_eq!(json["progress"], 50);
    }
}
