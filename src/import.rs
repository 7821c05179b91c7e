//! The import pipeline.
//!
//! [`Importer`] moves one source through
//! `Validating → Parsing → ExtractingCover → Saving → Completed`, reporting
//! each transition as an [`ImportResult`]. [`BatchImporter`] runs many
//! sources sequentially and [`ImportService`] moves either onto the
//! blocking thread pool, streaming events over a channel and mirroring
//! them into an [`ImportProgressState`].

mod batch;
mod orchestrator;
mod progress;
mod service;
mod status;

pub use batch::BatchImporter;
pub use orchestrator::{Importer, MAX_COVER_BYTES};
pub use progress::{BatchContext, ImportProgress, ImportProgressState};
pub use service::{ImportHandle, ImportService};
pub use status::{BatchImportResult, BatchImportStatus, ImportResult, ImportStatus};
