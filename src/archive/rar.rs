//! RAR reader backed by libunrar (RAR 1.5 through 5.0 archives, every
//! compression method the reference decoder knows).
//!
//! libunrar opens archives by path and decodes one whole entry per call.
//! Entries are still handed out in archive order and must be drained or
//! skipped in turn; a decoded entry is held in memory only until it has
//! been read. Encrypted entries and multi-volume sets are rejected when
//! reached.

use super::{ArchiveEntry, ArchiveLimits, Budget, EntryBody, EntryMeta, EntryReader};
use crate::error::{ImportError, Result};
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::io::{self, Cursor, Read};
use std::path::Path;
use tempfile::NamedTempFile;
use unrar::{Archive, CursorBeforeFile, CursorBeforeHeader, OpenArchive, Process};

type Headers = OpenArchive<Process, CursorBeforeHeader>;
type Pending = OpenArchive<Process, CursorBeforeFile>;

enum State {
    Ready(Headers),
    Open(String),
    Poisoned,
    Finished,
}

/// Forward-only RAR entry reader.
pub struct RarReader {
    state: State,
    budget: Budget,
    len: Option<usize>,
    /// Spooled copy of a path-less source, removed on drop.
    _spool: Option<NamedTempFile>,
}

impl RarReader {
    /// Open a RAR archive on disk.
    pub fn open(path: &Path, limits: ArchiveLimits) -> Result<Self> {
        let len = Archive::new(path).open_for_listing().ok().map(|listing| {
            listing
                .filter_map(|header| header.ok())
                .filter(|header| !header.is_directory())
                .count()
        });

        let headers = Archive::new(path)
            .open_for_processing()
            .map_err(|e| ImportError::ArchiveOpen(format!("not a readable RAR archive: {}", e)))?;
        tracing::debug!(path = %path.display(), entries = ?len, "Opened RAR archive");

        Ok(Self {
            state: State::Ready(headers),
            budget: Budget::new(limits),
            len,
            _spool: None,
        })
    }

    /// Copy a stream to a temporary file and open that.
    pub fn spool(mut source: impl Read, limits: ArchiveLimits) -> Result<Self> {
        let mut spool = tempfile::Builder::new()
            .prefix("comic-import-")
            .suffix(".rar")
            .tempfile()?;
        let copied = io::copy(&mut source, spool.as_file_mut())?;
        tracing::debug!(bytes = copied, "Spooled RAR archive to a temporary file");

        let mut reader = Self::open(spool.path(), limits)?;
        reader._spool = Some(spool);
        Ok(reader)
    }
}

impl EntryReader for RarReader {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_>>> {
        loop {
            let headers = match std::mem::replace(&mut self.state, State::Poisoned) {
                State::Ready(headers) => headers,
                State::Finished => {
                    self.state = State::Finished;
                    return Ok(None);
                }
                State::Poisoned => {
                    return Err(ImportError::ArchiveOpen(
                        "archive is unusable after an earlier error".into(),
                    ));
                }
                State::Open(name) => {
                    let err = ImportError::Sequencing(format!(
                        "entry {} was neither drained nor skipped",
                        name
                    ));
                    self.state = State::Open(name);
                    return Err(err);
                }
            };

            let pending = match headers.read_header() {
                Ok(Some(pending)) => pending,
                Ok(None) => {
                    self.state = State::Finished;
                    return Ok(None);
                }
                Err(e) => {
                    return Err(ImportError::ArchiveOpen(format!(
                        "cannot read RAR header: {}",
                        e
                    )));
                }
            };

            let header = pending.entry();
            let name = header.filename.to_string_lossy().replace('\\', "/");
            let size = header.unpacked_size;
            let modified = dos_time(header.file_time);
            let (directory, encrypted, split) =
                (header.is_directory(), header.is_encrypted(), header.is_split());

            if directory {
                tracing::trace!(entry = %name, "Skipping directory entry");
                let headers = pending.skip().map_err(|e| entry_error(&name, e))?;
                self.state = State::Ready(headers);
                continue;
            }
            if encrypted {
                return Err(ImportError::ArchiveOpen(format!(
                    "entry {} is encrypted",
                    name
                )));
            }
            if split {
                return Err(ImportError::ArchiveOpen(format!(
                    "entry {} continues in another volume",
                    name
                )));
            }

            let index = self.budget.admit(size)?;
            let meta = EntryMeta {
                name: name.clone(),
                size,
                compressed_size: 0,
                modified,
                index,
            };
            self.state = State::Open(name.clone());

            let body = RarBody {
                slot: &mut self.state,
                name,
                size,
                pending: Some(pending),
                decoded: None,
            };
            return Ok(Some(ArchiveEntry::new(meta, Box::new(body))));
        }
    }

    fn len_hint(&self) -> Option<usize> {
        self.len
    }
}

/// The entry last yielded, decoded on first read.
struct RarBody<'a> {
    slot: &'a mut State,
    name: String,
    size: u64,
    pending: Option<Pending>,
    decoded: Option<(Cursor<Vec<u8>>, Headers)>,
}

impl RarBody<'_> {
    fn decode(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let (data, rest) = pending.read().map_err(|e| entry_error(&self.name, e))?;
        if data.len() as u64 != self.size {
            return Err(ImportError::ArchiveOpen(format!(
                "entry {}: expected {} bytes, decoded {}",
                self.name,
                self.size,
                data.len()
            )));
        }
        self.decoded = Some((Cursor::new(data), rest));
        Ok(())
    }

    /// Hand the archive back to the reader once the entry is used up.
    fn release(&mut self) {
        if let Some((_, rest)) = self.decoded.take() {
            *self.slot = State::Ready(rest);
        }
    }
}

impl EntryBody for RarBody<'_> {
    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Err(e) = self.decode() {
            *self.slot = State::Poisoned;
            return Err(e.into_io());
        }

        let Some((data, _)) = self.decoded.as_mut() else {
            return Ok(0);
        };
        let n = data.read(buf)?;
        if data.position() >= data.get_ref().len() as u64 {
            self.release();
        }
        Ok(n)
    }

    fn skip_body(&mut self) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            match pending.skip() {
                Ok(rest) => *self.slot = State::Ready(rest),
                Err(e) => {
                    *self.slot = State::Poisoned;
                    return Err(entry_error(&self.name, e));
                }
            }
        }
        self.release();
        Ok(())
    }
}

fn entry_error(name: &str, err: impl Display) -> ImportError {
    ImportError::ArchiveOpen(format!("entry {}: {}", name, err))
}

/// libunrar reports modification times in MS-DOS layout.
fn dos_time(packed: u32) -> Option<DateTime<Utc>> {
    super::dos_datetime((packed >> 16) as u16, (packed & 0xffff) as u16)
}
