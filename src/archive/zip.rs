//! Streaming ZIP reader over local file headers.
//!
//! The central directory at the end of the file is never consulted: entries
//! are discovered from their local headers as the stream advances and are
//! decoded by [`zip::read::read_zipfile_from_stream`]. That function refuses
//! entries whose sizes are only written in a trailing data descriptor, so
//! those are inflated here until the deflate stream marks its own end.

use super::{ArchiveEntry, ArchiveLimits, Budget, EntryBody, EntryMeta, EntryReader};
use crate::error::{ImportError, Result};
use flate2::{Crc, Decompress, FlushDecompress, Status};
use std::io::{self, BufRead, BufReader, Read};

const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
const END_OF_CENTRAL_DIR_SIG: u32 = 0x0605_4b50;
const ZIP64_END_OF_CENTRAL_DIR_SIG: u32 = 0x0606_4b50;
const DATA_DESCRIPTOR_SIG: u32 = 0x0807_4b50;
const ZIP64_EXTRA_ID: u16 = 0x0001;

const FLAG_ENCRYPTED: u16 = 1 << 0;
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
const METHOD_DEFLATED: u16 = 8;

const LOCAL_HEADER_LEN: usize = 30;
const BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    Open(String),
    Poisoned,
    Finished,
}

/// A byte stream that can give back a prefix it already handed out, so a
/// local header can be inspected before the `zip` crate parses it.
struct Rewind<R> {
    inner: R,
    head: Vec<u8>,
    pos: usize,
}

impl<R: Read> Rewind<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            head: Vec::new(),
            pos: 0,
        }
    }

    /// Queue `bytes` to be read again before the rest of the stream.
    fn unread(&mut self, bytes: &[u8]) {
        let mut head = bytes.to_vec();
        head.extend_from_slice(&self.head[self.pos..]);
        self.head = head;
        self.pos = 0;
    }

    fn has_pending(&self) -> bool {
        self.pos < self.head.len()
    }
}

impl<R: Read> Read for Rewind<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.has_pending() {
            let n = (&self.head[self.pos..]).read(buf)?;
            self.pos += n;
            return Ok(n);
        }
        self.inner.read(buf)
    }
}

/// Fixed part and name of a local file header, read ahead of the decoder.
struct Lookahead {
    raw: Vec<u8>,
    flags: u16,
    method: u16,
    mod_time: u16,
    mod_date: u16,
    size: u64,
    extra_len: usize,
    name: String,
}

impl Lookahead {
    fn uses_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Forward-only ZIP entry reader.
pub struct ZipReader<R: Read> {
    src: Rewind<BufReader<R>>,
    budget: Budget,
    state: State,
}

impl<R: Read> ZipReader<R> {
    /// Start reading a ZIP stream.
    ///
    /// Fails with [`ImportError::ArchiveOpen`] unless the stream starts
    /// with a local file header (or is an empty archive).
    pub fn new(inner: R, limits: ArchiveLimits) -> Result<Self> {
        let mut src = Rewind::new(BufReader::with_capacity(BUFFER_SIZE, inner));
        let mut sig = [0u8; 4];
        src.read_exact(&mut sig).map_err(|_| {
            ImportError::ArchiveOpen("stream is too short to be a ZIP archive".into())
        })?;
        let found = u32::from_le_bytes(sig);
        if found != LOCAL_HEADER_SIG && found != END_OF_CENTRAL_DIR_SIG {
            return Err(ImportError::ArchiveOpen(format!(
                "missing ZIP local file header (found 0x{:08x})",
                found
            )));
        }
        src.unread(&sig);

        Ok(Self {
            src,
            budget: Budget::new(limits),
            state: State::Idle,
        })
    }

    fn poison(&mut self, err: ImportError) -> ImportError {
        self.state = State::Poisoned;
        err
    }

    /// Read the next local header and name, or `None` at the central directory.
    fn lookahead(&mut self) -> Result<Option<Lookahead>> {
        let mut raw = vec![0u8; LOCAL_HEADER_LEN];
        self.src.read_exact(&mut raw[..4]).map_err(|_| {
            ImportError::ArchiveOpen("truncated archive: central directory is missing".into())
        })?;

        match le_u32(&raw[0..4]) {
            LOCAL_HEADER_SIG => {}
            CENTRAL_HEADER_SIG | END_OF_CENTRAL_DIR_SIG | ZIP64_END_OF_CENTRAL_DIR_SIG => {
                return Ok(None);
            }
            other => {
                return Err(ImportError::ArchiveOpen(format!(
                    "unexpected record signature 0x{:08x}",
                    other
                )));
            }
        }

        self.src
            .read_exact(&mut raw[4..])
            .map_err(ImportError::from_archive_io)?;
        let name_len = usize::from(le_u16(&raw[26..28]));
        raw.resize(LOCAL_HEADER_LEN + name_len, 0);
        self.src
            .read_exact(&mut raw[LOCAL_HEADER_LEN..])
            .map_err(ImportError::from_archive_io)?;

        Ok(Some(Lookahead {
            flags: le_u16(&raw[6..8]),
            method: le_u16(&raw[8..10]),
            mod_time: le_u16(&raw[10..12]),
            mod_date: le_u16(&raw[12..14]),
            size: u64::from(le_u32(&raw[22..26])),
            extra_len: usize::from(le_u16(&raw[28..30])),
            name: String::from_utf8_lossy(&raw[LOCAL_HEADER_LEN..]).replace('\\', "/"),
            raw,
        }))
    }

    /// Hand the header back to the `zip` crate and wrap the entry it decodes.
    fn decoded_entry(&mut self, header: Lookahead) -> Result<ArchiveEntry<'_>> {
        let Self { src, budget, state } = self;
        src.unread(&header.raw);

        let file = match zip::read::read_zipfile_from_stream(src) {
            Ok(Some(file)) => file,
            Ok(None) => {
                *state = State::Poisoned;
                return Err(ImportError::ArchiveOpen(format!(
                    "entry {}: local header vanished",
                    header.name
                )));
            }
            Err(e) => {
                *state = State::Poisoned;
                return Err(ImportError::ArchiveOpen(format!(
                    "entry {}: {}",
                    header.name, e
                )));
            }
        };

        let index = match budget.admit(file.size()) {
            Ok(index) => index,
            Err(e) => {
                *state = State::Poisoned;
                return Err(e);
            }
        };

        let name = file.name().replace('\\', "/");
        let meta = EntryMeta {
            name: name.clone(),
            size: file.size(),
            compressed_size: file.compressed_size(),
            modified: file
                .last_modified()
                .and_then(|dt| super::dos_datetime(dt.datepart(), dt.timepart())),
            index,
        };
        *state = State::Open(name.clone());

        let body = DecodedBody {
            size: meta.size,
            file: Some(file),
            state,
            name,
            produced: 0,
        };
        Ok(ArchiveEntry::new(meta, Box::new(body)))
    }

    /// Take over an entry whose sizes follow its data.
    fn descriptor_entry(&mut self, header: Lookahead) -> Result<ArchiveEntry<'_>> {
        let index = match self.budget.admit(0) {
            Ok(index) => index,
            Err(e) => return Err(self.poison(e)),
        };
        let meta = EntryMeta {
            name: header.name.clone(),
            size: header.size,
            compressed_size: 0,
            modified: super::dos_datetime(header.mod_date, header.mod_time),
            index,
        };
        let body = self.descriptor_body(header)?;
        Ok(ArchiveEntry::new(meta, Box::new(body)))
    }

    fn descriptor_body(&mut self, header: Lookahead) -> Result<DescriptorBody<'_, R>> {
        if header.flags & FLAG_ENCRYPTED != 0 || header.method != METHOD_DEFLATED {
            return Err(self.poison(ImportError::ArchiveOpen(format!(
                "entry {}: length is only recorded after its data",
                header.name
            ))));
        }

        let mut extra = vec![0u8; header.extra_len];
        if let Err(e) = self.src.read_exact(&mut extra) {
            return Err(self.poison(ImportError::from_archive_io(e)));
        }
        self.state = State::Open(header.name.clone());

        let Self { src, budget, state } = self;
        Ok(DescriptorBody {
            src: &mut src.inner,
            budget,
            state,
            name: header.name,
            zip64: has_zip64_field(&extra),
            inflater: Decompress::new(false),
            crc: Crc::new(),
            produced: 0,
            done: false,
        })
    }

    /// Move past a directory entry.
    fn skip_directory(&mut self, header: Lookahead) -> Result<()> {
        tracing::trace!(entry = %header.name, "Skipping directory entry");
        if header.uses_descriptor() {
            return self.descriptor_body(header)?.skip_body();
        }
        self.src.unread(&header.raw);
        let dir = zip::read::read_zipfile_from_stream(&mut self.src)?;
        drop(dir);
        Ok(())
    }
}

impl<R: Read> EntryReader for ZipReader<R> {
    fn next_entry(&mut self) -> Result<Option<ArchiveEntry<'_>>> {
        loop {
            match &self.state {
                State::Poisoned => {
                    return Err(ImportError::ArchiveOpen(
                        "archive stream is unusable after an earlier error".into(),
                    ));
                }
                State::Finished => return Ok(None),
                State::Open(name) => {
                    return Err(ImportError::Sequencing(format!(
                        "entry {} was neither drained nor skipped",
                        name
                    )));
                }
                State::Idle => {}
            }

            let header = match self.lookahead() {
                Ok(Some(header)) => header,
                Ok(None) => {
                    self.state = State::Finished;
                    return Ok(None);
                }
                Err(e) => return Err(self.poison(e)),
            };

            if header.is_dir() {
                if let Err(e) = self.skip_directory(header) {
                    return Err(self.poison(e));
                }
                continue;
            }

            if header.uses_descriptor() {
                return self.descriptor_entry(header).map(Some);
            }
            return self.decoded_entry(header).map(Some);
        }
    }
}

/// An entry decoded by the `zip` crate.
struct DecodedBody<'a, R: Read> {
    file: Option<zip::read::ZipFile<'a, Rewind<BufReader<R>>>>,
    state: &'a mut State,
    name: String,
    size: u64,
    produced: u64,
}

impl<R: Read> DecodedBody<'_, R> {
    fn decode(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };
        let n = file
            .read(buf)
            .map_err(|e| invalid_data(format!("entry {}: {}", self.name, e)))?;
        self.produced += n as u64;

        if self.produced > self.size {
            return Err(invalid_data(format!(
                "entry {} inflates past its declared size of {} bytes",
                self.name, self.size
            )));
        }
        if n == 0 && self.produced != self.size {
            return Err(invalid_data(format!(
                "entry {}: expected {} bytes, decoded {}",
                self.name, self.size, self.produced
            )));
        }
        if n == 0 || self.produced == self.size {
            // Hit the end now so the checksum is verified and the entry
            // counts as drained even when the caller stops at `size` bytes.
            let mut tail = [0u8; 1];
            if file
                .read(&mut tail)
                .map_err(|e| invalid_data(format!("entry {}: {}", self.name, e)))?
                > 0
            {
                return Err(invalid_data(format!(
                    "entry {} inflates past its declared size of {} bytes",
                    self.name, self.size
                )));
            }
            self.file = None;
            *self.state = State::Idle;
        }
        Ok(n)
    }
}

impl<R: Read> EntryBody for DecodedBody<'_, R> {
    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let result = self.decode(buf);
        if result.is_err() {
            self.file = None;
            *self.state = State::Poisoned;
        }
        result
    }

    fn skip_body(&mut self) -> Result<()> {
        // Dropping a streamed `ZipFile` discards its remaining raw bytes.
        if self.file.take().is_some() {
            *self.state = State::Idle;
        }
        Ok(())
    }
}

/// A deflate entry followed by a data descriptor.
struct DescriptorBody<'a, R: Read> {
    src: &'a mut BufReader<R>,
    budget: &'a mut Budget,
    state: &'a mut State,
    name: String,
    zip64: bool,
    inflater: Decompress,
    crc: Crc,
    produced: u64,
    done: bool,
}

impl<R: Read> DescriptorBody<'_, R> {
    fn inflate(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let (status, consumed, produced, exhausted) = {
                let input = self.src.fill_buf()?;
                let in_before = self.inflater.total_in();
                let out_before = self.inflater.total_out();
                let status = self
                    .inflater
                    .decompress(input, buf, FlushDecompress::None)
                    .map_err(|e| invalid_data(format!("entry {}: {}", self.name, e)))?;
                let consumed = (self.inflater.total_in() - in_before) as usize;
                let produced = (self.inflater.total_out() - out_before) as usize;
                (status, consumed, produced, input.is_empty())
            };

            self.src.consume(consumed);
            self.crc.update(&buf[..produced]);
            self.produced += produced as u64;
            self.budget
                .charge(produced as u64)
                .map_err(ImportError::into_io)?;

            if status == Status::StreamEnd {
                self.finish()?;
                return Ok(produced);
            }
            if produced > 0 {
                return Ok(produced);
            }
            if exhausted {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("entry {}: deflate stream is truncated", self.name),
                ));
            }
            if consumed == 0 {
                return Err(invalid_data(format!(
                    "entry {}: deflate stream made no progress",
                    self.name
                )));
            }
        }
    }

    /// Read the data descriptor and check the entry against it.
    fn finish(&mut self) -> io::Result<()> {
        let first = read_u32(self.src)?;
        let crc = if first == DATA_DESCRIPTOR_SIG {
            read_u32(self.src)?
        } else {
            first
        };
        let size = if self.zip64 {
            let _compressed = read_u64(self.src)?;
            read_u64(self.src)?
        } else {
            let _compressed = read_u32(self.src)?;
            u64::from(read_u32(self.src)?)
        };

        if crc != self.crc.sum() {
            return Err(invalid_data(format!("entry {}: CRC-32 mismatch", self.name)));
        }
        if size != self.produced {
            return Err(invalid_data(format!(
                "entry {}: expected {} bytes, decoded {}",
                self.name, size, self.produced
            )));
        }

        self.done = true;
        *self.state = State::Idle;
        Ok(())
    }
}

impl<R: Read> EntryBody for DescriptorBody<'_, R> {
    fn read_body(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        let result = self.inflate(buf);
        if result.is_err() {
            self.done = true;
            *self.state = State::Poisoned;
        }
        result
    }

    fn skip_body(&mut self) -> Result<()> {
        // Only the deflate stream knows where this entry ends.
        let mut scratch = vec![0u8; BUFFER_SIZE];
        while self
            .read_body(&mut scratch)
            .map_err(ImportError::from_archive_io)?
            > 0
        {}
        Ok(())
    }
}

fn has_zip64_field(mut extra: &[u8]) -> bool {
    while extra.len() >= 4 {
        let id = le_u16(&extra[0..2]);
        if id == ZIP64_EXTRA_ID {
            return true;
        }
        let len = usize::from(le_u16(&extra[2..4])).min(extra.len() - 4);
        extra = &extra[4 + len..];
    }
    false
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn read_u32(src: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    src.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(src: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    src.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn le_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{ZipSpec, zip_bytes, zip_with_data_descriptor};
    use std::io::Cursor;

    fn find(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap()
    }

    fn reader(data: Vec<u8>) -> ZipReader<Cursor<Vec<u8>>> {
        ZipReader::new(Cursor::new(data), ArchiveLimits::default()).unwrap()
    }

    fn drain_all(reader: &mut ZipReader<Cursor<Vec<u8>>>) -> Vec<(EntryMeta, Vec<u8>)> {
        let mut out = Vec::new();
        while let Some(mut entry) = reader.next_entry().unwrap() {
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            out.push((entry.meta().clone(), data));
        }
        out
    }

    #[test]
    fn streams_stored_and_deflated_entries() {
        let data = zip_bytes(&[
            ZipSpec::stored("pages/001.jpg", b"first page"),
            ZipSpec::deflated("pages/002.jpg", &[7u8; 5000]),
        ]);
        let entries = drain_all(&mut reader(data));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.name, "pages/001.jpg");
        assert_eq!(entries[0].1, b"first page");
        assert!(entries[0].0.modified.is_some());
        assert_eq!(entries[1].0.index, 1);
        assert_eq!(entries[1].1, vec![7u8; 5000]);
        assert!(entries[1].0.compressed_size < 5000);
    }

    #[test]
    fn total_bytes_read_matches_declared_sizes() {
        let data = zip_bytes(&[
            ZipSpec::deflated("a.png", &[1u8; 3000]),
            ZipSpec::stored("b.png", &[2u8; 1234]),
            ZipSpec::deflated("c.txt", b"notes"),
        ]);
        let entries = drain_all(&mut reader(data));

        let declared: u64 = entries.iter().map(|(meta, _)| meta.size).sum();
        let read: u64 = entries.iter().map(|(_, data)| data.len() as u64).sum();
        assert_eq!(declared, read);
        assert_eq!(read, 3000 + 1234 + 5);
    }

    #[test]
    fn directories_are_never_yielded() {
        let data = zip_bytes(&[
            ZipSpec::directory("chapter1/"),
            ZipSpec::stored("chapter1/01.jpg", b"x"),
        ]);
        let entries = drain_all(&mut reader(data));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.name, "chapter1/01.jpg");
        assert_eq!(entries[0].0.index, 0);
    }

    #[test]
    fn advancing_past_an_unread_entry_is_a_sequencing_error() {
        let data = zip_bytes(&[
            ZipSpec::stored("1.jpg", b"one"),
            ZipSpec::stored("2.jpg", b"two"),
        ]);
        let mut reader = reader(data);
        let first = reader.next_entry().unwrap().unwrap();
        let _ = first.into_meta();

        assert!(matches!(
            reader.next_entry(),
            Err(ImportError::Sequencing(_))
        ));
    }

    #[test]
    fn skipped_entries_allow_advancing() {
        let data = zip_bytes(&[
            ZipSpec::deflated("1.jpg", &[3u8; 10_000]),
            ZipSpec::stored("2.jpg", b"two"),
        ]);
        let mut reader = reader(data);
        reader.next_entry().unwrap().unwrap().skip().unwrap();

        let second = reader.next_entry().unwrap().unwrap();
        assert_eq!(second.read_to_vec(1024).unwrap().unwrap(), b"two");
        assert!(reader.next_entry().unwrap().is_none());
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn data_descriptor_entries_are_streamed() {
        let data = zip_with_data_descriptor("page.jpg", &[9u8; 4096]);
        let entries = drain_all(&mut reader(data));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.name, "page.jpg");
        assert_eq!(entries[0].1, vec![9u8; 4096]);
    }

    #[test]
    fn zip_crate_stream_reader_still_refuses_data_descriptors() {
        // The hand-written descriptor path exists only because of this.
        let data = zip_with_data_descriptor("page.jpg", &[9u8; 64]);
        let mut cursor = Cursor::new(data);
        assert!(zip::read::read_zipfile_from_stream(&mut cursor).is_err());
    }

    #[test]
    fn skipping_a_data_descriptor_entry_reaches_the_end() {
        let data = zip_with_data_descriptor("page.jpg", &[4u8; 2048]);
        let mut reader = reader(data);
        let meta = reader.next_entry().unwrap().unwrap().skip().unwrap();
        assert_eq!(meta.name, "page.jpg");
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn empty_archive_has_no_entries() {
        let mut reader = reader(zip_bytes(&[]));
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn corrupt_header_fails_to_open() {
        let result = ZipReader::new(
            Cursor::new(b"not a zip at all".to_vec()),
            ArchiveLimits::default(),
        );
        assert!(matches!(result, Err(ImportError::ArchiveOpen(_))));
    }

    #[test]
    fn unsupported_compression_method_fails_to_open_the_entry() {
        let mut data = zip_bytes(&[ZipSpec::stored("1.jpg", b"0123456789")]);
        // LZMA (14) is not among the enabled decoders; the method field is at offset 8.
        data[8] = 14;
        let mut reader = reader(data);
        assert!(matches!(
            reader.next_entry(),
            Err(ImportError::ArchiveOpen(_))
        ));
    }

    #[test]
    fn truncated_archive_is_an_open_error() {
        let mut data = zip_bytes(&[ZipSpec::stored("1.jpg", b"0123456789")]);
        let payload_start = find(&data, b"0123456789");
        data.truncate(payload_start + 4);

        let mut reader = reader(data);
        let entry = reader.next_entry().unwrap().unwrap();
        assert!(matches!(
            entry.read_to_vec(1024),
            Err(ImportError::ArchiveOpen(_))
        ));
        assert!(matches!(
            reader.next_entry(),
            Err(ImportError::ArchiveOpen(_))
        ));
    }

    #[test]
    fn corrupted_payload_fails_crc_check() {
        let mut data = zip_bytes(&[ZipSpec::stored("1.jpg", b"0123456789")]);
        let payload_start = find(&data, b"0123456789");
        data[payload_start] ^= 0xff;

        let mut reader = reader(data);
        let entry = reader.next_entry().unwrap().unwrap();
        assert!(matches!(
            entry.read_to_vec(1024),
            Err(ImportError::ArchiveOpen(_))
        ));
    }

    #[test]
    fn entry_ceiling_aborts_the_stream() {
        let data = zip_bytes(&[
            ZipSpec::stored("1.jpg", b"1"),
            ZipSpec::stored("2.jpg", b"2"),
            ZipSpec::stored("3.jpg", b"3"),
        ]);
        let limits = ArchiveLimits {
            max_entries: 2,
            max_total_uncompressed: u64::MAX,
        };
        let mut reader = ZipReader::new(Cursor::new(data), limits).unwrap();
        reader.next_entry().unwrap().unwrap().skip().unwrap();
        reader.next_entry().unwrap().unwrap().skip().unwrap();
        assert!(matches!(
            reader.next_entry(),
            Err(ImportError::ArchiveTooLarge(_))
        ));
    }

    #[test]
    fn uncompressed_ceiling_aborts_the_stream() {
        let data = zip_bytes(&[ZipSpec::deflated("big.jpg", &[0u8; 50_000])]);
        let limits = ArchiveLimits {
            max_entries: 10,
            max_total_uncompressed: 10_000,
        };
        let mut reader = ZipReader::new(Cursor::new(data), limits).unwrap();
        assert!(matches!(
            reader.next_entry(),
            Err(ImportError::ArchiveTooLarge(_))
        ));
    }

    #[test]
    fn oversized_entries_are_skipped_by_read_to_vec() {
        let data = zip_bytes(&[
            ZipSpec::deflated("huge.jpg", &[5u8; 20_000]),
            ZipSpec::stored("next.jpg", b"ok"),
        ]);
        let mut reader = reader(data);
        let huge = reader.next_entry().unwrap().unwrap();
        assert!(huge.read_to_vec(100).unwrap().is_none());
        let next = reader.next_entry().unwrap().unwrap();
        assert_eq!(next.name(), "next.jpg");
        next.skip().unwrap();
    }
}
