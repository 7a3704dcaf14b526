//! Segment Reader
//!
//! Sequential replay over the records of one segment, plus direct reads of a
//! single record at a known offset.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;
use crate::record::{decode_header, Decoded, RecordHeader, HEADER_SIZE};

/// One complete record found during replay (value bytes are skipped)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedRecord {
    /// Offset of the first header byte within the segment
    pub offset: u64,
    pub header: RecordHeader,
    pub key: Vec<u8>,
}

/// A full record read back from a known offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub header: RecordHeader,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Iterates the complete records of a segment in append order
///
/// Iteration stops at the first frame that does not fit in the file. That
/// torn tail is reported through [`SegmentReader::is_torn`], never as an error.
pub struct SegmentReader {
    reader: BufReader<File>,
    /// File length captured at open; bytes appended later are not visited
    file_len: u64,
    /// End of the last complete record
    position: u64,
    torn: bool,
    done: bool,
}

impl SegmentReader {
    /// Open a segment file for replay
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::new(file),
            file_len,
            position: 0,
            torn: false,
            done: false,
        })
    }

    /// Length of the prefix made of complete records
    pub fn valid_len(&self) -> u64 {
        self.position
    }

    /// Whether replay hit a partial record at the tail
    pub fn is_torn(&self) -> bool {
        self.torn
    }

    /// Length of the file when it was opened
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    fn stop(&mut self, torn: bool) -> Option<Result<ReplayedRecord>> {
        self.done = true;
        self.torn = torn;
        None
    }

    fn read_next(&mut self) -> Option<Result<ReplayedRecord>> {
        let remaining = self.file_len - self.position;
        if remaining < HEADER_SIZE as u64 {
            return self.stop(remaining > 0);
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        if let Err(e) = self.reader.read_exact(&mut header_buf) {
            return match e.kind() {
                io::ErrorKind::UnexpectedEof => self.stop(true),
                _ => Some(Err(e.into())),
            };
        }

        let header = match decode_header(&header_buf) {
            Decoded::Header(header) => header,
            Decoded::EndOfStream => return self.stop(true),
        };

        if header.record_len() > remaining {
            return self.stop(true);
        }

        let mut key = vec![0u8; header.key_len as usize];
        if let Err(e) = self.reader.read_exact(&mut key) {
            return Some(Err(e.into()));
        }
        if let Err(e) = self.reader.seek_relative(header.val_len as i64) {
            return Some(Err(e.into()));
        }

        let offset = self.position;
        self.position += header.record_len();

        Some(Ok(ReplayedRecord {
            offset,
            header,
            key,
        }))
    }
}

impl Iterator for SegmentReader {
    type Item = Result<ReplayedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.read_next();
        if matches!(item, Some(Err(_))) {
            self.done = true;
        }
        item
    }
}

/// Read the record starting at `offset` in the segment at `path`
///
/// Opens a short-lived handle per call. A record cut short by the end of the
/// file surfaces as an `UnexpectedEof` I/O error.
pub fn read_record_at(path: &Path, offset: u64) -> Result<StoredRecord> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;

    let mut header_buf = [0u8; HEADER_SIZE];
    file.read_exact(&mut header_buf)?;
    let header = match decode_header(&header_buf) {
        Decoded::Header(header) => header,
        Decoded::EndOfStream => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
    };

    let mut key = vec![0u8; header.key_len as usize];
    file.read_exact(&mut key)?;

    let mut value = vec![0u8; header.val_len as usize];
    file.read_exact(&mut value)?;

    Ok(StoredRecord { header, key, value })
}
