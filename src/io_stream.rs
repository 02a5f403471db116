//! Bound data-region handles returned by the container codec.
//!
//! A successful `read` or `create` yields a [`GzImageIo`]: the header
//! buffer the codec filled in (its length is exactly the data offset) and
//! the list of data regions the payload lives at. For this format there is
//! always exactly one region, co-located with the header in the same
//! gzip stream.
//!
//! [`GzImageIo::commit`] and [`GzImageIo::read_payload`] are the write and
//! read halves of the payload transport. Neither interprets the payload;
//! pixel decoding belongs to the consumer.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use flate2::read::GzDecoder;

use crate::gz::Gz;

/// One (path, offset) data region: the absolute decompressed byte position
/// where the binary payload begins within `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntry {
    pub path: PathBuf,
    pub offset: u64,
}

impl DataEntry {
    pub fn new<P: Into<PathBuf>>(path: P, offset: u64) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

/// Streaming handle for one compressed image container.
#[derive(Debug)]
pub struct GzImageIo {
    /// Zero-initialized header region; the codec copies the serialized
    /// header text and directive over the front, leaving the zero padding
    /// up to the data offset in place.
    header: Vec<u8>,
    /// Data regions of this image. Exactly one entry for this format.
    pub entries: Vec<DataEntry>,
}

impl GzImageIo {
    /// Allocate a zero-filled header buffer spanning `offset` bytes.
    pub fn new(offset: u64) -> Self {
        Self {
            header: vec![0u8; offset as usize],
            entries: Vec::new(),
        }
    }

    /// Absolute offset at which the binary payload begins.
    pub fn data_offset(&self) -> u64 {
        self.header.len() as u64
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut [u8] {
        &mut self.header
    }

    pub fn add_entry(&mut self, entry: DataEntry) {
        self.entries.push(entry);
    }

    fn entry(&self) -> io::Result<&DataEntry> {
        self.entries.first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no data region bound to this image")
        })
    }

    /// Write the container: the header buffer followed by `payload`, as a
    /// single gzip stream.
    pub fn commit(&self, payload: &[u8]) -> io::Result<()> {
        let entry = self.entry()?;
        let mut enc = Gz::create(&entry.path)?;
        enc.write_all(&self.header)?;
        enc.write_all(payload)?;
        enc.finish()?;
        Ok(())
    }

    /// Re-open the container, skip to the data offset in the decompressed
    /// stream and return everything after it.
    pub fn read_payload(&self) -> io::Result<Vec<u8>> {
        let entry = self.entry()?;
        let mut dec = GzDecoder::new(File::open(&entry.path)?);
        let skipped = io::copy(&mut (&mut dec).take(entry.offset), &mut io::sink())?;
        if skipped < entry.offset {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "container \"{}\" ends before its data offset {}",
                    entry.path.display(),
                    entry.offset
                ),
            ));
        }
        let mut payload = Vec::new();
        dec.read_to_end(&mut payload)?;
        Ok(payload)
    }
}
