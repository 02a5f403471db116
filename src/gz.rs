//! Line-oriented access to gzip-compressed containers.
//!
//! The header grammar never touches the byte stream directly; it consumes
//! a [`LineSource`]. [`Gz`] is the production source, decompressing with
//! flate2 as it reads. [`BufLines`] adapts any buffered reader, which
//! keeps the grammar testable against in-memory text.
//!
//! Handles close when dropped, on every exit path including errors.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// A source of text lines.
pub trait LineSource {
    /// Next line without its trailing newline; `None` at end of stream.
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

/// Line reader over a gzip-compressed file.
pub struct Gz {
    path: PathBuf,
    inner: BufReader<GzDecoder<File>>,
}

impl Gz {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_owned(),
            inner: BufReader::new(GzDecoder::new(file)),
        })
    }

    /// Create (truncate) a gzip-compressed file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<GzEncoder<File>> {
        Ok(GzEncoder::new(File::create(path)?, Compression::default()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        next_from(&mut self.inner)
    }
}

impl LineSource for Gz {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.read_line()
    }
}

/// Adapter exposing any buffered reader as a [`LineSource`].
pub struct BufLines<R>(pub R);

impl<R: BufRead> LineSource for BufLines<R> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        next_from(&mut self.0)
    }
}

fn next_from<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}
