//! Container codec for gzip-compressed MRtrix images (`.mif.gz`).
//!
//! # Read
//! The whole container is one gzip stream: header text first, binary
//! payload at the 4-byte-aligned offset the header's `file:` directive
//! declares. `read` checks the magic line, parses the fields into the
//! caller's descriptor, then rebuilds the header buffer with the declared
//! offset so the returned [`GzImageIo`] carries the exact bytes the file
//! claims to contain. The declared offset is authoritative; it is not
//! recomputed, so headers written with a different directive reserve still
//! open correctly.
//!
//! # Create
//! `create` serializes the header text, derives the offset from its length
//! (see [`crate::offset`]), appends `file: . <offset>` and `END`, verifies
//! the directive actually fits under the reserve, and zero-pads to the
//! offset. The target file is created empty; the caller commits the buffer
//! and payload through the returned handle.
//!
//! # Probe
//! A cheap suffix gate that also validates the requested shape: the
//! normalized descriptor it returns has the requested axis count, with
//! degenerate axes forced to length 1.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::gz::Gz;
use crate::header::{self, HeaderError, MAGIC, TERMINATOR};
use crate::image::ImageDescriptor;
use crate::io_stream::{DataEntry, GzImageIo};
use crate::offset;

/// Filename suffix this codec claims.
pub const SUFFIX: &str = ".mif.gz";

#[derive(Error, Debug)]
pub enum FormatError {
    /// The file decompressed cleanly but does not start with the magic
    /// line: corruption, not a routing signal.
    #[error("invalid first line for compressed image \"{path}\" (expected \"{MAGIC}\", read \"{line}\")")]
    InvalidMagic { path: String, line: String },
    #[error("error parsing header of \"{path}\": {source}")]
    Header { path: String, source: HeaderError },
    #[error("missing \"file\" directive in header of \"{path}\"")]
    MissingDirective { path: String },
    #[error("malformed \"file\" directive \"{directive}\" in header of \"{path}\"")]
    MalformedDirective { path: String, directive: String },
    /// Structurally valid header whose data lives outside the container.
    /// The compressed variant requires header and payload in one file.
    #[error("compressed image \"{path}\" references external data file \"{referenced}\"; header and image data must share one file")]
    ExternalDataFile { path: String, referenced: String },
    /// The header text plus directive does not fit below the data offset.
    /// On create this means the offset outgrew the directive reserve; on
    /// read, that the declared offset is too small for the header itself.
    #[error("header of \"{path}\" does not fit below its data offset {offset}")]
    HeaderOverflow { path: String, offset: u64 },
    #[error("IO error on \"{path}\": {source}")]
    Io { path: String, source: io::Error },
}

/// Capability set a format registry dispatches on, in suffix order.
pub trait ImageFormat {
    /// Cheap suffix and shape check. `None` means "not this format"; the
    /// registry tries the next codec. On a match, returns the descriptor
    /// normalized to `num_axes` axes with degenerate sizes forced to 1.
    fn probe(&self, desc: &ImageDescriptor, num_axes: usize) -> Option<ImageDescriptor>;

    /// Open an existing container. `Ok(None)` on suffix mismatch; the
    /// descriptor is only modified on a successful parse.
    fn read(&self, desc: &mut ImageDescriptor) -> Result<Option<GzImageIo>, FormatError>;

    /// Synthesize a header for the descriptor and create the target file.
    fn create(&self, desc: &ImageDescriptor) -> Result<GzImageIo, FormatError>;
}

/// The `.mif.gz` codec. Stateless; every call is one self-contained
/// transaction over the descriptor's target path.
pub struct MrtrixGz;

impl ImageFormat for MrtrixGz {
    fn probe(&self, desc: &ImageDescriptor, num_axes: usize) -> Option<ImageDescriptor> {
        if !desc.name().ends_with(SUFFIX) {
            return None;
        }
        let mut normalized = desc.clone();
        normalized.set_ndim(num_axes);
        for axis in normalized.axes_mut() {
            if axis.size < 1 {
                axis.size = 1;
            }
        }
        Some(normalized)
    }

    fn read(&self, desc: &mut ImageDescriptor) -> Result<Option<GzImageIo>, FormatError> {
        if !desc.name().ends_with(SUFFIX) {
            return Ok(None);
        }
        let path = desc.name().to_owned();

        let mut zf = Gz::open(desc.path()).map_err(|e| io_error(&path, e))?;
        let first = zf
            .read_line()
            .map_err(|e| io_error(&path, e))?
            .unwrap_or_default();
        if first != MAGIC {
            return Err(FormatError::InvalidMagic { path, line: first });
        }
        header::read_header(desc, &mut zf).map_err(|e| match e {
            HeaderError::Io(e) => io_error(&path, e),
            e => FormatError::Header {
                path: path.clone(),
                source: e,
            },
        })?;
        drop(zf);

        let directive = desc
            .fields_mut()
            .remove("file")
            .ok_or_else(|| FormatError::MissingDirective { path: path.clone() })?;
        let (data_path, declared) = parse_directive(&directive, desc.path())
            .ok_or_else(|| FormatError::MalformedDirective {
                path: path.clone(),
                directive: directive.clone(),
            })?;
        if data_path != desc.path() {
            return Err(FormatError::ExternalDataFile {
                path,
                referenced: data_path.display().to_string(),
            });
        }

        let text = header::write_header(desc);
        let mut io = bind_header(&path, &text, declared)?;
        io.add_entry(DataEntry::new(desc.path(), declared));
        Ok(Some(io))
    }

    fn create(&self, desc: &ImageDescriptor) -> Result<GzImageIo, FormatError> {
        let path = desc.name().to_owned();
        let text = header::write_header(desc);
        let offset = offset::data_offset(text.len() as u64);

        let mut io = bind_header(&path, &text, offset)?;
        File::create(desc.path()).map_err(|e| io_error(&path, e))?;
        io.add_entry(DataEntry::new(desc.path(), offset));
        Ok(io)
    }
}

/// Build the header buffer for a known data offset: serialized text, then
/// `file: . <offset>` and the terminator, then zero padding up to the
/// offset. Fails if the text and directive do not fit.
fn bind_header(path: &str, text: &str, offset: u64) -> Result<GzImageIo, FormatError> {
    let tail = format!("file: . {offset}\n{TERMINATOR}\n");
    let used = text.len() + tail.len();
    if used as u64 > offset {
        return Err(FormatError::HeaderOverflow {
            path: path.to_owned(),
            offset,
        });
    }
    let mut io = GzImageIo::new(offset);
    let header = io.header_mut();
    header[..text.len()].copy_from_slice(text.as_bytes());
    header[text.len()..used].copy_from_slice(tail.as_bytes());
    Ok(io)
}

/// Split a `file:` directive value into its resolved data path and offset.
/// The relative path `.` names the container itself; a missing offset
/// defaults to 0.
fn parse_directive(value: &str, target: &Path) -> Option<(PathBuf, u64)> {
    let mut parts = value.split_whitespace();
    let relpath = parts.next()?;
    let offset = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    let resolved = if relpath == "." {
        target.to_path_buf()
    } else {
        match target.parent() {
            Some(dir) => dir.join(relpath),
            None => PathBuf::from(relpath),
        }
    };
    Some((resolved, offset))
}

fn io_error(path: &str, source: io::Error) -> FormatError {
    FormatError::Io {
        path: path.to_owned(),
        source,
    }
}
