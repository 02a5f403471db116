//! Text header grammar for MRtrix image containers.
//!
//! A header is the literal magic line, zero or more `key: value` lines
//! (a key may repeat; each occurrence is a separate line), and the `END`
//! terminator. The geometry keys `dim`, `vox`, `layout` and `datatype`
//! are typed and map onto [`ImageDescriptor`] axes; every other key
//! round-trips through the ordered [`KeyValues`] store. The `file:`
//! directive is left in the store for the container codec to extract.
//!
//! [`read_header`] and [`write_header`] must agree byte-for-byte: the
//! create path serializes with `write_header`, and the read path re-derives
//! the identical buffer after parsing.

use std::fmt::Write as _;
use std::io;
use thiserror::Error;

use crate::gz::LineSource;
use crate::image::{Axis, DataType, ImageDescriptor};

/// Fixed first line of every MRtrix image header.
pub const MAGIC: &str = "mrtrix image";
/// Fixed last line of every header.
pub const TERMINATOR: &str = "END";

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("malformed header entry \"{line}\" (expected \"key: value\")")]
    MalformedLine { line: String },
    #[error("header ended before the \"{TERMINATOR}\" terminator")]
    MissingEnd,
    #[error("invalid \"{key}\" specification \"{value}\"")]
    BadGeometry { key: &'static str, value: String },
    #[error("invalid datatype \"{0}\"")]
    UnknownDataType(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── Ordered field store ──────────────────────────────────────────────────────

/// Ordered key/value store for generic header fields.
///
/// Insertion order is preserved for byte-level round-trip fidelity, and a
/// key may appear more than once; each occurrence is kept as a separate
/// value and serialized as its own line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValues {
    entries: Vec<(String, String)>,
}

impl KeyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value recorded under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values recorded under `key`, in insertion order.
    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove every occurrence of `key`, returning the first value if the
    /// key was present.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let first = self
            .entries
            .iter()
            .position(|(k, _)| k == key)
            .map(|i| self.entries[i].1.clone());
        self.entries.retain(|(k, _)| k != key);
        first
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────────

/// Parse `key: value` lines from `src` until the terminator, populating the
/// descriptor's axes, datatype and generic fields.
///
/// The magic line is expected to have been consumed (and checked) by the
/// caller. End of input before the terminator is an error.
pub fn read_header<L: LineSource>(
    desc: &mut ImageDescriptor,
    src: &mut L,
) -> Result<(), HeaderError> {
    let mut sizes: Option<Vec<usize>> = None;
    let mut spacings: Option<Vec<f32>> = None;
    let mut strides: Option<Vec<i64>> = None;

    loop {
        let line = src.next_line()?.ok_or(HeaderError::MissingEnd)?;
        if line == TERMINATOR {
            break;
        }
        let (key, value) = split_field(&line)?;
        match key {
            "dim" => sizes = Some(parse_list("dim", value, parse_size)?),
            "vox" => spacings = Some(parse_list("vox", value, parse_spacing)?),
            "layout" => strides = Some(parse_list("layout", value, parse_stride)?),
            "datatype" => {
                let dt = DataType::from_name(value)
                    .ok_or_else(|| HeaderError::UnknownDataType(value.to_owned()))?;
                desc.set_dtype(dt);
            }
            _ => desc.fields_mut().insert(key, value),
        }
    }

    if let Some(sizes) = sizes {
        let spacings = spacings.unwrap_or_default();
        let strides = strides.unwrap_or_default();
        let axes = sizes
            .into_iter()
            .enumerate()
            .map(|(i, size)| {
                Axis::new(
                    size,
                    spacings.get(i).copied().unwrap_or(1.0),
                    strides.get(i).copied().unwrap_or((i + 1) as i64),
                )
            })
            .collect();
        desc.set_axes(axes);
    }
    Ok(())
}

/// Split one header line at its first colon into a trimmed key and value.
fn split_field(line: &str) -> Result<(&str, &str), HeaderError> {
    let (key, value) = line.split_once(':').ok_or_else(|| HeaderError::MalformedLine {
        line: line.to_owned(),
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(HeaderError::MalformedLine {
            line: line.to_owned(),
        });
    }
    Ok((key, value.trim()))
}

fn parse_list<T>(
    key: &'static str,
    value: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<Vec<T>, HeaderError> {
    value
        .split(',')
        .map(str::trim)
        .map(|item| {
            parse(item).ok_or_else(|| HeaderError::BadGeometry {
                key,
                value: value.to_owned(),
            })
        })
        .collect()
}

fn parse_size(s: &str) -> Option<usize> {
    s.parse().ok()
}

fn parse_spacing(s: &str) -> Option<f32> {
    s.parse().ok()
}

/// Layout entries carry the traversal direction as an explicit sign and the
/// axis ordering as a 0-based index: `+0` is stride 1, `-2` is stride -3.
fn parse_stride(s: &str) -> Option<i64> {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, s.strip_prefix('+').unwrap_or(s)),
    };
    let index: i64 = digits.parse().ok()?;
    Some(sign * (index + 1))
}

// ── Serialization ────────────────────────────────────────────────────────────

/// Serialize the magic line and all header fields, one `key: value` line
/// each, in insertion order.
///
/// The `file:` directive and the terminator are not included; they depend
/// on the computed data offset and are appended by the container codec.
pub fn write_header(desc: &ImageDescriptor) -> String {
    let mut out = String::new();
    out.push_str(MAGIC);
    out.push('\n');

    if !desc.axes().is_empty() {
        let _ = writeln!(out, "dim: {}", join(desc.axes().iter().map(|a| a.size.to_string())));
        let _ = writeln!(out, "vox: {}", join(desc.axes().iter().map(|a| a.spacing.to_string())));
        let _ = writeln!(out, "layout: {}", join(desc.axes().iter().map(|a| stride_symbol(a.stride))));
    }
    let _ = writeln!(out, "datatype: {}", desc.dtype());

    for (key, value) in desc.fields().iter() {
        let _ = writeln!(out, "{key}: {value}");
    }
    out
}

fn stride_symbol(stride: i64) -> String {
    let sign = if stride < 0 { '-' } else { '+' };
    format!("{sign}{}", stride.unsigned_abs().saturating_sub(1))
}

fn join<I: Iterator<Item = String>>(items: I) -> String {
    items.collect::<Vec<_>>().join(",")
}
