use crate::header::KeyValues;
use std::fmt;
use std::path::Path;

/// Voxel value type of an image, named as it appears on the `datatype:`
/// header line. `LE`/`BE` suffixes fix the byte order of multi-byte types;
/// `Bit` is packed 8 voxels per byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bit,
    Int8,
    UInt8,
    Int16LE,
    UInt16LE,
    Int32LE,
    UInt32LE,
    Float32LE,
    Float64LE,
    CFloat32LE,
    CFloat64LE,
    Int16BE,
    UInt16BE,
    Int32BE,
    UInt32BE,
    Float32BE,
    Float64BE,
    CFloat32BE,
    CFloat64BE,
}

impl DataType {
    /// Canonical header spelling of this type.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Bit        => "Bit",
            DataType::Int8       => "Int8",
            DataType::UInt8      => "UInt8",
            DataType::Int16LE    => "Int16LE",
            DataType::UInt16LE   => "UInt16LE",
            DataType::Int32LE    => "Int32LE",
            DataType::UInt32LE   => "UInt32LE",
            DataType::Float32LE  => "Float32LE",
            DataType::Float64LE  => "Float64LE",
            DataType::CFloat32LE => "CFloat32LE",
            DataType::CFloat64LE => "CFloat64LE",
            DataType::Int16BE    => "Int16BE",
            DataType::UInt16BE   => "UInt16BE",
            DataType::Int32BE    => "Int32BE",
            DataType::UInt32BE   => "UInt32BE",
            DataType::Float32BE  => "Float32BE",
            DataType::Float64BE  => "Float64BE",
            DataType::CFloat32BE => "CFloat32BE",
            DataType::CFloat64BE => "CFloat64BE",
        }
    }

    /// Resolve a header spelling. Returns `None` for names this build does
    /// not recognise.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Bit"        => Some(DataType::Bit),
            "Int8"       => Some(DataType::Int8),
            "UInt8"      => Some(DataType::UInt8),
            "Int16LE"    => Some(DataType::Int16LE),
            "UInt16LE"   => Some(DataType::UInt16LE),
            "Int32LE"    => Some(DataType::Int32LE),
            "UInt32LE"   => Some(DataType::UInt32LE),
            "Float32LE"  => Some(DataType::Float32LE),
            "Float64LE"  => Some(DataType::Float64LE),
            "CFloat32LE" => Some(DataType::CFloat32LE),
            "CFloat64LE" => Some(DataType::CFloat64LE),
            "Int16BE"    => Some(DataType::Int16BE),
            "UInt16BE"   => Some(DataType::UInt16BE),
            "Int32BE"    => Some(DataType::Int32BE),
            "UInt32BE"   => Some(DataType::UInt32BE),
            "Float32BE"  => Some(DataType::Float32BE),
            "Float64BE"  => Some(DataType::Float64BE),
            "CFloat32BE" => Some(DataType::CFloat32BE),
            "CFloat64BE" => Some(DataType::CFloat64BE),
            _            => None,
        }
    }

    /// Storage width of one voxel in bits.
    pub fn bits(self) -> u64 {
        match self {
            DataType::Bit => 1,
            DataType::Int8 | DataType::UInt8 => 8,
            DataType::Int16LE | DataType::UInt16LE
            | DataType::Int16BE | DataType::UInt16BE => 16,
            DataType::Int32LE | DataType::UInt32LE | DataType::Float32LE
            | DataType::Int32BE | DataType::UInt32BE | DataType::Float32BE => 32,
            DataType::Float64LE | DataType::Float64BE
            | DataType::CFloat32LE | DataType::CFloat32BE => 64,
            DataType::CFloat64LE | DataType::CFloat64BE => 128,
        }
    }

    /// Payload size in bytes for `voxels` elements of this type.
    pub fn image_bytes(self, voxels: u64) -> u64 {
        (voxels * self.bits() + 7) / 8
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One image axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    /// Voxel count along this axis. A degenerate (zero) size is normalized
    /// to 1 during probing.
    pub size: usize,
    /// Voxel spacing along this axis, in millimetres.
    pub spacing: f32,
    /// Signed 1-based ordering stride; the sign is the traversal direction.
    /// Never 0 for a constructed descriptor.
    pub stride: i64,
}

impl Axis {
    pub fn new(size: usize, spacing: f32, stride: i64) -> Self {
        Self { size, spacing, stride }
    }
}

/// In-memory image descriptor the container codec reads from and writes to.
///
/// Owned by the caller; the codec consumes it to synthesize a header
/// (`create`), populates it from a parsed header (`read`), or returns a
/// normalized copy of it (`probe`).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    name: String,
    axes: Vec<Axis>,
    dtype: DataType,
    fields: KeyValues,
}

impl ImageDescriptor {
    /// New descriptor for `name` with the given axis sizes, unit spacing
    /// and in-order strides.
    pub fn new<S: Into<String>>(name: S, sizes: &[usize]) -> Self {
        let axes = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| Axis::new(size, 1.0, (i + 1) as i64))
            .collect();
        Self {
            name: name.into(),
            axes,
            dtype: DataType::Float32LE,
            fields: KeyValues::new(),
        }
    }

    /// Target file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target file name as a filesystem path.
    pub fn path(&self) -> &Path {
        Path::new(&self.name)
    }

    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axes_mut(&mut self) -> &mut [Axis] {
        &mut self.axes
    }

    /// Voxel count along axis `i`.
    pub fn size(&self, i: usize) -> usize {
        self.axes[i].size
    }

    /// Total voxel count across all axes.
    pub fn voxel_count(&self) -> u64 {
        self.axes.iter().map(|a| a.size as u64).product()
    }

    /// Truncate or extend the axis list to `n` axes. New axes get size 1,
    /// unit spacing and the next in-order stride.
    pub fn set_ndim(&mut self, n: usize) {
        if n < self.axes.len() {
            self.axes.truncate(n);
        } else {
            for i in self.axes.len()..n {
                self.axes.push(Axis::new(1, 1.0, (i + 1) as i64));
            }
        }
    }

    /// Replace the axis list wholesale. Used by the header parser.
    pub fn set_axes(&mut self, axes: Vec<Axis>) {
        self.axes = axes;
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn set_dtype(&mut self, dtype: DataType) {
        self.dtype = dtype;
    }

    /// Generic header fields, in insertion order.
    pub fn fields(&self) -> &KeyValues {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut KeyValues {
        &mut self.fields
    }
}
