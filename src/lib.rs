pub mod format;
pub mod gz;
pub mod header;
pub mod image;
pub mod io_stream;
pub mod offset;

pub use format::{FormatError, ImageFormat, MrtrixGz, SUFFIX};
pub use header::{HeaderError, KeyValues, MAGIC, TERMINATOR};
pub use image::{Axis, DataType, ImageDescriptor};
pub use io_stream::{DataEntry, GzImageIo};
