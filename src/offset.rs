//! Data-offset arithmetic shared by the read and create paths.
//!
//! The binary payload of a container starts at a 4-byte-aligned absolute
//! offset derived from the serialized header text length. Both paths must
//! agree bit-for-bit on this arithmetic: `create` uses it to place the
//! payload, and the header it writes declares the same value in its
//! `file:` directive.

/// Bytes reserved past the header text for the `file: . <offset>` directive
/// and the `END` terminator.
///
/// The directive tail is `file: . ` (8 bytes) plus the offset in decimal
/// plus `\nEND\n` (5 bytes), so 24 bytes hold offsets of up to 11 digits.
/// The bound is not checked here; the codec verifies the formatted tail
/// actually fits when it builds the header buffer.
pub const DIRECTIVE_RESERVE: u64 = 24;

/// Round `n` up to the next multiple of 4. Already-aligned values are
/// returned unchanged.
#[inline]
pub fn align4(n: u64) -> u64 {
    n + ((4 - n % 4) % 4)
}

/// Absolute data offset for a header of `text_len` bytes (magic line plus
/// fields, excluding the directive and terminator lines).
#[inline]
pub fn data_offset(text_len: u64) -> u64 {
    align4(text_len + DIRECTIVE_RESERVE)
}
