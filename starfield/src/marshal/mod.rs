//! Marshaling between host values and flat kernel memory.
//!
//! Every function here takes a raw byte buffer, a [`Descriptor`] (or a
//! single [`PrimitiveKind`]) and a byte offset. Multi-byte values are always
//! little-endian, whatever the host byte order.
//!
//! Two kinds of failure are distinguished:
//!
//! - **Bounds and range errors** are returned as [`MarshalError`]. A write
//!   never touches bytes outside the buffer, and a value that does not fit
//!   its declared kind is rejected instead of clamped.
//! - **Layout errors**, where a value does not structurally match its
//!   descriptor, are programming errors and panic.
//!
//! [`Descriptor`]: crate::layout::Descriptor
//! [`PrimitiveKind`]: crate::layout::PrimitiveKind

mod primitive;
mod record;

pub use primitive::{read_primitive, write_primitive};
pub use record::{decode, encode, read_record, read_records, write_record, write_records};

use crate::layout::{PrimitiveKind, Scalar};

/// Errors returned by the marshaling functions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarshalError {
    /// An access would run past the end of the buffer.
    #[error("access of {size} bytes at offset {offset} exceeds buffer of {available} bytes")]
    OutOfBounds {
        offset: usize,
        size: usize,
        available: usize,
    },

    /// A value cannot be represented exactly in the requested kind.
    #[error("value {value} does not fit in {kind}")]
    OutOfRange { value: Scalar, kind: PrimitiveKind },
}

/// Checks that `size` bytes starting at `offset` lie within a buffer of
/// `available` bytes and returns the end offset.
pub(crate) fn check_bounds(
    offset: usize,
    size: usize,
    available: usize,
) -> Result<usize, MarshalError> {
    match offset.checked_add(size) {
        Some(end) if end <= available => Ok(end),
        _ => Err(MarshalError::OutOfBounds {
            offset,
            size,
            available,
        }),
    }
}
