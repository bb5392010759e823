//! Data-only layout descriptions for values stored in kernel memory.
//!
//! A [`Descriptor`] says how a value is laid out byte for byte. Records are
//! packed with no padding and fields appear in declaration order:
//!
//! ```text
//! Coordinate (16 bytes)
//! ┌──────────────────────┬──────────────────────┐
//! │ latitude   f64 @0    │ longitude  f64 @8    │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! [`Value`] is the dynamic counterpart that the marshaling layer reads and
//! writes. Types with a fixed layout implement [`Marshal`].

mod descriptor;
mod primitive;
mod records;
#[cfg(test)]
pub(crate) mod testing;
mod value;

pub use descriptor::Descriptor;
pub use primitive::PrimitiveKind;
pub use records::{Marshal, COORDINATE, PROJECTED_POINT};
pub use value::{Scalar, Value};
