//! Single primitive encode/decode.

use super::{check_bounds, MarshalError};
use crate::layout::{PrimitiveKind, Scalar};

/// Writes `value` as `kind` at `offset`, little-endian.
///
/// Integer kinds accept any scalar whose exact integer value fits the
/// destination width; a float with a fractional part is rejected. Float
/// kinds accept floats (an `f64` outside the `f32` range is rejected for
/// `F32`) and integers that convert without rounding.
pub fn write_primitive(
    buf: &mut [u8],
    value: Scalar,
    kind: PrimitiveKind,
    offset: usize,
) -> Result<(), MarshalError> {
    let end = check_bounds(offset, kind.size(), buf.len())?;
    let out = &mut buf[offset..end];
    let out_of_range = || MarshalError::OutOfRange { value, kind };

    macro_rules! put_int {
        ($ty:ty) => {{
            let int = value.to_integer().ok_or_else(out_of_range)?;
            let narrowed = <$ty>::try_from(int).map_err(|_| out_of_range())?;
            out.copy_from_slice(&narrowed.to_le_bytes());
        }};
    }

    match kind {
        PrimitiveKind::U8 => put_int!(u8),
        PrimitiveKind::U16 => put_int!(u16),
        PrimitiveKind::U32 => put_int!(u32),
        PrimitiveKind::U64 => put_int!(u64),
        PrimitiveKind::I8 => put_int!(i8),
        PrimitiveKind::I16 => put_int!(i16),
        PrimitiveKind::I32 => put_int!(i32),
        PrimitiveKind::I64 => put_int!(i64),
        PrimitiveKind::F32 => {
            let v = to_f32(value).ok_or_else(out_of_range)?;
            out.copy_from_slice(&v.to_le_bytes());
        }
        PrimitiveKind::F64 => {
            let v = to_f64(value).ok_or_else(out_of_range)?;
            out.copy_from_slice(&v.to_le_bytes());
        }
    }
    Ok(())
}

/// Reads a `kind` value at `offset`.
///
/// 64-bit integers come back as exact `U64`/`I64` scalars, never through a
/// float.
pub fn read_primitive(
    buf: &[u8],
    kind: PrimitiveKind,
    offset: usize,
) -> Result<Scalar, MarshalError> {
    check_bounds(offset, kind.size(), buf.len())?;
    let scalar = match kind {
        PrimitiveKind::U8 => Scalar::U8(buf[offset]),
        PrimitiveKind::I8 => Scalar::I8(i8::from_le_bytes([buf[offset]])),
        PrimitiveKind::U16 => Scalar::U16(u16::from_le_bytes(take(buf, offset))),
        PrimitiveKind::I16 => Scalar::I16(i16::from_le_bytes(take(buf, offset))),
        PrimitiveKind::U32 => Scalar::U32(u32::from_le_bytes(take(buf, offset))),
        PrimitiveKind::I32 => Scalar::I32(i32::from_le_bytes(take(buf, offset))),
        PrimitiveKind::F32 => Scalar::F32(f32::from_le_bytes(take(buf, offset))),
        PrimitiveKind::U64 => Scalar::U64(u64::from_le_bytes(take(buf, offset))),
        PrimitiveKind::I64 => Scalar::I64(i64::from_le_bytes(take(buf, offset))),
        PrimitiveKind::F64 => Scalar::F64(f64::from_le_bytes(take(buf, offset))),
    };
    Ok(scalar)
}

/// Copies `N` bytes out of a range already checked by the caller.
fn take<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

fn to_f32(value: Scalar) -> Option<f32> {
    match value {
        Scalar::F32(v) => Some(v),
        Scalar::F64(v) => {
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                None
            } else {
                Some(v as f32)
            }
        }
        _ => {
            let int = value.to_integer()?;
            let f = int as f32;
            (f as i128 == int).then_some(f)
        }
    }
}

fn to_f64(value: Scalar) -> Option<f64> {
    match value {
        Scalar::F32(v) => Some(v.into()),
        Scalar::F64(v) => Some(v),
        _ => {
            let int = value.to_integer()?;
            let f = int as f64;
            (f as i128 == int).then_some(f)
        }
    }
}
