//! Recursive record and array marshaling driven by descriptors.

use super::{check_bounds, read_primitive, write_primitive, MarshalError};
use crate::layout::{Descriptor, Marshal, Value};

/// Writes `value` laid out as `descriptor` at `offset`.
///
/// Returns the offset just past the record so arrays can be written back to
/// back. On any error `buf` is left untouched: the record is encoded into a
/// scratch buffer and copied in only once every field has been accepted.
///
/// # Panics
///
/// Panics if `value` does not structurally match `descriptor`.
pub fn write_record(
    buf: &mut [u8],
    value: &Value,
    descriptor: &Descriptor,
    offset: usize,
) -> Result<usize, MarshalError> {
    write_records(buf, std::slice::from_ref(value), descriptor, offset)
}

/// Reads one record laid out as `descriptor` at `offset`.
pub fn read_record(
    buf: &[u8],
    descriptor: &Descriptor,
    offset: usize,
) -> Result<Value, MarshalError> {
    check_bounds(offset, descriptor.size_of(), buf.len())?;
    read_fields(buf, descriptor, offset)
}

/// Writes `values` contiguously starting at `offset`, returning the offset
/// just past the last record.
///
/// All or nothing: a value out of range for its field leaves `buf` as it
/// was.
///
/// # Panics
///
/// Panics if any value does not structurally match `descriptor`.
pub fn write_records(
    buf: &mut [u8],
    values: &[Value],
    descriptor: &Descriptor,
    offset: usize,
) -> Result<usize, MarshalError> {
    for value in values {
        assert_layout(value, descriptor);
    }
    let total = descriptor.size_of().saturating_mul(values.len());
    let end = check_bounds(offset, total, buf.len())?;

    let mut scratch = vec![0u8; total];
    let mut cursor = 0;
    for value in values {
        cursor = write_fields(&mut scratch, value, descriptor, cursor)?;
    }
    buf[offset..end].copy_from_slice(&scratch);
    Ok(end)
}

/// Reads `count` contiguous records starting at `offset`.
pub fn read_records(
    buf: &[u8],
    descriptor: &Descriptor,
    offset: usize,
    count: usize,
) -> Result<Vec<Value>, MarshalError> {
    let size = descriptor.size_of();
    check_bounds(offset, size.saturating_mul(count), buf.len())?;

    (0..count)
        .map(|i| read_fields(buf, descriptor, offset + i * size))
        .collect()
}

/// Encodes a typed record into a fresh buffer of exactly its size.
pub fn encode<T: Marshal>(item: &T) -> Result<Vec<u8>, MarshalError> {
    let descriptor = T::descriptor();
    let mut buf = vec![0u8; descriptor.size_of()];
    write_record(&mut buf, &item.to_value(), descriptor, 0)?;
    Ok(buf)
}

/// Decodes a typed record at `offset`.
pub fn decode<T: Marshal>(buf: &[u8], offset: usize) -> Result<T, MarshalError> {
    let value = read_record(buf, T::descriptor(), offset)?;
    Ok(T::from_value(&value))
}

fn write_fields(
    buf: &mut [u8],
    value: &Value,
    descriptor: &Descriptor,
    offset: usize,
) -> Result<usize, MarshalError> {
    match descriptor {
        Descriptor::Primitive(kind) => {
            write_primitive(buf, scalar_of(value, "<primitive>"), *kind, offset)?;
            Ok(offset + kind.size())
        }
        Descriptor::Simple(fields) => {
            let mut cursor = offset;
            for (name, kind) in fields {
                let scalar = scalar_of(field_of(value, name), name);
                write_primitive(buf, scalar, *kind, cursor)?;
                cursor += kind.size();
            }
            Ok(cursor)
        }
        Descriptor::Complex(fields) => {
            let mut cursor = offset;
            for (name, child) in fields {
                cursor = write_fields(buf, field_of(value, name), child, cursor)?;
            }
            Ok(cursor)
        }
    }
}

fn read_fields(buf: &[u8], descriptor: &Descriptor, offset: usize) -> Result<Value, MarshalError> {
    match descriptor {
        Descriptor::Primitive(kind) => Ok(Value::Scalar(read_primitive(buf, *kind, offset)?)),
        Descriptor::Simple(fields) => {
            let mut cursor = offset;
            let mut out = Vec::with_capacity(fields.len());
            for (name, kind) in fields {
                out.push((name.clone(), Value::Scalar(read_primitive(buf, *kind, cursor)?)));
                cursor += kind.size();
            }
            Ok(Value::Record(out))
        }
        Descriptor::Complex(fields) => {
            let mut cursor = offset;
            let mut out = Vec::with_capacity(fields.len());
            for (name, child) in fields {
                out.push((name.clone(), read_fields(buf, child, cursor)?));
                cursor += child.size_of();
            }
            Ok(Value::Record(out))
        }
    }
}

fn field_of<'a>(value: &'a Value, name: &str) -> &'a Value {
    match value.field(name) {
        Some(field) => field,
        None => panic!("record has no field '{}'", name),
    }
}

fn scalar_of(value: &Value, name: &str) -> crate::layout::Scalar {
    match value.as_scalar() {
        Some(scalar) => scalar,
        None => panic!("field '{}' is a record where a primitive is declared", name),
    }
}

/// Fails loudly when a value's structure disagrees with its descriptor.
fn assert_layout(value: &Value, descriptor: &Descriptor) {
    if !value.shape_matches(descriptor) {
        panic!(
            "value does not match descriptor layout\n  value: {:?}\n  descriptor: {:?}",
            value, descriptor
        );
    }
}
