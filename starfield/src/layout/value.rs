//! Dynamic values that can be marshaled against a [`Descriptor`].

use std::fmt;

use super::{Descriptor, PrimitiveKind};

/// A single primitive value tagged with its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Scalar {
    /// The kind this scalar natively carries.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
        }
    }

    /// Exact integer value, if there is one.
    ///
    /// Floats qualify only when they are finite and have no fractional part.
    pub fn to_integer(&self) -> Option<i128> {
        match *self {
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::U64(v) => Some(v.into()),
            Self::I8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::I64(v) => Some(v.into()),
            Self::F32(v) => float_to_integer(v.into()),
            Self::F64(v) => float_to_integer(v),
        }
    }

    /// Numeric value as an `f64`. Wide integers may lose precision.
    pub fn to_f64(&self) -> f64 {
        match *self {
            Self::U8(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::U64(v) => v as f64,
            Self::I8(v) => v.into(),
            Self::I16(v) => v.into(),
            Self::I32(v) => v.into(),
            Self::I64(v) => v as f64,
            Self::F32(v) => v.into(),
            Self::F64(v) => v,
        }
    }
}

fn float_to_integer(v: f64) -> Option<i128> {
    // 2^127 is the first value outside the i128 range.
    const LIMIT: f64 = 1.7014118346046923e38;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < LIMIT {
        Some(v as i128)
    } else {
        None
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

scalar_from! {
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    f32 => F32, f64 => F64,
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8(v) => write!(f, "{}u8", v),
            Self::U16(v) => write!(f, "{}u16", v),
            Self::U32(v) => write!(f, "{}u32", v),
            Self::U64(v) => write!(f, "{}u64", v),
            Self::I8(v) => write!(f, "{}i8", v),
            Self::I16(v) => write!(f, "{}i16", v),
            Self::I32(v) => write!(f, "{}i32", v),
            Self::I64(v) => write!(f, "{}i64", v),
            Self::F32(v) => write!(f, "{}f32", v),
            Self::F64(v) => write!(f, "{}f64", v),
        }
    }
}

/// A scalar or a record of named values.
///
/// Records keep their fields in a `Vec`, but matching against a descriptor
/// is by name, so field order in a value does not have to follow the
/// descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Record(Vec<(String, Value)>),
}

impl Value {
    /// Builds a record value.
    pub fn record<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Looks up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            Self::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Record(_) => None,
        }
    }

    /// Returns true if this value has exactly the fields `descriptor` names,
    /// recursively, with scalars where primitives are expected.
    ///
    /// Only structure is checked. Whether a scalar fits its declared kind is
    /// decided at encode time.
    pub fn shape_matches(&self, descriptor: &Descriptor) -> bool {
        match (self, descriptor) {
            (Self::Scalar(_), Descriptor::Primitive(_)) => true,
            (Self::Record(values), Descriptor::Simple(fields)) => {
                values.len() == fields.len()
                    && fields.iter().all(|(name, _)| {
                        matches!(self.field(name), Some(Self::Scalar(_)))
                    })
            }
            (Self::Record(values), Descriptor::Complex(fields)) => {
                values.len() == fields.len()
                    && fields.iter().all(|(name, child)| {
                        self.field(name)
                            .is_some_and(|value| value.shape_matches(child))
                    })
            }
            _ => false,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Scalar(Scalar::F64(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Scalar(Scalar::F32(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Scalar(Scalar::U32(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Scalar(Scalar::I32(v))
    }
}
