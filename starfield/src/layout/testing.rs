//! Proptest strategies for descriptors and matching values.

use super::{Descriptor, PrimitiveKind, Scalar, Value};
use proptest::prelude::*;

pub(crate) fn kind_strategy() -> impl Strategy<Value = PrimitiveKind> {
    proptest::sample::select(PrimitiveKind::ALL.to_vec())
}

/// Arbitrary simple/complex descriptors nested up to four levels deep.
pub(crate) fn descriptor_strategy() -> impl Strategy<Value = Descriptor> {
    let leaf = prop::collection::vec(kind_strategy(), 1..5).prop_map(|kinds| {
        Descriptor::simple(
            kinds
                .into_iter()
                .enumerate()
                .map(|(i, kind)| (format!("f{}", i), kind)),
        )
    });
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop::collection::vec(inner, 1..4).prop_map(|children| {
            Descriptor::complex(
                children
                    .into_iter()
                    .enumerate()
                    .map(|(i, child)| (format!("c{}", i), child)),
            )
        })
    })
}

/// Scalars that fit `kind` exactly. NaN is excluded so values compare equal.
pub(crate) fn scalar_strategy(kind: PrimitiveKind) -> BoxedStrategy<Scalar> {
    match kind {
        PrimitiveKind::U8 => any::<u8>().prop_map(Scalar::U8).boxed(),
        PrimitiveKind::U16 => any::<u16>().prop_map(Scalar::U16).boxed(),
        PrimitiveKind::U32 => any::<u32>().prop_map(Scalar::U32).boxed(),
        PrimitiveKind::U64 => any::<u64>().prop_map(Scalar::U64).boxed(),
        PrimitiveKind::I8 => any::<i8>().prop_map(Scalar::I8).boxed(),
        PrimitiveKind::I16 => any::<i16>().prop_map(Scalar::I16).boxed(),
        PrimitiveKind::I32 => any::<i32>().prop_map(Scalar::I32).boxed(),
        PrimitiveKind::I64 => any::<i64>().prop_map(Scalar::I64).boxed(),
        PrimitiveKind::F32 => (-1.0e30f32..1.0e30f32).prop_map(Scalar::F32).boxed(),
        PrimitiveKind::F64 => (-1.0e300f64..1.0e300f64).prop_map(Scalar::F64).boxed(),
    }
}

/// Values that structurally match `descriptor`.
pub(crate) fn value_strategy(descriptor: &Descriptor) -> BoxedStrategy<Value> {
    match descriptor {
        Descriptor::Primitive(kind) => scalar_strategy(*kind).prop_map(Value::Scalar).boxed(),
        Descriptor::Simple(fields) => {
            let parts: Vec<BoxedStrategy<(String, Value)>> = fields
                .iter()
                .map(|(name, kind)| {
                    let name = name.clone();
                    scalar_strategy(*kind)
                        .prop_map(move |s| (name.clone(), Value::Scalar(s)))
                        .boxed()
                })
                .collect();
            parts.prop_map(Value::Record).boxed()
        }
        Descriptor::Complex(fields) => {
            let parts: Vec<BoxedStrategy<(String, Value)>> = fields
                .iter()
                .map(|(name, child)| {
                    let name = name.clone();
                    value_strategy(child)
                        .prop_map(move |v| (name.clone(), v))
                        .boxed()
                })
                .collect();
            parts.prop_map(Value::Record).boxed()
        }
    }
}

/// A descriptor paired with a value that matches it.
pub(crate) fn described_value() -> impl Strategy<Value = (Descriptor, Value)> {
    descriptor_strategy().prop_flat_map(|descriptor| {
        let values = value_strategy(&descriptor);
        (Just(descriptor), values)
    })
}
