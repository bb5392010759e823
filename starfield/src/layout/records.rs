//! Descriptors for the records exchanged with the kernel.

use std::sync::LazyLock;

use super::{Descriptor, PrimitiveKind, Scalar, Value};
use crate::coord::{Coordinate, ProjectedPoint};

/// `{ latitude: f64, longitude: f64 }`, radians, 16 bytes.
pub static COORDINATE: LazyLock<Descriptor> = LazyLock::new(|| {
    Descriptor::simple([
        ("latitude", PrimitiveKind::F64),
        ("longitude", PrimitiveKind::F64),
    ])
});

/// `{ x: f32, y: f32, brightness: f32 }`, 12 bytes.
pub static PROJECTED_POINT: LazyLock<Descriptor> = LazyLock::new(|| {
    Descriptor::simple([
        ("x", PrimitiveKind::F32),
        ("y", PrimitiveKind::F32),
        ("brightness", PrimitiveKind::F32),
    ])
});

/// A Rust type with a fixed kernel-side record layout.
pub trait Marshal: Sized {
    /// Layout of the record in kernel memory.
    fn descriptor() -> &'static Descriptor;

    fn to_value(&self) -> Value;

    /// Rebuilds the type from a decoded value.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not have this type's layout.
    fn from_value(value: &Value) -> Self;
}

fn scalar_field(value: &Value, name: &str) -> Scalar {
    match value.field(name) {
        Some(Value::Scalar(s)) => *s,
        _ => panic!("record is missing scalar field '{}'", name),
    }
}

impl Marshal for Coordinate {
    fn descriptor() -> &'static Descriptor {
        &COORDINATE
    }

    fn to_value(&self) -> Value {
        Value::record([("latitude", self.latitude), ("longitude", self.longitude)])
    }

    fn from_value(value: &Value) -> Self {
        Self::new(
            scalar_field(value, "latitude").to_f64(),
            scalar_field(value, "longitude").to_f64(),
        )
    }
}

impl Marshal for ProjectedPoint {
    fn descriptor() -> &'static Descriptor {
        &PROJECTED_POINT
    }

    fn to_value(&self) -> Value {
        Value::record([
            ("x", self.x),
            ("y", self.y),
            ("brightness", self.brightness),
        ])
    }

    fn from_value(value: &Value) -> Self {
        Self::new(
            scalar_field(value, "x").to_f64() as f32,
            scalar_field(value, "y").to_f64() as f32,
            scalar_field(value, "brightness").to_f64() as f32,
        )
    }
}
