//! Record descriptors: data-only descriptions of a record's byte layout.

use super::PrimitiveKind;

/// Byte layout of a value marshaled into kernel memory.
///
/// Field order is significant. Offsets are assigned in declaration order and
/// must match the layout the kernel was compiled with, so fields live in a
/// `Vec` and are never reordered.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    /// A single primitive
    Primitive(PrimitiveKind),
    /// A record whose fields are all primitives
    Simple(Vec<(String, PrimitiveKind)>),
    /// A record whose fields are themselves described by descriptors
    Complex(Vec<(String, Descriptor)>),
}

impl Descriptor {
    /// Builds a simple record descriptor.
    ///
    /// # Panics
    ///
    /// Panics if a field name appears twice.
    pub fn simple<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, PrimitiveKind)>,
        K: Into<String>,
    {
        let fields: Vec<(String, PrimitiveKind)> =
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        assert_unique(fields.iter().map(|(name, _)| name.as_str()));
        Self::Simple(fields)
    }

    /// Builds a complex record descriptor from nested descriptors.
    ///
    /// # Panics
    ///
    /// Panics if a field name appears twice.
    pub fn complex<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Descriptor)>,
        K: Into<String>,
    {
        let fields: Vec<(String, Descriptor)> =
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect();
        assert_unique(fields.iter().map(|(name, _)| name.as_str()));
        Self::Complex(fields)
    }

    /// Total byte length, summed over the fields recursively.
    pub fn size_of(&self) -> usize {
        match self {
            Self::Primitive(kind) => kind.size(),
            Self::Simple(fields) => fields.iter().map(|(_, kind)| kind.size()).sum(),
            Self::Complex(fields) => fields.iter().map(|(_, child)| child.size_of()).sum(),
        }
    }

    /// Returns true if every field is a primitive.
    #[inline]
    pub fn is_simple(&self) -> bool {
        matches!(self, Self::Simple(_))
    }

    /// Returns true if at least one field is a nested descriptor.
    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }

    /// Number of top-level fields (zero for a primitive).
    pub fn field_count(&self) -> usize {
        match self {
            Self::Primitive(_) => 0,
            Self::Simple(fields) => fields.len(),
            Self::Complex(fields) => fields.len(),
        }
    }

    /// Byte offset of a top-level field from the start of the record.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        match self {
            Self::Primitive(_) => None,
            Self::Simple(fields) => {
                for (field, kind) in fields {
                    if field == name {
                        return Some(offset);
                    }
                    offset += kind.size();
                }
                None
            }
            Self::Complex(fields) => {
                for (field, child) in fields {
                    if field == name {
                        return Some(offset);
                    }
                    offset += child.size_of();
                }
                None
            }
        }
    }
}

fn assert_unique<'a>(names: impl Iterator<Item = &'a str>) {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        assert!(
            !seen.contains(&name),
            "descriptor declares field '{}' more than once",
            name
        );
        seen.push(name);
    }
}
