//! Native element types - the in-memory types a dataset buffer can hold.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

/// Datatype class, as reported by [`Datatype::class`](crate::container::Datatype::class).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeClass {
    /// Signed or unsigned integer
    Integer = 0,
    /// IEEE 754 floating point
    Float = 1,
    /// One-byte boolean
    Boolean = 2,
}

impl TypeClass {
    /// Convert from the on-disk class code.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Integer),
            1 => Some(Self::Float),
            2 => Some(Self::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
        };
        write!(f, "{}", name)
    }
}

/// Native atomic datatype.
///
/// Each variant has a fixed size and a well-defined little-endian binary
/// representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeType {
    Bool,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float16,
    Float32,
    Float64,
}

impl NativeType {
    /// Size in bytes of a single element.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 | Self::Float16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    /// Number of significant bits.
    #[inline]
    pub const fn precision(self) -> usize {
        self.size() * 8
    }

    /// Datatype class of this type.
    pub const fn class(self) -> TypeClass {
        match self {
            Self::Bool => TypeClass::Boolean,
            Self::Float16 | Self::Float32 | Self::Float64 => TypeClass::Float,
            _ => TypeClass::Integer,
        }
    }

    /// True for signed integers and floats.
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64
                | Self::Float16 | Self::Float32 | Self::Float64
        )
    }

    /// C-style name of this type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "hbool_t",
            Self::Int8 => "int8_t",
            Self::Uint8 => "uint8_t",
            Self::Int16 => "int16_t",
            Self::Uint16 => "uint16_t",
            Self::Int32 => "int32_t",
            Self::Uint32 => "uint32_t",
            Self::Int64 => "int64_t",
            Self::Uint64 => "uint64_t",
            Self::Float16 => "float16_t",
            Self::Float32 => "float32_t",
            Self::Float64 => "float64_t",
        }
    }

    /// Rebuild a type from its (class, size, signed) description.
    pub fn from_parts(class: TypeClass, size: usize, signed: bool) -> Option<Self> {
        let t = match (class, size, signed) {
            (TypeClass::Boolean, 1, _) => Self::Bool,
            (TypeClass::Integer, 1, true) => Self::Int8,
            (TypeClass::Integer, 1, false) => Self::Uint8,
            (TypeClass::Integer, 2, true) => Self::Int16,
            (TypeClass::Integer, 2, false) => Self::Uint16,
            (TypeClass::Integer, 4, true) => Self::Int32,
            (TypeClass::Integer, 4, false) => Self::Uint32,
            (TypeClass::Integer, 8, true) => Self::Int64,
            (TypeClass::Integer, 8, false) => Self::Uint64,
            (TypeClass::Float, 2, _) => Self::Float16,
            (TypeClass::Float, 4, _) => Self::Float32,
            (TypeClass::Float, 8, _) => Self::Float64,
            _ => return None,
        };
        Some(t)
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Trait for element types that can be transferred to and from datasets.
pub trait H5Type: Pod + Zeroable + Copy + Default {
    /// The native datatype matching this Rust type.
    const NATIVE: NativeType;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();
}

impl H5Type for u8 {
    const NATIVE: NativeType = NativeType::Uint8;
}

impl H5Type for i8 {
    const NATIVE: NativeType = NativeType::Int8;
}

impl H5Type for u16 {
    const NATIVE: NativeType = NativeType::Uint16;
}

impl H5Type for i16 {
    const NATIVE: NativeType = NativeType::Int16;
}

impl H5Type for u32 {
    const NATIVE: NativeType = NativeType::Uint32;
}

impl H5Type for i32 {
    const NATIVE: NativeType = NativeType::Int32;
}

impl H5Type for u64 {
    const NATIVE: NativeType = NativeType::Uint64;
}

impl H5Type for i64 {
    const NATIVE: NativeType = NativeType::Int64;
}

impl H5Type for f16 {
    const NATIVE: NativeType = NativeType::Float16;
}

impl H5Type for f32 {
    const NATIVE: NativeType = NativeType::Float32;
}

impl H5Type for f64 {
    const NATIVE: NativeType = NativeType::Float64;
}

/// Boolean with guaranteed 1-byte storage.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(v: Bool) -> Self {
        v.get()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl H5Type for Bool {
    const NATIVE: NativeType = NativeType::Bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_rust_types() {
        assert_eq!(<i32 as H5Type>::SIZE, NativeType::Int32.size());
        assert_eq!(<f16 as H5Type>::SIZE, NativeType::Float16.size());
        assert_eq!(<Bool as H5Type>::SIZE, NativeType::Bool.size());
        assert_eq!(NativeType::Float64.precision(), 64);
    }

    #[test]
    fn test_from_parts() {
        for t in [
            NativeType::Bool,
            NativeType::Int8,
            NativeType::Uint16,
            NativeType::Int64,
            NativeType::Float32,
        ] {
            assert_eq!(NativeType::from_parts(t.class(), t.size(), t.is_signed()), Some(t));
        }
        assert_eq!(NativeType::from_parts(TypeClass::Float, 3, true), None);
    }

    #[test]
    fn test_bool() {
        assert!(Bool::from(true).get());
        assert!(!bool::from(Bool::FALSE));
    }
}
