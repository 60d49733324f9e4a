//! Element types of remote arrays.

use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte order of multi-byte elements on the wire.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum Endianness {
    /// `<` in a type string.
    Little,
    /// `>` in a type string.
    Big,
}

impl Endianness {
    /// Whether elements in this byte order can be reinterpreted without swapping.
    #[must_use]
    pub fn is_native(self) -> bool {
        self == NATIVE_ENDIAN
    }
}

/// Byte order of the target platform.
pub const NATIVE_ENDIAN: Endianness = if cfg!(target_endian = "big") {
    Endianness::Big
} else {
    Endianness::Little
};

/// Element data types supported by array structures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[rustfmt::skip]
pub enum DataType {
    /// One byte per element, zero is `false`.
    Bool,
    /// Signed 8-bit integer, `i8`.
    Int8,
    /// Signed 16-bit integer, `i16`.
    Int16,
    /// Signed 32-bit integer, `i32`.
    Int32,
    /// Signed 64-bit integer, `i64`.
    Int64,
    /// Unsigned 8-bit integer, `u8`.
    UInt8,
    /// Unsigned 16-bit integer, `u16`.
    UInt16,
    /// Unsigned 32-bit integer, `u32`.
    UInt32,
    /// Unsigned 64-bit integer, `u64`.
    UInt64,
    /// `f32`.
    Float32,
    /// `f64`.
    Float64,
}

impl DataType {
    /// Lowercase name, as used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Bytes per element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Bool | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    const fn kind(&self) -> char {
        match self {
            Self::Bool => 'b',
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => 'i',
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => 'u',
            Self::Float32 | Self::Float64 => 'f',
        }
    }

    fn from_kind_size(kind: char, size: usize) -> Option<Self> {
        Some(match (kind, size) {
            ('b', 1) => Self::Bool,
            ('i', 1) => Self::Int8,
            ('i', 2) => Self::Int16,
            ('i', 4) => Self::Int32,
            ('i', 8) => Self::Int64,
            ('u', 1) => Self::UInt8,
            ('u', 2) => Self::UInt16,
            ('u', 4) => Self::UInt32,
            ('u', 8) => Self::UInt64,
            ('f', 4) => Self::Float32,
            ('f', 8) => Self::Float64,
            _ => return None,
        })
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The element type of an array: a [`DataType`] and the byte order of its encoded elements.
///
/// Serialised as a numpy-style type string, e.g. `"<f8"` (little endian float64), `">i4"` (big endian int32) or `"|u1"` (single byte).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementType {
    data_type: DataType,
    endianness: Endianness,
}

impl ElementType {
    /// Create a new element type.
    #[must_use]
    pub const fn new(data_type: DataType, endianness: Endianness) -> Self {
        Self {
            data_type,
            endianness,
        }
    }

    /// Create a new element type with the native byte order.
    #[must_use]
    pub const fn native(data_type: DataType) -> Self {
        Self::new(data_type, NATIVE_ENDIAN)
    }

    /// The data type.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The byte order of encoded elements.
    #[must_use]
    pub const fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The size in bytes of an element.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.data_type.size()
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let order = if self.size() == 1 {
            '|'
        } else {
            match self.endianness {
                Endianness::Little => '<',
                Endianness::Big => '>',
            }
        };
        write!(f, "{order}{}{}", self.data_type.kind(), self.size())
    }
}

impl FromStr for ElementType {
    type Err = UnsupportedElementTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || UnsupportedElementTypeError(s.to_string());
        let mut chars = s.chars();
        let endianness = match chars.next().ok_or_else(err)? {
            '<' => Endianness::Little,
            '>' => Endianness::Big,
            '|' | '=' => NATIVE_ENDIAN,
            _ => return Err(err()),
        };
        let kind = chars.next().ok_or_else(err)?;
        let size: usize = chars.as_str().parse().map_err(|_| err())?;
        let data_type = DataType::from_kind_size(kind, size).ok_or_else(err)?;
        Ok(Self::new(data_type, endianness))
    }
}

impl TryFrom<String> for ElementType {
    type Error = UnsupportedElementTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ElementType> for String {
    fn from(value: ElementType) -> Self {
        value.to_string()
    }
}

/// An unsupported element type error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported element type {_0:?}")]
pub struct UnsupportedElementTypeError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_parse() {
        let element_type: ElementType = "<f8".parse().unwrap();
        assert_eq!(element_type.data_type(), DataType::Float64);
        assert_eq!(element_type.endianness(), Endianness::Little);
        assert_eq!(element_type.size(), 8);

        let element_type: ElementType = ">i4".parse().unwrap();
        assert_eq!(element_type.data_type(), DataType::Int32);
        assert_eq!(element_type.endianness(), Endianness::Big);
        assert_eq!(element_type.to_string(), ">i4");

        assert_eq!(
            "|b1".parse::<ElementType>().unwrap().data_type(),
            DataType::Bool
        );
        assert_eq!(
            ElementType::new(DataType::UInt8, Endianness::Big).to_string(),
            "|u1"
        );
    }

    #[test]
    fn element_type_unsupported() {
        assert!("<f2".parse::<ElementType>().is_err());
        assert!("<c16".parse::<ElementType>().is_err());
        assert!("f8".parse::<ElementType>().is_err());
        assert!("".parse::<ElementType>().is_err());
        assert!("<u".parse::<ElementType>().is_err());
    }

    #[test]
    fn element_type_serde() {
        let element_type: ElementType = serde_json::from_str(r#""<u2""#).unwrap();
        assert_eq!(element_type.data_type(), DataType::UInt16);
        assert_eq!(serde_json::to_string(&element_type).unwrap(), r#""<u2""#);
        assert!(serde_json::from_str::<ElementType>(r#""<x9""#).is_err());
    }
}
