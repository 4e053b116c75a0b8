//! Primitive field kinds and decoded values.
//!
//! Every field on the wire is little-endian and packed with no padding.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::SchemaError;

/// Primitive numeric kind of a single payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
}

impl FieldKind {
    /// Number of payload bytes the field occupies.
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 | FieldKind::F32 => 4,
        }
    }

    /// Struct-format character for this kind (`B`, `b`, `H`, `h`, `I`, `i`, `f`).
    pub const fn format_char(self) -> char {
        match self {
            FieldKind::U8 => 'B',
            FieldKind::I8 => 'b',
            FieldKind::U16 => 'H',
            FieldKind::I16 => 'h',
            FieldKind::U32 => 'I',
            FieldKind::I32 => 'i',
            FieldKind::F32 => 'f',
        }
    }

    /// Map a struct-format character to a kind.
    pub fn from_format_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(FieldKind::U8),
            'b' => Some(FieldKind::I8),
            'H' => Some(FieldKind::U16),
            'h' => Some(FieldKind::I16),
            'I' | 'L' => Some(FieldKind::U32),
            'i' | 'l' => Some(FieldKind::I32),
            'f' => Some(FieldKind::F32),
            _ => None,
        }
    }

    /// Canonical lowercase name (`u8`, `i16`, `f32`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            FieldKind::U8 => "u8",
            FieldKind::I8 => "i8",
            FieldKind::U16 => "u16",
            FieldKind::I16 => "i16",
            FieldKind::U32 => "u32",
            FieldKind::I32 => "i32",
            FieldKind::F32 => "f32",
        }
    }

    /// Read one value of this kind from exactly `width()` bytes.
    pub(crate) fn read_le(self, bytes: &[u8]) -> FieldValue {
        match self {
            FieldKind::U8 => FieldValue::U8(bytes[0]),
            FieldKind::I8 => FieldValue::I8(bytes[0] as i8),
            FieldKind::U16 => FieldValue::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
            FieldKind::I16 => FieldValue::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
            FieldKind::U32 => FieldValue::U32(u32::from_le_bytes(le4(bytes))),
            FieldKind::I32 => FieldValue::I32(i32::from_le_bytes(le4(bytes))),
            FieldKind::F32 => FieldValue::F32(f32::from_le_bytes(le4(bytes))),
        }
    }
}

fn le4(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Ok(FieldKind::U8),
            "i8" | "int8" => Ok(FieldKind::I8),
            "u16" | "uint16" => Ok(FieldKind::U16),
            "i16" | "int16" => Ok(FieldKind::I16),
            "u32" | "uint32" => Ok(FieldKind::U32),
            "i32" | "int32" => Ok(FieldKind::I32),
            "f32" | "float" | "float32" => Ok(FieldKind::F32),
            _ => Err(SchemaError::UnknownFieldKind(s.to_string())),
        }
    }
}

/// A decoded field value. Raw, with no unit conversion applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
}

impl FieldValue {
    /// The kind this value was decoded as.
    pub const fn kind(&self) -> FieldKind {
        match self {
            FieldValue::U8(_) => FieldKind::U8,
            FieldValue::I8(_) => FieldKind::I8,
            FieldValue::U16(_) => FieldKind::U16,
            FieldValue::I16(_) => FieldKind::I16,
            FieldValue::U32(_) => FieldKind::U32,
            FieldValue::I32(_) => FieldKind::I32,
            FieldValue::F32(_) => FieldKind::F32,
        }
    }

    /// Widen to `f64`. Exact for every integer kind.
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::U8(v) => f64::from(v),
            FieldValue::I8(v) => f64::from(v),
            FieldValue::U16(v) => f64::from(v),
            FieldValue::I16(v) => f64::from(v),
            FieldValue::U32(v) => f64::from(v),
            FieldValue::I32(v) => f64::from(v),
            FieldValue::F32(v) => f64::from(v),
        }
    }

    /// Integer view, `None` for floats.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FieldValue::U8(v) => Some(i64::from(v)),
            FieldValue::I8(v) => Some(i64::from(v)),
            FieldValue::U16(v) => Some(i64::from(v)),
            FieldValue::I16(v) => Some(i64::from(v)),
            FieldValue::U32(v) => Some(i64::from(v)),
            FieldValue::I32(v) => Some(i64::from(v)),
            FieldValue::F32(_) => None,
        }
    }

    pub(crate) fn write_le(&self, dst: &mut Vec<u8>) {
        match *self {
            FieldValue::U8(v) => dst.push(v),
            FieldValue::I8(v) => dst.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U16(v) => dst.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I16(v) => dst.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U32(v) => dst.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I32(v) => dst.extend_from_slice(&v.to_le_bytes()),
            FieldValue::F32(v) => dst.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::U8(v) => write!(f, "{v}"),
            FieldValue::I8(v) => write!(f, "{v}"),
            FieldValue::U16(v) => write!(f, "{v}"),
            FieldValue::I16(v) => write!(f, "{v}"),
            FieldValue::U32(v) => write!(f, "{v}"),
            FieldValue::I32(v) => write!(f, "{v}"),
            FieldValue::F32(v) => write!(f, "{v}"),
        }
    }
}
