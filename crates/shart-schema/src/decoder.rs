use serde::Serialize;

use crate::error::{Result, SchemaError};
use crate::field::FieldValue;
use crate::spec::{PacketSpec, PacketTag};

/// A validated packet with its payload decoded into raw field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedPacket {
    /// Packet type tag.
    pub tag: PacketTag,
    /// Field values in layout order.
    pub fields: Vec<FieldValue>,
}

impl DecodedPacket {
    /// Decode `payload` with `spec` and attach the tag.
    pub fn decode(tag: PacketTag, spec: &PacketSpec, payload: &[u8]) -> Result<Self> {
        Ok(Self {
            tag,
            fields: decode(spec, payload)?,
        })
    }
}

/// Decode a fixed-size payload into field values following `spec`'s layout.
pub fn decode(spec: &PacketSpec, payload: &[u8]) -> Result<Vec<FieldValue>> {
    if payload.len() != spec.payload_length() {
        return Err(SchemaError::LayoutMismatch {
            expected: spec.payload_length(),
            actual: payload.len(),
        });
    }

    let mut values = Vec::with_capacity(spec.field_count());
    let mut offset = 0usize;
    for kind in spec.fields() {
        let end = offset + kind.width();
        values.push(kind.read_le(&payload[offset..end]));
        offset = end;
    }

    Ok(values)
}

/// Encode field values into a payload following `spec`'s layout.
pub fn encode(spec: &PacketSpec, values: &[FieldValue]) -> Result<Vec<u8>> {
    if values.len() != spec.field_count() {
        return Err(SchemaError::FieldCount {
            expected: spec.field_count(),
            actual: values.len(),
        });
    }

    let mut payload = Vec::with_capacity(spec.payload_length());
    for (index, (kind, value)) in spec.fields().iter().zip(values).enumerate() {
        if value.kind() != *kind {
            return Err(SchemaError::ValueKind {
                index,
                expected: *kind,
                actual: value.kind(),
            });
        }
        value.write_le(&mut payload);
    }

    Ok(payload)
}
