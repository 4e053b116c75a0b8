use std::fmt;

use crate::error::{Result, SchemaError};
use crate::field::FieldKind;

/// Upper bound on the byte width of any layout.
pub const MAX_LAYOUT_WIDTH: usize = u16::MAX as usize;

/// One-byte packet type identifier.
pub type PacketTag = u8;

/// Fixed payload layout for one packet tag.
///
/// The sum of field widths always equals `payload_length`; both constructors
/// reject layouts that disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketSpec {
    payload_length: usize,
    fields: Vec<FieldKind>,
}

impl PacketSpec {
    /// Build a spec from an explicit field list.
    pub fn new(payload_length: usize, fields: Vec<FieldKind>) -> Result<Self> {
        let computed = layout_width(&fields);
        if computed != payload_length {
            return Err(SchemaError::LayoutLength {
                declared: payload_length,
                computed,
            });
        }
        Ok(Self {
            payload_length,
            fields,
        })
    }

    /// Build a spec from a struct-format string such as `"<I6i3Iif4B"`.
    pub fn from_format(payload_length: usize, format: &str) -> Result<Self> {
        Self::new(payload_length, parse_format(format)?)
    }

    /// Fixed payload length in bytes.
    pub fn payload_length(&self) -> usize {
        self.payload_length
    }

    /// Field kinds in wire order.
    pub fn fields(&self) -> &[FieldKind] {
        &self.fields
    }

    /// Number of decoded values this spec yields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Compact struct-format rendering, e.g. `<I6i3Iif4B`.
    pub fn format(&self) -> String {
        let mut out = String::from("<");
        let mut iter = self.fields.iter().peekable();
        while let Some(kind) = iter.next() {
            let mut run = 1usize;
            while iter.peek() == Some(&kind) {
                iter.next();
                run += 1;
            }
            if run > 1 {
                out.push_str(&run.to_string());
            }
            out.push(kind.format_char());
        }
        out
    }
}

impl fmt::Display for PacketSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.format(), self.payload_length)
    }
}

fn layout_width(fields: &[FieldKind]) -> usize {
    fields.iter().map(|kind| kind.width()).sum()
}

/// Parse a little-endian struct-format string into field kinds.
///
/// Accepts an optional leading `<`, then kind characters optionally prefixed
/// by a repeat count. Whitespace between items is ignored. Layouts wider than
/// [`MAX_LAYOUT_WIDTH`] are rejected before any field is expanded.
pub fn parse_format(format: &str) -> Result<Vec<FieldKind>> {
    let invalid = |reason: &str| SchemaError::InvalidFormat {
        format: format.to_string(),
        reason: reason.to_string(),
    };

    let mut body = format.trim_start();
    match body.chars().next() {
        Some('<') => body = &body[1..],
        Some('>' | '!') => return Err(invalid("big-endian layouts are not supported")),
        Some('=' | '@') => return Err(invalid("native byte order is ambiguous, use '<'")),
        _ => {}
    }

    let mut fields = Vec::new();
    let mut count: Option<usize> = None;
    let mut width = 0usize;

    for c in body.chars() {
        if c.is_whitespace() {
            if count.is_some() {
                return Err(invalid("repeat count must be followed by a field kind"));
            }
            continue;
        }
        if let Some(digit) = c.to_digit(10) {
            let next = count
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit as usize))
                .ok_or_else(|| invalid("repeat count overflows"))?;
            count = Some(next);
            continue;
        }

        let kind = FieldKind::from_format_char(c)
            .ok_or_else(|| invalid(&format!("unsupported field character '{c}'")))?;
        let repeat = count.take().unwrap_or(1);
        width = repeat
            .checked_mul(kind.width())
            .and_then(|run| run.checked_add(width))
            .filter(|total| *total <= MAX_LAYOUT_WIDTH)
            .ok_or_else(|| invalid(&format!("layout exceeds {MAX_LAYOUT_WIDTH} bytes")))?;
        fields.extend(std::iter::repeat(kind).take(repeat));
    }

    if count.is_some() {
        return Err(invalid("trailing repeat count"));
    }

    Ok(fields)
}
