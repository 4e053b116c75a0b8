//! Rolling two-byte payload checksum.
//!
//! `a` is the byte sum and `b` the running sum of `a`, both modulo 256, so `b`
//! catches reordered bytes that a plain sum would miss.

use std::fmt;

/// Checksum bytes as carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChecksumPair {
    pub a: u8,
    pub b: u8,
}

impl ChecksumPair {
    pub const fn new(a: u8, b: u8) -> Self {
        Self { a, b }
    }
}

impl fmt::Display for ChecksumPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:#04x}, {:#04x})", self.a, self.b)
    }
}

/// Compute the checksum over a payload.
pub fn compute(payload: &[u8]) -> ChecksumPair {
    payload
        .iter()
        .fold(ChecksumPair::default(), |ChecksumPair { a, b }, &x| {
            let a = a.wrapping_add(x);
            ChecksumPair::new(a, b.wrapping_add(a))
        })
}
