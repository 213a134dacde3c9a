use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Growable bit sequence packed MSB-first into bytes.
///
/// Bits past `len` in the last byte are always zero, so derived equality is
/// equality of the bit sequences.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct BitString {
    bytes: Vec<u8>,
    len: usize,
}

impl BitString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            len: 0,
        }
    }

    /// Take `len` bits from a packed buffer, zeroing anything beyond them.
    pub fn from_bytes(mut bytes: Vec<u8>, len: usize) -> Self {
        let len = len.min(bytes.len() * 8);
        bytes.truncate(len.div_ceil(8));
        if len % 8 != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= 0xFF << (8 - len % 8);
            }
        }
        Self { bytes, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Packed bytes; the final byte is zero-padded.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn push(&mut self, bit: bool) {
        let offset = self.len % 8;
        if offset == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> offset;
        }
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<bool> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let (byte, offset) = (self.len / 8, self.len % 8);
        let bit = self.bytes[byte] & (0x80 >> offset) != 0;
        self.bytes[byte] &= !(0x80 >> offset);
        if offset == 0 {
            self.bytes.pop();
        }
        Some(bit)
    }

    pub fn extend_from(&mut self, other: &BitString) {
        if self.len % 8 == 0 {
            self.bytes.extend_from_slice(&other.bytes);
            self.len += other.len;
            return;
        }
        for bit in other.iter() {
            self.push(bit);
        }
    }

    pub fn get(&self, i: usize) -> Option<bool> {
        (i < self.len).then(|| self.bytes[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bytes[i / 8] & (0x80 >> (i % 8)) != 0)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.iter() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString({self})")
    }
}

impl FromStr for BitString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bits = BitString::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                other => return Err(Error::InvalidBit(other)),
            }
        }
        Ok(bits)
    }
}

impl FromIterator<bool> for BitString {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bits = BitString::new();
        for bit in iter {
            bits.push(bit);
        }
        bits
    }
}

impl From<BitString> for String {
    fn from(bits: BitString) -> Self {
        bits.to_string()
    }
}

impl TryFrom<String> for BitString {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing() {
        let bits: BitString = "1010000011".parse().unwrap();
        assert_eq!(bits.len(), 10);
        assert_eq!(bits.as_bytes(), &[0b1010_0000, 0b1100_0000]);
        assert_eq!(bits.get(8), Some(true));
        assert_eq!(bits.get(10), None);
        assert_eq!(bits.to_string(), "1010000011");
    }

    #[test]
    fn test_push_pop() {
        let mut bits = BitString::new();
        for b in [true, false, true, true, false, false, true, false, true] {
            bits.push(b);
        }
        assert_eq!(bits.pop(), Some(true));
        assert_eq!(bits.as_bytes().len(), 1);
        assert_eq!(bits, "10110010".parse().unwrap());
        assert_eq!(bits.pop(), Some(false));
        // Cleared bit must not leak into equality.
        assert_eq!(bits, "1011001".parse().unwrap());
    }

    #[test]
    fn test_extend_unaligned() {
        let mut a: BitString = "101".parse().unwrap();
        let b: BitString = "0111111110".parse().unwrap();
        a.extend_from(&b);
        assert_eq!(a.to_string(), "1010111111110");

        let mut aligned: BitString = "11110000".parse().unwrap();
        aligned.extend_from(&"01".parse().unwrap());
        assert_eq!(aligned.to_string(), "1111000001");
    }

    #[test]
    fn test_from_bytes_masks_tail() {
        let bits = BitString::from_bytes(vec![0xFF, 0xFF, 0xFF], 11);
        assert_eq!(bits.as_bytes(), &[0xFF, 0xE0]);
        assert_eq!(bits, "11111111111".parse().unwrap());
    }

    #[test]
    fn test_rejects_non_binary_text() {
        assert_eq!("0120".parse::<BitString>(), Err(Error::InvalidBit('2')));
        assert!(serde_json::from_str::<BitString>("\"01x\"").is_err());
        let ok: BitString = serde_json::from_str("\"0110\"").unwrap();
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"0110\"");
    }
}
