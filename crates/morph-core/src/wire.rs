//! Little-endian wire primitives and section framing.
//!
//! Every persisted structure is written as a section:
//!
//! ```text
//! tag: [u8; 2]        ASCII section tag, see the constants on SectionTag
//! count: u16 | u32    element count, width fixed per structure
//! elements            each written by the element's own writer
//! ```
//!
//! Readers work on an in-memory slice. A section reader consumes exactly the
//! bytes of its section and leaves the rest for the caller; only the
//! top-level index decoder treats leftover bytes as an error.

use std::fmt;
use std::io::{self, Write};

use crate::error::DecodeError;

/// Two ASCII bytes that open a section.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct SectionTag(pub [u8; 2]);

impl SectionTag {
    pub const TAG_DICTIONARY: SectionTag = SectionTag(*b"TD");
    pub const TAG_SETS: SectionTag = SectionTag(*b"TS");
    pub const COLLECTIONS: SectionTag = SectionTag(*b"CD");
    pub const ITEMS: SectionTag = SectionTag(*b"ID");

    pub fn write_to<W: Write>(self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.0)
    }
}

impl fmt::Display for SectionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex(&self.0))
    }
}

/// Lowercase hex rendering used in decode errors.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A fixed-width value that can be stored inside a deduplication table.
pub trait WireElement: Sized {
    /// Encoded size in bytes.
    const WIDTH: usize;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()>;

    fn read_from(r: &mut Reader<'_>) -> Result<Self, DecodeError>;
}

#[inline]
pub fn write_u8<W: Write>(w: &mut W, value: u8) -> io::Result<()> {
    w.write_all(&[value])
}

#[inline]
pub fn write_u16<W: Write>(w: &mut W, value: u16) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

#[inline]
pub fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

/// Cursor over an encoded byte slice.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    /// Offset of the next unread byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail with `Truncated` unless at least `needed` bytes remain.
    pub fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.read_array::<1>().map(|b| b[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Read a section tag and check it against `expected`.
    pub fn expect_section(&mut self, expected: SectionTag) -> Result<(), DecodeError> {
        let actual = self.read_array::<2>()?;
        if actual != expected.0 {
            return Err(DecodeError::SectionTag {
                expected: expected.to_string(),
                actual: hex(&actual),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut r = Reader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0x1234_5678);
        assert!(r.is_empty());
    }

    #[test]
    fn writers_match_readers() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 7).unwrap();
        write_u16(&mut buf, 0xbeef).unwrap();
        write_u32(&mut buf, 0xdead_beef).unwrap();

        let mut r = Reader::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16().unwrap(), 0xbeef);
        assert_eq!(r.read_u32().unwrap(), 0xdead_beef);
    }

    #[test]
    fn truncated_read_reports_offsets() {
        let data = [0u8; 3];
        let mut r = Reader::new(&data);
        r.read_u16().unwrap();
        let err = r.read_u32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 2,
                needed: 4,
                available: 1
            }
        );
        // A failed read does not advance the cursor.
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn section_tag_mismatch_is_hex_encoded() {
        let mut r = Reader::new(b"TSxx");
        let err = r.expect_section(SectionTag::TAG_DICTIONARY).unwrap_err();
        assert_eq!(
            err,
            DecodeError::SectionTag {
                expected: "5444".to_string(),
                actual: "5453".to_string(),
            }
        );
    }

    #[test]
    fn section_tag_match_consumes_two_bytes() {
        let mut r = Reader::new(b"IDrest");
        r.expect_section(SectionTag::ITEMS).unwrap();
        assert_eq!(r.remaining(), 4);
    }
}
