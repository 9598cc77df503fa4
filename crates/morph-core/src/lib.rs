//! Identifier types, packed-id arithmetic and wire primitives shared by every
//! layer of the morphological dictionary.
//!
//! Everything in the dictionary is addressed by small integers:
//! - [`TagId`]: one byte, assigned by the tag dictionary in first-seen order.
//! - [`TagSetId`] and [`VariantId`]: a [`Packed32`] holding a bucket number in
//!   the upper 16 bits and an offset within that bucket in the lower 16 bits.
//! - [`NodeId`]: dense 1-based trie node id, `0` being the implicit root.
//!
//! The bucket number stored in a packed id is the *length* of the item it
//! names, never `length - 1`. A packed value of `0` is therefore unreachable by
//! real data and is reserved for "empty" ([`PackedKey::EMPTY`]).

mod error;
pub mod wire;

use std::fmt;
use std::hash::Hash;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

pub use error::{DecodeError, Error, Result};
pub use wire::{Reader, SectionTag, WireElement};

/// A 32-bit value made of two 16-bit halves.
///
/// This is the only place in the crate family where ids are split or joined
/// by shifting; everything else goes through [`Packed32::new`],
/// [`Packed32::upper`] and [`Packed32::lower`].
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Packed32(pub u32);

impl Packed32 {
    /// Join `upper` and `lower` into one value.
    #[inline]
    pub const fn new(upper: u16, lower: u16) -> Self {
        Packed32(((upper as u32) << 16) | lower as u32)
    }

    /// The most significant half.
    #[inline]
    pub const fn upper(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The least significant half.
    #[inline]
    pub const fn lower(self) -> u16 {
        (self.0 & 0xffff) as u16
    }
}

/// An id produced by a bucket-by-length deduplication table.
///
/// Implementors are thin wrappers around a [`Packed32`] whose upper half is
/// the bucket number (the item length, 1-based) and whose lower half is the
/// offset inside that bucket.
pub trait PackedKey: Copy + Eq + Ord + Hash + fmt::Debug {
    /// The id of the empty item. Never produced for a non-empty item.
    const EMPTY: Self;

    fn from_packed(packed: Packed32) -> Self;

    fn packed(self) -> Packed32;

    /// Build an id from a bucket number (item length) and an offset.
    #[inline]
    fn pack(bucket: u16, offset: u16) -> Self {
        Self::from_packed(Packed32::new(bucket, offset))
    }

    /// The bucket number, equal to the length of the item.
    #[inline]
    fn bucket(self) -> u16 {
        self.packed().upper()
    }

    /// The position of the item inside its bucket.
    #[inline]
    fn offset(self) -> u16 {
        self.packed().lower()
    }

    #[inline]
    fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

/// Compact identifier of a tag, assigned by the tag dictionary.
///
/// One byte wide, so a dictionary holds at most [`TagId::MAX_COUNT`] tags.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct TagId(pub u8);

impl TagId {
    /// Number of distinct tag ids.
    pub const MAX_COUNT: usize = u8::MAX as usize + 1;

    /// Create a TagId from a dictionary position, failing once the id space
    /// is exhausted.
    #[inline]
    pub fn from_index(index: usize) -> Result<Self> {
        u8::try_from(index)
            .map(TagId)
            .map_err(|_| Error::Overflow {
                what: "tag dictionary",
                limit: Self::MAX_COUNT,
            })
    }

    /// Convert to usize for indexing.
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Id of a deduplicated, sorted set of [`TagId`]s (one grammatical reading).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
pub struct TagSetId(pub u32);

/// Id of a deduplicated, sorted collection of [`TagSetId`]s (every reading
/// of one word form). `VariantId(0)` means "no readings yet".
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
pub struct VariantId(pub u32);

impl PackedKey for TagSetId {
    const EMPTY: Self = TagSetId(0);

    #[inline]
    fn from_packed(packed: Packed32) -> Self {
        TagSetId(packed.0)
    }

    #[inline]
    fn packed(self) -> Packed32 {
        Packed32(self.0)
    }
}

impl PackedKey for VariantId {
    const EMPTY: Self = VariantId(0);

    #[inline]
    fn from_packed(packed: Packed32) -> Self {
        VariantId(packed.0)
    }

    #[inline]
    fn packed(self) -> Packed32 {
        Packed32(self.0)
    }
}

/// Dense id of a trie node. Real nodes start at 1; [`NodeId::ROOT`] is the
/// implicit root that never has an item of its own.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }

    /// Position of the node's item in the arena, `None` for the root.
    #[inline]
    pub fn arena_index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl WireElement for TagId {
    const WIDTH: usize = 1;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&[self.0])
    }

    fn read_from(r: &mut Reader<'_>) -> std::result::Result<Self, DecodeError> {
        r.read_u8().map(TagId)
    }
}

impl WireElement for TagSetId {
    const WIDTH: usize = 4;

    fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.0.to_le_bytes())
    }

    fn read_from(r: &mut Reader<'_>) -> std::result::Result<Self, DecodeError> {
        r.read_u32().map(TagSetId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed32_boundaries() {
        let cases = [
            (0u16, 0u16, 0u32),
            (0, 1, 0x0000_0001),
            (1, 0, 0x0001_0000),
            (0, u16::MAX, 0x0000_ffff),
            (u16::MAX, 0, 0xffff_0000),
            (u16::MAX, u16::MAX, u32::MAX),
            (0x1234, 0xabcd, 0x1234_abcd),
        ];
        for (upper, lower, raw) in cases {
            let packed = Packed32::new(upper, lower);
            assert_eq!(packed.0, raw, "packing ({upper:#x}, {lower:#x})");
            assert_eq!(packed.upper(), upper);
            assert_eq!(packed.lower(), lower);
        }
    }

    #[test]
    fn packed32_halves_do_not_bleed() {
        for shift in 0..16 {
            let bit = 1u16 << shift;
            assert_eq!(Packed32::new(bit, 0).lower(), 0);
            assert_eq!(Packed32::new(0, bit).upper(), 0);
            assert_eq!(Packed32::new(bit, 0).upper(), bit);
            assert_eq!(Packed32::new(0, bit).lower(), bit);
        }
    }

    #[test]
    fn first_real_id_is_not_empty() {
        // Bucket 1 (sets of length one), offset 0.
        let first = TagSetId::pack(1, 0);
        assert!(!first.is_empty());
        assert_eq!(first, TagSetId(0x0001_0000));
        assert!(TagSetId::EMPTY.is_empty());
        assert!(VariantId::default().is_empty());
    }

    #[test]
    fn packed_key_accessors() {
        let id = VariantId::pack(3, 17);
        assert_eq!(id.bucket(), 3);
        assert_eq!(id.offset(), 17);
        assert_eq!(id.packed(), Packed32::new(3, 17));
    }

    #[test]
    fn tag_id_from_index_limits() {
        assert_eq!(TagId::from_index(0).unwrap(), TagId(0));
        assert_eq!(TagId::from_index(255).unwrap(), TagId(255));
        assert!(matches!(
            TagId::from_index(256),
            Err(Error::Overflow { limit: 256, .. })
        ));
    }

    #[test]
    fn node_id_arena_index() {
        assert_eq!(NodeId::ROOT.arena_index(), None);
        assert_eq!(NodeId(1).arena_index(), Some(0));
        assert!(NodeId::ROOT.is_root());
        assert!(!NodeId(7).is_root());
        assert_eq!(NodeId(7).to_string(), "#7");
    }

    #[test]
    fn wire_elements_roundtrip() {
        let mut buf = Vec::new();
        TagId(200).write_to(&mut buf).unwrap();
        TagSetId(0x0002_0003).write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), TagId::WIDTH + TagSetId::WIDTH);

        let mut r = Reader::new(&buf);
        assert_eq!(TagId::read_from(&mut r).unwrap(), TagId(200));
        assert_eq!(TagSetId::read_from(&mut r).unwrap(), TagSetId(0x0002_0003));
        assert!(r.is_empty());
    }

    #[test]
    fn ids_serde_roundtrip() {
        let id = TagSetId::pack(2, 5);
        let json = serde_json::to_string(&id).unwrap();
        let back: TagSetId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
