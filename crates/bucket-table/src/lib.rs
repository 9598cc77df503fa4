//! Bucket-by-length deduplication tables.
//!
//! A [`BucketIndex`] interns sorted sequences of small fixed-width elements
//! and hands out a packed id per distinct sequence. Sequences are grouped by
//! length: every length gets its own [`BucketTable`], so the offset inside a
//! bucket stays within 16 bits even for large vocabularies.
//!
//! The same code serves two layers of the dictionary:
//! - [`TagSetIndex`]: sets of [`TagId`] (one reading) to [`TagSetId`]
//! - [`CollectionIndex`]: collections of [`TagSetId`] (all readings of a word
//!   form) to [`VariantId`]
//!
//! Identity is sorted content equality, so `{2, 1, 3}` and `{1, 2, 3}` share
//! an id. The empty sequence is never stored; it is always
//! [`PackedKey::EMPTY`].
//!
//! # Example
//!
//! ```
//! use bucket_table::TagSetIndex;
//! use morph_core::{PackedKey, TagId};
//!
//! let mut index = TagSetIndex::new();
//! let a = index.index(&mut [TagId(2), TagId(1), TagId(3)]).unwrap();
//! let b = index.index(&mut [TagId(1), TagId(2), TagId(3)]).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.bucket(), 3);
//! assert_eq!(index.get(a), Some(&[TagId(1), TagId(2), TagId(3)][..]));
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::io::Write;
use std::marker::PhantomData;

use morph_core::wire::{self, Reader, SectionTag};
use morph_core::{DecodeError, Error, PackedKey, Result, TagId, TagSetId, VariantId, WireElement};

/// Element type storable in a bucket table.
pub trait Element: WireElement + Copy + Ord + Hash + Debug {}

impl<T: WireElement + Copy + Ord + Hash + Debug> Element for T {}

/// Deduplicated sets of tags, one per grammatical reading.
pub type TagSetIndex = BucketIndex<TagId, TagSetId>;

/// Deduplicated collections of readings, one per distinct word-form variant.
pub type CollectionIndex = BucketIndex<TagSetId, VariantId>;

/// All sequences of one length.
///
/// Entries live back to back in `elements` (entry `i` occupies
/// `elements[i * width..(i + 1) * width]`). `sorted` holds entry offsets
/// ordered by entry content and is what lookups binary-search.
#[derive(Debug, Clone)]
pub struct BucketTable<E> {
    width: usize,
    elements: Vec<E>,
    sorted: Vec<u16>,
}

impl<E: Element> BucketTable<E> {
    /// Number of distinct entries one bucket can hold.
    pub const MAX_ENTRIES: usize = u16::MAX as usize + 1;

    /// Create an empty bucket for sequences of `width` elements.
    pub fn new(width: usize) -> Self {
        debug_assert!(width > 0, "bucket width must be positive");
        BucketTable {
            width,
            elements: Vec::new(),
            sorted: Vec::new(),
        }
    }

    /// Length of every sequence in this bucket.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len() / self.width
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The entry stored at `offset`, if any.
    pub fn entry(&self, offset: u16) -> Option<&[E]> {
        let start = offset as usize * self.width;
        self.elements.get(start..start + self.width)
    }

    /// Entry at an offset taken from `sorted`; always in range.
    #[inline]
    fn stored(&self, offset: u16) -> &[E] {
        let start = offset as usize * self.width;
        &self.elements[start..start + self.width]
    }

    fn search(&self, sorted_set: &[E]) -> std::result::Result<usize, usize> {
        self.sorted
            .binary_search_by(|&offset| self.stored(offset).cmp(sorted_set))
    }

    /// Look up an already sorted sequence.
    pub fn find(&self, sorted_set: &[E]) -> Option<u16> {
        if sorted_set.len() != self.width {
            return None;
        }
        self.search(sorted_set).ok().map(|idx| self.sorted[idx])
    }

    /// Sort `set` in place and return its offset, appending it if new.
    pub fn index(&mut self, set: &mut [E]) -> Result<u16> {
        if set.is_empty() {
            return Err(Error::EmptyInput("bucket entry"));
        }
        if set.len() != self.width {
            return Err(Error::WidthMismatch {
                expected: self.width,
                actual: set.len(),
            });
        }
        set.sort_unstable();

        match self.search(set) {
            Ok(idx) => Ok(self.sorted[idx]),
            Err(insert_pos) => {
                let len = self.len();
                if len >= Self::MAX_ENTRIES {
                    return Err(Error::Overflow {
                        what: "bucket",
                        limit: Self::MAX_ENTRIES,
                    });
                }
                let offset = len as u16;
                self.elements.extend_from_slice(set);
                self.sorted.insert(insert_pos, offset);
                Ok(offset)
            }
        }
    }

    /// Entries in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &[E])> {
        self.elements
            .chunks_exact(self.width)
            .enumerate()
            .map(|(i, entry)| (i as u16, entry))
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        wire::write_u32(w, self.len() as u32)?;
        for element in &self.elements {
            element.write_to(w)?;
        }
        Ok(())
    }

    fn decode(r: &mut Reader<'_>, width: usize) -> Result<Self> {
        let count = r.read_u32()? as usize;
        if count > Self::MAX_ENTRIES {
            return Err(DecodeError::Inconsistent(format!(
                "bucket of width {width} declares {count} entries, at most {} fit",
                Self::MAX_ENTRIES
            ))
            .into());
        }
        let total = count.checked_mul(width);
        let bytes = total.and_then(|total| total.checked_mul(E::WIDTH));
        let (Some(total), Some(bytes)) = (total, bytes) else {
            return Err(DecodeError::Inconsistent(format!(
                "bucket of width {width} with {count} entries overflows the byte length"
            ))
            .into());
        };
        r.ensure(bytes)?;

        let mut elements = Vec::with_capacity(total);
        for _ in 0..total {
            elements.push(E::read_from(r)?);
        }
        let mut table = BucketTable {
            width,
            elements,
            sorted: (0..count as u32).map(|offset| offset as u16).collect(),
        };

        if let Some((offset, _)) = table
            .iter()
            .find(|(_, entry)| entry.windows(2).any(|pair| pair[0] > pair[1]))
        {
            return Err(DecodeError::Inconsistent(format!(
                "entry {offset} of bucket width {width} is not sorted"
            ))
            .into());
        }

        let mut sorted = std::mem::take(&mut table.sorted);
        sorted.sort_unstable_by(|&a, &b| table.stored(a).cmp(table.stored(b)));
        if sorted
            .windows(2)
            .any(|pair| table.stored(pair[0]) == table.stored(pair[1]))
        {
            return Err(DecodeError::Inconsistent(format!(
                "bucket of width {width} holds a repeated entry"
            ))
            .into());
        }
        table.sorted = sorted;
        Ok(table)
    }
}

/// One [`BucketTable`] per sequence length, producing packed ids of type `I`.
///
/// Bucket `n - 1` of the list holds sequences of length `n`; the id carries
/// `n` itself as its bucket number.
#[derive(Debug, Clone)]
pub struct BucketIndex<E, I> {
    buckets: Vec<BucketTable<E>>,
    _id: PhantomData<I>,
}

impl<E, I> Default for BucketIndex<E, I> {
    fn default() -> Self {
        BucketIndex {
            buckets: Vec::new(),
            _id: PhantomData,
        }
    }
}

impl<E: Element, I: PackedKey> BucketIndex<E, I> {
    /// Longest sequence an id can describe.
    pub const MAX_LEN: usize = u16::MAX as usize;

    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `set`, sorting it in place. The empty set is [`PackedKey::EMPTY`].
    pub fn index(&mut self, set: &mut [E]) -> Result<I> {
        let len = set.len();
        if len == 0 {
            return Ok(I::EMPTY);
        }
        if len > Self::MAX_LEN {
            return Err(Error::Overflow {
                what: "set length",
                limit: Self::MAX_LEN,
            });
        }
        while self.buckets.len() < len {
            let width = self.buckets.len() + 1;
            self.buckets.push(BucketTable::new(width));
        }
        let offset = self.buckets[len - 1].index(set)?;
        Ok(I::pack(len as u16, offset))
    }

    /// Look up `set` without inserting. Order of `set` does not matter.
    pub fn find(&self, set: &[E]) -> Option<I> {
        if set.is_empty() {
            return Some(I::EMPTY);
        }
        let bucket = self.buckets.get(set.len() - 1)?;
        let mut sorted = set.to_vec();
        sorted.sort_unstable();
        let offset = bucket.find(&sorted)?;
        Some(I::pack(set.len() as u16, offset))
    }

    /// Resolve an id to its sorted sequence.
    ///
    /// [`PackedKey::EMPTY`] resolves to the empty slice; any id that was never
    /// handed out resolves to `None`.
    pub fn get(&self, id: I) -> Option<&[E]> {
        if id.is_empty() {
            return Some(&[]);
        }
        let bucket = (id.bucket() as usize).checked_sub(1)?;
        self.buckets.get(bucket)?.entry(id.offset())
    }

    #[inline]
    pub fn contains(&self, id: I) -> bool {
        self.get(id).is_some()
    }

    /// Total number of stored sequences across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(BucketTable::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(BucketTable::is_empty)
    }

    /// Number of buckets, equal to the longest sequence length seen.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket(&self, len: usize) -> Option<&BucketTable<E>> {
        self.buckets.get(len.checked_sub(1)?)
    }

    /// Every stored sequence with its id, shortest sequences first.
    pub fn iter(&self) -> impl Iterator<Item = (I, &[E])> {
        self.buckets.iter().flat_map(|bucket| {
            let len = bucket.width() as u16;
            bucket
                .iter()
                .map(move |(offset, entry)| (I::pack(len, offset), entry))
        })
    }

    /// Write the section: `tag`, `buckets: u16`, then per bucket
    /// `entries: u32` followed by the entries' elements.
    pub fn encode<W: Write>(&self, tag: SectionTag, w: &mut W) -> Result<()> {
        tag.write_to(w)?;
        wire::write_u16(w, self.buckets.len() as u16)?;
        for bucket in &self.buckets {
            bucket.encode(w)?;
        }
        Ok(())
    }

    /// Read a section written by [`BucketIndex::encode`] into a fresh index.
    pub fn decode(tag: SectionTag, r: &mut Reader<'_>) -> Result<Self> {
        r.expect_section(tag)?;
        let bucket_count = r.read_u16()? as usize;
        let mut index = Self::new();
        for width in 1..=bucket_count {
            index.buckets.push(BucketTable::decode(r, width)?);
        }
        tracing::debug!(
            section = %String::from_utf8_lossy(&tag.0),
            buckets = bucket_count,
            entries = index.len(),
            "decoded bucket index"
        );
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(ids: &[u8]) -> Vec<TagId> {
        ids.iter().copied().map(TagId).collect()
    }

    #[test]
    fn sort_independent_identity() {
        let mut index = TagSetIndex::new();
        let a = index.index(&mut tags(&[2, 1, 3])).unwrap();
        let b = index.index(&mut tags(&[1, 2, 3])).unwrap();
        let c = index.index(&mut tags(&[3, 2, 1])).unwrap();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn index_sorts_in_place() {
        let mut index = TagSetIndex::new();
        let mut set = tags(&[9, 4, 7]);
        index.index(&mut set).unwrap();
        assert_eq!(set, tags(&[4, 7, 9]));
    }

    #[test]
    fn empty_set_is_zero_and_not_stored() {
        let mut index = TagSetIndex::new();
        let id = index.index(&mut []).unwrap();
        assert_eq!(id, TagSetId(0));
        assert!(index.is_empty());
        assert_eq!(index.bucket_count(), 0);
        assert_eq!(index.get(TagSetId::EMPTY), Some(&[][..]));
        assert_eq!(index.find(&[]), Some(TagSetId::EMPTY));
    }

    #[test]
    fn first_length_one_set_is_not_zero() {
        let mut index = TagSetIndex::new();
        let id = index.index(&mut tags(&[0])).unwrap();
        assert_ne!(id, TagSetId::EMPTY);
        assert_eq!(id.bucket(), 1);
        assert_eq!(id.offset(), 0);
        assert_eq!(index.get(id), Some(&tags(&[0])[..]));
    }

    #[test]
    fn buckets_by_length_never_collide() {
        let mut index = TagSetIndex::new();
        let mut ids = Vec::new();
        for len in 1..=12u8 {
            let mut set: Vec<TagId> = (0..len).map(TagId).collect();
            ids.push(index.index(&mut set).unwrap());
        }
        assert_eq!(index.bucket_count(), 12);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(id.bucket() as usize, i + 1);
            assert_eq!(id.offset(), 0);
            assert_eq!(index.get(*id).unwrap().len(), i + 1);
        }
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn offsets_grow_within_bucket() {
        let mut index = TagSetIndex::new();
        let a = index.index(&mut tags(&[5, 6])).unwrap();
        let b = index.index(&mut tags(&[1, 2])).unwrap();
        let c = index.index(&mut tags(&[6, 5])).unwrap();

        assert_eq!(a.offset(), 0);
        assert_eq!(b.offset(), 1);
        assert_eq!(c, a);
        assert_eq!(index.bucket(2).unwrap().len(), 2);
    }

    #[test]
    fn find_does_not_insert() {
        let mut index = TagSetIndex::new();
        let id = index.index(&mut tags(&[1, 4])).unwrap();
        assert_eq!(index.find(&tags(&[4, 1])), Some(id));
        assert_eq!(index.find(&tags(&[1, 5])), None);
        assert_eq!(index.find(&tags(&[1, 2, 3])), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn get_rejects_unknown_ids() {
        let mut index = TagSetIndex::new();
        index.index(&mut tags(&[1])).unwrap();
        // Bucket number zero only exists as the empty id.
        assert_eq!(index.get(TagSetId::pack(0, 1)), None);
        assert_eq!(index.get(TagSetId::pack(1, 1)), None);
        assert_eq!(index.get(TagSetId::pack(2, 0)), None);
        assert_eq!(index.get(TagSetId::pack(u16::MAX, u16::MAX)), None);
    }

    #[test]
    fn duplicates_are_kept_as_multiset() {
        let mut index = TagSetIndex::new();
        let twice = index.index(&mut tags(&[3, 3])).unwrap();
        let once = index.index(&mut tags(&[3])).unwrap();
        assert_ne!(twice, once);
        assert_eq!(index.get(twice), Some(&tags(&[3, 3])[..]));
    }

    #[test]
    fn collection_equality_ignores_insertion_order() {
        let mut sets = TagSetIndex::new();
        let a = sets.index(&mut tags(&[1])).unwrap();
        let b = sets.index(&mut tags(&[1, 2])).unwrap();
        let c = sets.index(&mut tags(&[0, 3])).unwrap();

        let mut collections = CollectionIndex::new();
        let first = collections.index(&mut [c, a, b]).unwrap();
        let second = collections.index(&mut [b, c, a]).unwrap();
        assert_eq!(first, second);
        assert_eq!(collections.get(first), Some(&[a, b, c][..]));
    }

    #[test]
    fn table_rejects_empty_and_wrong_width() {
        let mut table = BucketTable::<TagId>::new(2);
        assert!(matches!(table.index(&mut []), Err(Error::EmptyInput(_))));
        assert!(matches!(
            table.index(&mut tags(&[1])),
            Err(Error::WidthMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn table_overflows_after_max_entries() {
        let mut table = BucketTable::<TagSetId>::new(1);
        for i in 0..BucketTable::<TagSetId>::MAX_ENTRIES as u32 {
            table.index(&mut [TagSetId(i)]).unwrap();
        }
        let err = table.index(&mut [TagSetId(u32::MAX)]).unwrap_err();
        assert!(matches!(err, Error::Overflow { limit: 65536, .. }));
        // Known entries are still found.
        assert_eq!(table.index(&mut [TagSetId(7)]).unwrap(), 7);
    }

    #[test]
    fn iter_lists_every_entry_with_its_id() {
        let mut index = TagSetIndex::new();
        let a = index.index(&mut tags(&[4, 2])).unwrap();
        let b = index.index(&mut tags(&[1])).unwrap();
        let c = index.index(&mut tags(&[0, 1])).unwrap();

        let listed: Vec<(TagSetId, Vec<TagId>)> =
            index.iter().map(|(id, set)| (id, set.to_vec())).collect();
        assert_eq!(
            listed,
            vec![(b, tags(&[1])), (a, tags(&[2, 4])), (c, tags(&[0, 1]))]
        );
    }

    #[test]
    fn encode_layout() {
        let mut index = TagSetIndex::new();
        index.index(&mut tags(&[7])).unwrap();
        index.index(&mut tags(&[2, 1])).unwrap();

        let mut buf = Vec::new();
        index.encode(SectionTag::TAG_SETS, &mut buf).unwrap();
        let expected: &[u8] = &[
            b'T', b'S', 2, 0, // two buckets
            1, 0, 0, 0, 7, // one entry of width 1
            1, 0, 0, 0, 1, 2, // one entry of width 2
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn decode_restores_lookups() {
        let mut index = CollectionIndex::new();
        let a = index.index(&mut [TagSetId(0x0002_0001), TagSetId(0x0001_0000)]).unwrap();
        let b = index.index(&mut [TagSetId(0x0001_0003)]).unwrap();
        let c = index.index(&mut [TagSetId(0x0001_0000), TagSetId(0x0001_0001)]).unwrap();

        let mut buf = Vec::new();
        index.encode(SectionTag::COLLECTIONS, &mut buf).unwrap();
        let back = CollectionIndex::decode(SectionTag::COLLECTIONS, &mut Reader::new(&buf)).unwrap();

        for id in [a, b, c] {
            assert_eq!(back.get(id), index.get(id));
        }
        assert_eq!(
            back.find(&[TagSetId(0x0001_0001), TagSetId(0x0001_0000)]),
            Some(c)
        );
        let mut again = Vec::new();
        back.encode(SectionTag::COLLECTIONS, &mut again).unwrap();
        assert_eq!(again, buf);
    }

    #[test]
    fn decode_rejects_truncation_at_every_offset() {
        let mut index = TagSetIndex::new();
        index.index(&mut tags(&[1])).unwrap();
        index.index(&mut tags(&[1, 2, 3])).unwrap();
        let mut buf = Vec::new();
        index.encode(SectionTag::TAG_SETS, &mut buf).unwrap();

        for cut in 0..buf.len() {
            let err = TagSetIndex::decode(SectionTag::TAG_SETS, &mut Reader::new(&buf[..cut]))
                .unwrap_err();
            assert!(
                matches!(err, Error::Decode(DecodeError::Truncated { .. })),
                "cut at {cut}: {err}"
            );
        }
    }

    #[test]
    fn decode_rejects_unsorted_and_repeated_entries() {
        let unsorted: &[u8] = &[b'T', b'S', 2, 0, 0, 0, 0, 0, 1, 0, 0, 0, 2, 1];
        let err = TagSetIndex::decode(SectionTag::TAG_SETS, &mut Reader::new(unsorted)).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Inconsistent(_))));

        let repeated: &[u8] = &[b'T', b'S', 1, 0, 2, 0, 0, 0, 5, 5];
        let err = TagSetIndex::decode(SectionTag::TAG_SETS, &mut Reader::new(repeated)).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Inconsistent(_))));
    }

    #[test]
    fn decode_rejects_oversized_count_before_allocating() {
        // One bucket of width 1 claiming every possible entry, with no data.
        let mut buf = vec![b'C', b'D', 1, 0];
        buf.extend_from_slice(&(BucketTable::<TagSetId>::MAX_ENTRIES as u32).to_le_bytes());
        let err = CollectionIndex::decode(SectionTag::COLLECTIONS, &mut Reader::new(&buf))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::Truncated { needed: 262_144, available: 0, .. })
        ));
    }

    #[test]
    fn decode_checks_section_tag() {
        let err = TagSetIndex::decode(SectionTag::TAG_SETS, &mut Reader::new(b"CD\x00\x00"))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::SectionTag { .. })));
    }
}
