//! Binary persistence of a whole [`Index`].
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic "MRPH" | version u8 | TD | TS | CD | ID
//! ```
//!
//! Each section starts with its two-byte tag. Decoding validates every
//! cross reference (tag ids, tag-set ids, variant ids) so that a loaded index
//! never hands out dangling ids.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bucket_table::{CollectionIndex, TagSetIndex};
use morph_core::wire::{self, Reader, SectionTag};
use morph_core::{DecodeError, PackedKey, Result};
use tag_dict::TagDictionary;
use word_trie::Trie;

use crate::Index;

pub const MAGIC: [u8; 4] = *b"MRPH";
pub const FORMAT_VERSION: u8 = 1;

impl Index {
    /// Write the index in binary form.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&MAGIC)?;
        wire::write_u8(w, FORMAT_VERSION)?;
        self.tags.encode(w)?;
        self.tag_sets.encode(SectionTag::TAG_SETS, w)?;
        self.collections.encode(SectionTag::COLLECTIONS, w)?;
        self.trie.encode(w)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Decode an index from the front of `r`, leaving any following bytes
    /// unread.
    pub fn decode(r: &mut Reader<'_>) -> Result<Index> {
        let magic: [u8; 4] = r.read_array()?;
        if magic != MAGIC {
            return Err(DecodeError::Magic {
                expected: wire::hex(&MAGIC),
                actual: wire::hex(&magic),
            }
            .into());
        }
        let version = r.read_u8()?;
        if version != FORMAT_VERSION {
            return Err(DecodeError::Version {
                found: version,
                supported: FORMAT_VERSION,
            }
            .into());
        }

        let tags = TagDictionary::decode(r)?;
        let tag_sets = TagSetIndex::decode(SectionTag::TAG_SETS, r)?;
        let collections = CollectionIndex::decode(SectionTag::COLLECTIONS, r)?;
        let trie = Trie::decode(r)?;
        check_references(&tags, &tag_sets, &collections, &trie)?;

        let words_count = trie.word_count();
        tracing::debug!(
            tags = tags.len(),
            tag_sets = tag_sets.len(),
            collections = collections.len(),
            nodes = trie.len(),
            words = words_count,
            "decoded index"
        );
        Ok(Index {
            tags,
            tag_sets,
            collections,
            trie,
            words_count,
        })
    }

    /// Decode an index occupying all of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Index> {
        let mut r = Reader::new(bytes);
        let index = Index::decode(&mut r)?;
        if !r.is_empty() {
            return Err(DecodeError::TrailingBytes(r.remaining()).into());
        }
        Ok(index)
    }

    /// Read a whole stream and decode it. The stream must hold exactly one
    /// index.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Index> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Index::from_bytes(&bytes)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        tracing::info!(path = %path.display(), words = self.words_count, "saved index");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Index> {
        let mut r = BufReader::new(File::open(path)?);
        let index = Index::read_from(&mut r)?;
        tracing::info!(path = %path.display(), words = index.words_count, "loaded index");
        Ok(index)
    }
}

fn check_references(
    tags: &TagDictionary,
    tag_sets: &TagSetIndex,
    collections: &CollectionIndex,
    trie: &Trie,
) -> std::result::Result<(), DecodeError> {
    for (id, set) in tag_sets.iter() {
        if let Some(tag) = set.iter().find(|tag| tag.as_usize() >= tags.len()) {
            return Err(DecodeError::Inconsistent(format!(
                "tag set {id:?} references unknown tag {tag:?}"
            )));
        }
    }
    for (id, collection) in collections.iter() {
        if let Some(set) = collection
            .iter()
            .find(|set| set.is_empty() || !tag_sets.contains(**set))
        {
            return Err(DecodeError::Inconsistent(format!(
                "collection {id:?} references unknown tag set {set:?}"
            )));
        }
        // Entries are sorted, so a repeated reading sits next to itself.
        if collection.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(DecodeError::Inconsistent(format!(
                "collection {id:?} repeats a reading"
            )));
        }
    }
    for item in trie.items() {
        if !item.variants.is_empty() && !collections.contains(item.variants) {
            return Err(DecodeError::Inconsistent(format!(
                "node {} references unknown collection {:?}",
                item.id, item.variants
            )));
        }
    }
    Ok(())
}
