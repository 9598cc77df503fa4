//! Tag-name dictionary mapping grammatical tags to compact [`TagId`]s.
//!
//! Tags have a four-character ASCII name and an optional parent category name
//! (a flat, one-level hierarchy such as `NOUN` under `POST`). Identity is the
//! name alone: registering a name twice returns the first id, and the parent
//! given on the first registration is the one that sticks.
//!
//! The dictionary keeps two parallel structures:
//! - `tags`: tags in registration order (index = TagId)
//! - `by_name`: name to id, for O(1) lookup

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use morph_core::wire::{self, Reader, SectionTag};
use morph_core::{DecodeError, Error, Result, TagId};
use serde::{Deserialize, Serialize};

/// A tag or category name: up to four ASCII characters, right-padded with
/// spaces.
///
/// Four spaces is the canonical empty name, [`TagName::EMPTY`], used for
/// tags without a parent.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName([u8; 4]);

impl TagName {
    pub const EMPTY: TagName = TagName(*b"    ");

    /// Parse a name, padding it with spaces. Blank input gives [`TagName::EMPTY`].
    pub fn new(name: &str) -> Result<TagName> {
        if name.len() > 4 || !name.is_ascii() {
            return Err(Error::InvalidTagName(name.to_string()));
        }
        let mut bytes = *b"    ";
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(TagName(bytes))
    }

    /// Accept raw bytes read from disk.
    pub fn from_bytes(bytes: [u8; 4]) -> std::result::Result<TagName, DecodeError> {
        if !bytes.is_ascii() {
            return Err(DecodeError::Inconsistent(format!(
                "tag name {} is not ASCII",
                wire::hex(&bytes)
            )));
        }
        Ok(TagName(bytes))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The name without its padding.
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII, so this never falls back.
        std::str::from_utf8(&self.0)
            .unwrap_or_default()
            .trim_end_matches(' ')
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagName({:?})", self.as_str())
    }
}

impl FromStr for TagName {
    type Err = Error;

    fn from_str(s: &str) -> Result<TagName> {
        TagName::new(s)
    }
}

impl TryFrom<String> for TagName {
    type Error = Error;

    fn try_from(s: String) -> Result<TagName> {
        TagName::new(&s)
    }
}

impl From<TagName> for String {
    fn from(name: TagName) -> String {
        name.as_str().to_string()
    }
}

/// A grammatical tag with its parent category.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Tag {
    pub parent: TagName,
    pub name: TagName,
}

/// An interning dictionary that maps tag names to [`TagId`]s.
///
/// Ids are assigned sequentially from 0 in first-seen order. At most
/// [`TagId::MAX_COUNT`] tags fit; further registrations fail with
/// [`Error::Overflow`].
#[derive(Debug, Default, Clone)]
pub struct TagDictionary {
    /// Tags in registration order. `tags[id.as_usize()]` is the tag for `id`.
    tags: Vec<Tag>,
    by_name: HashMap<TagName, TagId>,
}

impl TagDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a name without inserting. The parent plays no part.
    pub fn find(&self, name: TagName) -> Option<TagId> {
        self.by_name.get(&name).copied()
    }

    /// Register `name` under `parent` if not already present, returning its id.
    ///
    /// Calling this again for a known name returns the existing id and leaves
    /// the dictionary untouched, even when `parent` differs: the parent given
    /// first wins.
    pub fn index(&mut self, name: TagName, parent: TagName) -> Result<TagId> {
        if let Some(id) = self.find(name) {
            return Ok(id);
        }
        self.push(name, parent)
    }

    /// Register `name`, failing with [`Error::AlreadyExists`] if it is known.
    pub fn insert(&mut self, name: TagName, parent: TagName) -> Result<TagId> {
        if self.by_name.contains_key(&name) {
            return Err(Error::AlreadyExists(format!("tag {name}")));
        }
        self.push(name, parent)
    }

    fn push(&mut self, name: TagName, parent: TagName) -> Result<TagId> {
        if name.is_empty() {
            return Err(Error::EmptyInput("tag name"));
        }
        let id = TagId::from_index(self.tags.len())?;
        // Blank parents are already canonical: TagName::new("") is EMPTY.
        self.tags.push(Tag { parent, name });
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Resolve a TagId back to its tag. `None` when out of range.
    #[inline]
    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(id.as_usize())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// All tags in id order.
    pub fn iter(&self) -> impl Iterator<Item = (TagId, &Tag)> {
        self.tags
            .iter()
            .enumerate()
            .map(|(i, tag)| (TagId(i as u8), tag))
    }

    /// Write the `TD` section: `count: u16`, then `parent`, `name` per tag.
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        SectionTag::TAG_DICTIONARY.write_to(w)?;
        // At most 256 tags, which does not fit a byte.
        wire::write_u16(w, self.tags.len() as u16)?;
        for tag in &self.tags {
            w.write_all(tag.parent.as_bytes())?;
            w.write_all(tag.name.as_bytes())?;
        }
        Ok(())
    }

    /// Read a `TD` section into a fresh dictionary.
    pub fn decode(r: &mut Reader<'_>) -> Result<TagDictionary> {
        r.expect_section(SectionTag::TAG_DICTIONARY)?;
        let count = r.read_u16()? as usize;
        if count > TagId::MAX_COUNT {
            return Err(DecodeError::Inconsistent(format!(
                "tag dictionary declares {count} tags, at most {} fit",
                TagId::MAX_COUNT
            ))
            .into());
        }
        r.ensure(count * 8)?;

        let mut dict = TagDictionary::new();
        for _ in 0..count {
            let parent = TagName::from_bytes(r.read_array()?)?;
            let name = TagName::from_bytes(r.read_array()?)?;
            if name.is_empty() || dict.by_name.contains_key(&name) {
                return Err(DecodeError::Inconsistent(format!(
                    "tag dictionary entry {:?} is blank or repeated",
                    name.as_str()
                ))
                .into());
            }
            dict.push(name, parent)?;
        }
        tracing::debug!(tags = count, "decoded tag dictionary");
        Ok(dict)
    }
}
