//! Arena-based letter trie over word spellings.
//!
//! Every letter position of the indexed vocabulary is an [`Item`] stored in a
//! contiguous arena and addressed by a dense [`NodeId`]. Ids start at 1 and
//! follow creation order; [`NodeId::ROOT`] (0) is the implicit root and owns
//! no item. Holding a `NodeId` never borrows the trie.
//!
//! Child lookup goes through a `parent -> (letter -> child)` cache. The cache
//! is derived entirely from the arena: it is not persisted and is rebuilt when
//! a trie is decoded.
//!
//! Each item carries a [`VariantId`] naming the collection of readings of the
//! word that ends at it, or [`VariantId::EMPTY`] when no word ends there.

use std::collections::HashMap;
use std::io::Write;

use morph_core::wire::{self, Reader, SectionTag};
use morph_core::{DecodeError, Error, NodeId, PackedKey, Result, VariantId};

/// Encoded size of one item: parent, id, letter, variants.
const ITEM_WIDTH: usize = 16;

/// One letter position in the trie.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Item {
    pub parent: NodeId,
    pub id: NodeId,
    pub letter: char,
    /// Readings of the word ending here; empty when none does.
    pub variants: VariantId,
}

/// Capacity to grow to when `needed` slots do not fit in `current`.
///
/// Doubles the current capacity, or jumps straight to `needed` when doubling
/// is not enough (which includes growing from zero).
#[inline]
pub fn grown_capacity(current: usize, needed: usize) -> usize {
    current.saturating_mul(2).max(needed)
}

/// Append-only storage of items, indexed by `NodeId - 1`.
#[derive(Debug, Default, Clone)]
pub struct ItemArena {
    items: Vec<Item>,
}

impl ItemArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Item> {
        self.items.get(id.arena_index()?)
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> Option<&mut Item> {
        self.items.get_mut(id.arena_index()?)
    }

    /// The id the next pushed item will get, growing capacity so that the
    /// push does not reallocate. Nothing is claimed until `push` appends.
    fn next_id_with_capacity(&mut self) -> Result<NodeId> {
        let needed = self.items.len() + 1;
        let id = u32::try_from(needed).map_err(|_| Error::Overflow {
            what: "item arena",
            limit: u32::MAX as usize,
        })?;
        if self.items.capacity() < needed {
            let target = grown_capacity(self.items.capacity(), needed);
            self.items.reserve_exact(target - self.items.len());
        }
        Ok(NodeId(id))
    }

    /// Append a fresh item without readings and return its id.
    pub fn push(&mut self, parent: NodeId, letter: char) -> Result<NodeId> {
        let id = self.next_id_with_capacity()?;
        self.items.push(Item {
            parent,
            id,
            letter,
            variants: VariantId::EMPTY,
        });
        Ok(id)
    }

    #[inline]
    pub fn as_slice(&self) -> &[Item] {
        &self.items
    }
}

/// Letter trie with an id-addressed arena and a children cache.
///
/// # Example
///
/// ```
/// use word_trie::Trie;
///
/// let mut trie = Trie::new();
/// let test = trie.insert("test").unwrap();
/// let text = trie.insert("text").unwrap();
///
/// // "te" is shared, so 2 + 2 + 2 nodes.
/// assert_eq!(trie.len(), 6);
/// assert_eq!(trie.find("test").unwrap(), test);
/// assert_eq!(trie.word(text).unwrap(), "text");
/// ```
#[derive(Debug, Default, Clone)]
pub struct Trie {
    arena: ItemArena,
    children: HashMap<NodeId, HashMap<char, NodeId>>,
}

impl Trie {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The item of a node; `None` for the root and unknown ids.
    #[inline]
    pub fn item(&self, id: NodeId) -> Option<&Item> {
        self.arena.get(id)
    }

    /// All items in id order.
    #[inline]
    pub fn items(&self) -> &[Item] {
        self.arena.as_slice()
    }

    #[inline]
    pub fn arena(&self) -> &ItemArena {
        &self.arena
    }

    /// Number of nodes, the root excluded.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        id.is_root() || self.arena.get(id).is_some()
    }

    pub fn find_child(&self, parent: NodeId, letter: char) -> Option<NodeId> {
        self.children.get(&parent)?.get(&letter).copied()
    }

    /// Find or create the child of `parent` for `letter`.
    pub fn add_child(&mut self, parent: NodeId, letter: char) -> Result<NodeId> {
        if let Some(child) = self.find_child(parent, letter) {
            return Ok(child);
        }
        if !self.contains(parent) {
            return Err(Error::NotFound(format!("node {parent}")));
        }
        let id = self.arena.push(parent, letter)?;
        self.children.entry(parent).or_default().insert(letter, id);
        tracing::trace!(parent = parent.0, %letter, id = id.0, "created node");
        Ok(id)
    }

    /// Direct children of a node, ordered by letter.
    pub fn children(&self, parent: NodeId) -> Vec<(char, NodeId)> {
        let mut children: Vec<(char, NodeId)> = self
            .children
            .get(&parent)
            .map(|map| map.iter().map(|(&letter, &id)| (letter, id)).collect())
            .unwrap_or_default();
        children.sort_unstable();
        children
    }

    /// Walk `word` from the root, creating missing nodes, and return the node
    /// of its last letter. Inserting a word twice returns the same node.
    pub fn insert(&mut self, word: &str) -> Result<NodeId> {
        if word.is_empty() {
            return Err(Error::EmptyInput("word"));
        }
        let mut current = NodeId::ROOT;
        for letter in word.chars() {
            current = self.add_child(current, letter)?;
        }
        Ok(current)
    }

    /// Walk `prefix` from the root without creating anything. The empty
    /// prefix resolves to the root.
    pub fn walk(&self, prefix: &str) -> Result<NodeId> {
        let mut current = NodeId::ROOT;
        for (pos, letter) in prefix.char_indices() {
            current = self.find_child(current, letter).ok_or_else(|| {
                Error::NotFound(format!(
                    "word {prefix:?}: no entry continues with {:?}",
                    &prefix[pos..]
                ))
            })?;
        }
        Ok(current)
    }

    /// Exact lookup of the node spelling `word`.
    pub fn find(&self, word: &str) -> Result<NodeId> {
        if word.is_empty() {
            return Err(Error::EmptyInput("word"));
        }
        self.walk(word)
    }

    /// Spell the word ending at `id` by following parent links to the root.
    pub fn word(&self, id: NodeId) -> Result<String> {
        let mut letters = Vec::new();
        let mut current = id;
        while !current.is_root() {
            let item = self
                .arena
                .get(current)
                .ok_or_else(|| Error::NotFound(format!("node {current}")))?;
            letters.push(item.letter);
            current = item.parent;
        }
        Ok(letters.iter().rev().collect())
    }

    pub fn variants(&self, id: NodeId) -> Result<VariantId> {
        self.arena
            .get(id)
            .map(|item| item.variants)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))
    }

    /// Replace the readings of a node, returning the previous ones.
    pub fn set_variants(&mut self, id: NodeId, variants: VariantId) -> Result<VariantId> {
        let item = self
            .arena
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))?;
        Ok(std::mem::replace(&mut item.variants, variants))
    }

    /// Number of nodes at which at least one word ends.
    pub fn word_count(&self) -> usize {
        self.items()
            .iter()
            .filter(|item| !item.variants.is_empty())
            .count()
    }

    /// Words ending in the subtree of `start` (itself included), depth first
    /// in letter order, at most `limit` of them.
    pub fn words_under(&self, start: NodeId, limit: usize) -> Result<Vec<(String, NodeId)>> {
        let mut found = Vec::new();
        let mut stack = vec![(start, self.word(start)?)];
        while let Some((node, spelling)) = stack.pop() {
            if found.len() >= limit {
                break;
            }
            if self.arena.get(node).is_some_and(|item| !item.variants.is_empty()) {
                found.push((spelling.clone(), node));
            }
            // Reverse so that the smallest letter is popped first.
            for (letter, child) in self.children(node).into_iter().rev() {
                let mut longer = spelling.clone();
                longer.push(letter);
                stack.push((child, longer));
            }
        }
        Ok(found)
    }

    /// Write the `ID` section: `count: u32`, then per item `parent`, `id`,
    /// `letter` and `variants`, each a `u32`.
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        SectionTag::ITEMS.write_to(w)?;
        wire::write_u32(w, self.len() as u32)?;
        for item in self.items() {
            wire::write_u32(w, item.parent.0)?;
            wire::write_u32(w, item.id.0)?;
            wire::write_u32(w, item.letter as u32)?;
            wire::write_u32(w, item.variants.0)?;
        }
        Ok(())
    }

    /// Read an `ID` section into a fresh trie and rebuild the children cache.
    ///
    /// Variant ids are not checked here; the index that owns the collection
    /// table does that.
    pub fn decode(r: &mut Reader<'_>) -> Result<Trie> {
        r.expect_section(SectionTag::ITEMS)?;
        let count = r.read_u32()? as usize;
        let bytes = count.checked_mul(ITEM_WIDTH).ok_or_else(|| {
            DecodeError::Inconsistent(format!("item count {count} overflows the byte length"))
        })?;
        r.ensure(bytes)?;

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let parent = NodeId(r.read_u32()?);
            let id = NodeId(r.read_u32()?);
            let raw_letter = r.read_u32()?;
            let variants = VariantId(r.read_u32()?);
            let letter = char::from_u32(raw_letter).ok_or_else(|| {
                DecodeError::Inconsistent(format!(
                    "node {id} has invalid letter {raw_letter:#x}"
                ))
            })?;
            items.push(Item {
                parent,
                id,
                letter,
                variants,
            });
        }
        let trie = Trie::from_items(items)?;
        tracing::debug!(nodes = trie.len(), "decoded item arena");
        Ok(trie)
    }

    /// Build a trie from a complete arena, validating it and deriving the
    /// children cache in one pass.
    pub fn from_items(items: Vec<Item>) -> std::result::Result<Trie, DecodeError> {
        let mut children: HashMap<NodeId, HashMap<char, NodeId>> = HashMap::new();
        for (index, item) in items.iter().enumerate() {
            if item.id.arena_index() != Some(index) {
                return Err(DecodeError::Inconsistent(format!(
                    "item {index} carries id {}, expected {}",
                    item.id.0,
                    index + 1
                )));
            }
            if item.parent.0 >= item.id.0 {
                return Err(DecodeError::Inconsistent(format!(
                    "node {} has parent {} which is not created before it",
                    item.id, item.parent
                )));
            }
            let previous = children
                .entry(item.parent)
                .or_default()
                .insert(item.letter, item.id);
            if let Some(previous) = previous {
                return Err(DecodeError::Inconsistent(format!(
                    "nodes {previous} and {} share parent {} and letter {:?}",
                    item.id, item.parent, item.letter
                )));
            }
        }
        Ok(Trie {
            arena: ItemArena { items },
            children,
        })
    }
}
