//! Morphological dictionary: word forms and the grammatical readings each
//! form can carry, with a compact deduplicated binary format.
//!
//! This is the facade crate that wires together the lower-level components:
//! - [`morph_core`]: packed ids, errors and wire primitives
//! - [`tag_dict`]: tag-name dictionary
//! - [`bucket_table`]: deduplication of tag sets and reading collections
//! - [`word_trie`]: letter trie over spellings
//!
//! A node of the trie stores a single [`VariantId`]. Expanding it goes
//! variant -> collection of [`TagSetId`]s -> sets of [`TagId`]s -> [`Tag`]s.
//!
//! # Quick Start
//!
//! ```
//! use morph_index::Index;
//!
//! let mut index = Index::new();
//! index.tag_id("POST", "").unwrap();
//! index.tag_id("NOUN", "POST").unwrap();
//!
//! let node = index.add_string("кот").unwrap();
//! index.add_tag_set(node, &["POST", "NOUN"]).unwrap();
//!
//! assert_eq!(index.fetch_string("кот").unwrap(), node);
//! let readings = index.tag_sets(node).unwrap();
//! assert_eq!(readings.len(), 1);
//! assert_eq!(readings[0][1].name.as_str(), "NOUN");
//! assert_eq!(index.words_count(), 1);
//! ```

mod codec;
mod corpus;
mod shared;

pub use bucket_table::{CollectionIndex, TagSetIndex};
pub use codec::{FORMAT_VERSION, MAGIC};
pub use corpus::CorpusStats;
pub use morph_core::{
    DecodeError, Error, NodeId, PackedKey, Reader, Result, TagId, TagSetId, VariantId,
};
pub use shared::SharedIndex;
pub use tag_dict::{Tag, TagDictionary, TagName};
pub use word_trie::{Item, Trie};

/// The dictionary: tag names, both deduplication layers and the word trie.
#[derive(Debug, Default, Clone)]
pub struct Index {
    tags: TagDictionary,
    tag_sets: TagSetIndex,
    collections: CollectionIndex,
    trie: Trie,
    /// Nodes carrying at least one reading. Kept in step by `add_tag_set`.
    words_count: usize,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag (idempotent) and return its id. An empty `parent`
    /// means the tag has no parent category.
    ///
    /// Tags must be registered before any reading refers to them.
    pub fn tag_id(&mut self, name: &str, parent: &str) -> Result<TagId> {
        let name = TagName::new(name)?;
        let parent = TagName::new(parent)?;
        self.tags.index(name, parent)
    }

    /// Register a tag, failing with [`Error::AlreadyExists`] if it is known.
    pub fn declare_tag(&mut self, name: &str, parent: &str) -> Result<TagId> {
        let name = TagName::new(name)?;
        let parent = TagName::new(parent)?;
        self.tags.insert(name, parent)
    }

    /// Add `word` to the trie, returning the node of its last letter.
    pub fn add_string(&mut self, word: &str) -> Result<NodeId> {
        self.trie.insert(word)
    }

    /// Attach one reading, given as tag names, to `node`.
    ///
    /// The reading joins the node's existing readings; adding a reading the
    /// node already has changes nothing. Every name must have been registered
    /// with [`Index::tag_id`] beforehand.
    pub fn add_tag_set<S: AsRef<str>>(&mut self, node: NodeId, names: &[S]) -> Result<()> {
        if names.is_empty() {
            return Err(Error::EmptyInput("tag set"));
        }
        let current = self.trie.variants(node)?;

        let mut set = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let id = TagName::new(name)
                .ok()
                .and_then(|tag| self.tags.find(tag))
                .ok_or_else(|| Error::UnknownTag(name.to_string()))?;
            set.push(id);
        }
        let tag_set = self.tag_sets.index(&mut set)?;

        let mut collection = self.collection(current)?.to_vec();
        if collection.contains(&tag_set) {
            return Ok(());
        }
        collection.push(tag_set);
        let variants = self.collections.index(&mut collection)?;
        self.trie.set_variants(node, variants)?;

        if current.is_empty() {
            self.words_count += 1;
            tracing::debug!(node = node.0, "new word form");
        }
        Ok(())
    }

    /// [`Index::add_string`] followed by [`Index::add_tag_set`].
    pub fn add_entry<S: AsRef<str>>(&mut self, word: &str, names: &[S]) -> Result<NodeId> {
        let node = self.add_string(word)?;
        self.add_tag_set(node, names)?;
        Ok(node)
    }

    /// Look up the node spelling `word`. Pure lookup, nothing is created.
    ///
    /// Succeeds for any spelled path, including prefixes of longer words that
    /// carry no readings themselves.
    pub fn fetch_string(&self, word: &str) -> Result<NodeId> {
        self.trie.find(word)
    }

    /// All readings of `word`. Fails with [`Error::NotFound`] unless `word`
    /// was indexed with at least one reading.
    pub fn search_forms(&self, word: &str) -> Result<Vec<Vec<Tag>>> {
        let node = self.fetch_string(word)?;
        if self.trie.variants(node)?.is_empty() {
            return Err(Error::NotFound(format!("word {word:?} has no readings")));
        }
        self.tag_sets(node)
    }

    /// Expand the readings of `node` into tags.
    ///
    /// One entry per distinct reading, in stored collection order (ascending
    /// [`TagSetId`]: shorter readings first, then first interned first). Tags
    /// within a reading follow their registration order.
    pub fn tag_sets(&self, node: NodeId) -> Result<Vec<Vec<Tag>>> {
        let variants = self.trie.variants(node)?;
        self.collection(variants)?
            .iter()
            .map(|&tag_set| self.tag_set(tag_set))
            .collect()
    }

    /// Expand one reading into tags.
    pub fn tag_set(&self, id: TagSetId) -> Result<Vec<Tag>> {
        let set = self
            .tag_sets
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("tag set {id:?}")))?;
        set.iter()
            .map(|&tag| {
                self.tags
                    .get(tag)
                    .copied()
                    .ok_or_else(|| Error::NotFound(format!("tag {tag:?}")))
            })
            .collect()
    }

    fn collection(&self, id: VariantId) -> Result<&[TagSetId]> {
        self.collections
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("variant {id:?}")))
    }

    /// Spell the word ending at `node`.
    pub fn word(&self, node: NodeId) -> Result<String> {
        self.trie.word(node)
    }

    /// Direct children of `node`, ordered by letter.
    pub fn children(&self, node: NodeId) -> Vec<(char, NodeId)> {
        self.trie.children(node)
    }

    /// Indexed words starting with `prefix`, in letter order, at most
    /// `limit` of them. The empty prefix lists the whole vocabulary.
    pub fn words_with_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<(String, NodeId)>> {
        let start = self.trie.walk(prefix)?;
        self.trie.words_under(start, limit)
    }

    /// Number of distinct word forms with at least one reading.
    #[inline]
    pub fn words_count(&self) -> usize {
        self.words_count
    }

    /// Number of trie nodes, the root excluded.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.trie.len()
    }

    #[inline]
    pub fn tags(&self) -> &TagDictionary {
        &self.tags
    }

    #[inline]
    pub fn tag_set_index(&self) -> &TagSetIndex {
        &self.tag_sets
    }

    #[inline]
    pub fn collection_index(&self) -> &CollectionIndex {
        &self.collections
    }

    #[inline]
    pub fn trie(&self) -> &Trie {
        &self.trie
    }
}
