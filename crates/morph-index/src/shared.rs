//! Thread-safe wrapper around [`Index`].

use parking_lot::{RwLock, RwLockReadGuard};

use morph_core::{NodeId, Result, TagId};
use tag_dict::{Tag, TagName};

use crate::Index;

/// An [`Index`] behind one `RwLock`, for building from several threads.
///
/// Lookups take the read lock. `tag_id` and `add_string` try a read-locked
/// lookup first and only take the write lock for new entries, so repeated
/// registrations of known tags and words do not serialize.
///
/// Node ids depend on insertion order, so two concurrent builds of the same
/// entries can number nodes differently; lookups by spelling agree.
#[derive(Debug, Default)]
pub struct SharedIndex {
    inner: RwLock<Index>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: Index) -> Self {
        Self {
            inner: RwLock::new(index),
        }
    }

    pub fn tag_id(&self, name: &str, parent: &str) -> Result<TagId> {
        {
            let inner = self.inner.read();
            if let Some(id) = inner.tags().find(TagName::new(name)?) {
                return Ok(id);
            }
        }
        // Another writer may have registered it meanwhile; `tag_id` is
        // idempotent.
        self.inner.write().tag_id(name, parent)
    }

    pub fn add_string(&self, word: &str) -> Result<NodeId> {
        if let Ok(node) = self.inner.read().fetch_string(word) {
            return Ok(node);
        }
        self.inner.write().add_string(word)
    }

    pub fn add_tag_set<S: AsRef<str>>(&self, node: NodeId, names: &[S]) -> Result<()> {
        self.inner.write().add_tag_set(node, names)
    }

    /// Add a word and one reading under a single write lock.
    pub fn add_entry<S: AsRef<str>>(&self, word: &str, names: &[S]) -> Result<NodeId> {
        self.inner.write().add_entry(word, names)
    }

    pub fn fetch_string(&self, word: &str) -> Result<NodeId> {
        self.inner.read().fetch_string(word)
    }

    pub fn search_forms(&self, word: &str) -> Result<Vec<Vec<Tag>>> {
        self.inner.read().search_forms(word)
    }

    pub fn words_count(&self) -> usize {
        self.inner.read().words_count()
    }

    /// Hold the read lock for a batch of lookups.
    pub fn read(&self) -> RwLockReadGuard<'_, Index> {
        self.inner.read()
    }

    pub fn into_inner(self) -> Index {
        self.inner.into_inner()
    }
}

impl From<Index> for SharedIndex {
    fn from(index: Index) -> Self {
        Self::from_index(index)
    }
}
