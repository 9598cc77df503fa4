//! Error types shared by the dictionary crates.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A tag name, word, node or id is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A strict insertion met a name that is already registered.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The id space of a fixed-width identifier is exhausted.
    #[error("{what} overflow: at most {limit} entries fit")]
    Overflow { what: &'static str, limit: usize },

    /// An empty word or set where a non-empty one is required.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// A set was routed to a bucket holding sets of a different length.
    #[error("bucket holds sets of length {expected}, got length {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    /// A reading references a tag that was never registered.
    #[error("unknown tag {0:?}")]
    UnknownTag(String),

    #[error("invalid tag name {0:?}: expected at most 4 ASCII characters")]
    InvalidTagName(String),

    /// A corpus line could not be parsed.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Any error raised while loading a corpus, with the offending line.
    #[error("corpus line {line}: {source}")]
    Corpus {
        line: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Failure to read the binary format. Always names what was expected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("bad magic: expected {expected}, found {actual}")]
    Magic { expected: String, actual: String },

    #[error("unsupported format version {found}, expected {supported}")]
    Version { found: u8, supported: u8 },

    #[error("section tag mismatch: expected {expected}, found {actual}")]
    SectionTag { expected: String, actual: String },

    #[error("truncated input: {needed} bytes needed at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("{0} trailing bytes after the index")]
    TrailingBytes(usize),

    #[error("inconsistent data: {0}")]
    Inconsistent(String),
}

pub type Result<T> = std::result::Result<T, Error>;
