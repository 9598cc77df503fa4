//! Plain-text corpus loader.
//!
//! ```text
//! # comment
//! @tag POST
//! @tag NOUN POST
//! кот<TAB>POST NOUN
//! стали<TAB>POST,VERB
//! ```
//!
//! `@tag NAME [PARENT]` declares a tag; declaring the same name twice is an
//! error. Every other non-blank line is a word form, a tab, and the tag names
//! of one reading separated by spaces or commas. A form listed on several
//! lines collects all of their readings.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use morph_core::{Error, Result};

use crate::Index;

/// What a corpus load added.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CorpusStats {
    /// `@tag` declarations.
    pub tags: usize,
    /// Word lines.
    pub entries: usize,
}

impl Index {
    /// Load a corpus into this index. Errors carry the 1-based line number.
    ///
    /// Lines before a failing one stay applied.
    pub fn load_corpus<R: BufRead>(&mut self, reader: R) -> Result<CorpusStats> {
        let mut stats = CorpusStats::default();
        for (number, line) in reader.lines().enumerate() {
            let line_no = number + 1;
            let line = line?;
            self.load_line(&line, &mut stats)
                .map_err(|source| Error::Corpus {
                    line: line_no,
                    source: Box::new(source),
                })?;
        }
        tracing::info!(tags = stats.tags, entries = stats.entries, "loaded corpus");
        Ok(stats)
    }

    pub fn load_corpus_file(&mut self, path: &Path) -> Result<CorpusStats> {
        let file = File::open(path)?;
        self.load_corpus(BufReader::new(file))
    }

    fn load_line(&mut self, line: &str, stats: &mut CorpusStats) -> Result<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        let mut parts = trimmed.split_whitespace();
        if parts.next() == Some("@tag") {
            let (Some(name), parent, None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(Error::Syntax(format!("expected `@tag NAME [PARENT]`, got {trimmed:?}")));
            };
            self.declare_tag(name, parent.unwrap_or(""))?;
            stats.tags += 1;
            return Ok(());
        }

        let Some((word, tags)) = line.split_once('\t') else {
            return Err(Error::Syntax(format!("expected `WORD<TAB>TAGS`, got {trimmed:?}")));
        };
        let word = word.trim();
        let names: Vec<&str> = tags
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|name| !name.is_empty())
            .collect();
        self.add_entry(word, &names)?;
        stats.entries += 1;
        Ok(())
    }
}
