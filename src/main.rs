//! morphdict CLI: build a morphological dictionary and look up word forms.
//!
//! Thin wrapper over the `morph-index` library crate.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use morph_index::{Error, Index, Tag};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

/// Look up the grammatical readings of word forms in a morphological dictionary.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Binary dictionary to start from.
    #[arg(long)]
    dict: Option<PathBuf>,

    /// Corpus file to add. May be repeated.
    #[arg(long)]
    corpus: Vec<PathBuf>,

    /// Write the resulting dictionary to this path.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Print one JSON object per looked-up word.
    #[arg(long)]
    json: bool,

    /// Maximum number of words listed for a `prefix*` query.
    #[arg(long, default_value_t = 20)]
    prefix_limit: usize,

    /// Words to look up; a trailing `*` lists words with that prefix.
    /// Without words (and without --save) queries are read from stdin.
    words: Vec<String>,
}

/// One lookup result as printed by `--json`.
#[derive(Serialize)]
struct Lookup<'a> {
    word: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    readings: Option<&'a [Vec<Tag>]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut index = match &args.dict {
        Some(path) => Index::load(path)
            .with_context(|| format!("failed to load dictionary {}", path.display()))?,
        None => Index::new(),
    };
    for path in &args.corpus {
        index
            .load_corpus_file(path)
            .with_context(|| format!("failed to load corpus {}", path.display()))?;
    }
    if let Some(ref path) = args.save {
        index
            .save(path)
            .with_context(|| format!("failed to save dictionary {}", path.display()))?;
    }

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    if !args.words.is_empty() {
        for word in &args.words {
            query(&index, &args, word, &mut stdout)?;
        }
        return Ok(());
    }
    if args.save.is_some() {
        return Ok(());
    }

    eprintln!(
        "{} word forms loaded. Enter a word, or a prefix ending in `*`; `quit` exits.",
        index.words_count()
    );
    for line in io::stdin().lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        query(&index, &args, trimmed, &mut stdout)?;
        stdout.flush()?;
    }

    Ok(())
}

/// Answer one query. Missing words are reported on `out`, not as errors.
fn query<W: Write>(index: &Index, args: &Args, input: &str, out: &mut W) -> Result<()> {
    if let Some(prefix) = input.strip_suffix('*') {
        let words = match index.words_with_prefix(prefix, args.prefix_limit) {
            Ok(words) => words,
            Err(Error::NotFound(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        if words.is_empty() {
            return print_missing(out, args.json, input, "no words with this prefix");
        }
        for (word, node) in words {
            let readings = index.tag_sets(node)?;
            print_readings(out, args.json, &word, &readings)?;
        }
        return Ok(());
    }

    match index.search_forms(input) {
        Ok(readings) => print_readings(out, args.json, input, &readings),
        Err(err @ (Error::NotFound(_) | Error::EmptyInput(_))) => {
            tracing::debug!(word = input, error = %err, "lookup failed");
            print_missing(out, args.json, input, "not found")
        }
        Err(err) => Err(err.into()),
    }
}

fn print_readings<W: Write>(out: &mut W, json: bool, word: &str, readings: &[Vec<Tag>]) -> Result<()> {
    if json {
        let lookup = Lookup {
            word,
            readings: Some(readings),
            error: None,
        };
        writeln!(out, "{}", serde_json::to_string(&lookup)?)?;
        return Ok(());
    }
    for reading in readings {
        let names: Vec<&str> = reading.iter().map(|tag| tag.name.as_str()).collect();
        writeln!(out, "{word}\t{}", names.join(","))?;
    }
    Ok(())
}

fn print_missing<W: Write>(out: &mut W, json: bool, word: &str, reason: &str) -> Result<()> {
    if json {
        let lookup = Lookup {
            word,
            readings: None,
            error: Some(reason.to_string()),
        };
        writeln!(out, "{}", serde_json::to_string(&lookup)?)?;
    } else {
        writeln!(out, "{word}: {reason}")?;
    }
    Ok(())
}
