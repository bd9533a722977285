//! Lemma-existence lookups over WordNet `index.*` files.
//!
//! Lemmatization only needs to know whether a candidate base form is a real
//! WordNet lemma for a given part of speech. This crate loads the four index
//! files, keeps the lemma column as borrowed slices into the backing bytes,
//! and answers [`Lexicon::lemma_exists`] with a binary search.
//!
//! Callers choose between memory-mapped files or owned buffers at runtime via
//! [`LoadMode`].
//!
//! ```no_run
//! use wordnet_lexicon::{Lexicon, LoadMode, Pos};
//!
//! # fn main() -> anyhow::Result<()> {
//! let lexicon = Lexicon::load_with_mode("/path/to/wordnet", LoadMode::Mmap)?;
//! assert!(lexicon.lemma_exists(Pos::Noun, "product"));
//! # Ok(()) }
//! ```

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memmap2::Mmap;

/// Part-of-speech marker as used by WordNet files (`n`, `v`, `a`/`s`, `r`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Pos {
    Noun,
    Verb,
    Adj,
    Adv,
}

impl Pos {
    pub const ALL: [Pos; 4] = [Pos::Noun, Pos::Verb, Pos::Adj, Pos::Adv];

    /// Parse a WordNet POS character into an enum.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'n' => Some(Pos::Noun),
            'v' => Some(Pos::Verb),
            'a' | 's' => Some(Pos::Adj),
            'r' => Some(Pos::Adv),
            _ => None,
        }
    }

    /// Emit the POS character used in `index.*`.
    pub fn to_char(self) -> char {
        match self {
            Pos::Noun => 'n',
            Pos::Verb => 'v',
            Pos::Adj => 'a',
            Pos::Adv => 'r',
        }
    }

    /// File-name suffix shared by `index.*` and `*.exc`.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Pos::Noun => "noun",
            Pos::Verb => "verb",
            Pos::Adj => "adj",
            Pos::Adv => "adv",
        }
    }

    fn slot(self) -> usize {
        match self {
            Pos::Noun => 0,
            Pos::Verb => 1,
            Pos::Adj => 2,
            Pos::Adv => 3,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_suffix())
    }
}

impl std::str::FromStr for Pos {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "n" | "noun" => Ok(Pos::Noun),
            "v" | "verb" => Ok(Pos::Verb),
            "a" | "s" | "adj" => Ok(Pos::Adj),
            "r" | "adv" => Ok(Pos::Adv),
            other => anyhow::bail!("unknown part of speech: {other}"),
        }
    }
}

/// Strategy for loading dictionary files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map each index file (fast, zero-copy).
    Mmap,
    /// Read each file into an owned buffer (portable fallback).
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct TextRef {
    start: usize,
    len: usize,
}

struct PosIndex {
    buffer: Buffer,
    // Sorted by the referenced bytes.
    lemmas: Vec<TextRef>,
}

impl PosIndex {
    fn text(&self, r: TextRef) -> &[u8] {
        &self.buffer.as_slice()[r.start..r.start + r.len]
    }

    fn sort(&mut self) {
        let mut lemmas = std::mem::take(&mut self.lemmas);
        lemmas.sort_by(|a, b| self.text(*a).cmp(self.text(*b)));
        lemmas.dedup_by(|a, b| self.text(*a) == self.text(*b));
        self.lemmas = lemmas;
    }

    fn contains(&self, key: &[u8]) -> bool {
        self.lemmas
            .binary_search_by(|r| self.text(*r).cmp(key))
            .is_ok()
    }
}

/// Read-only set of WordNet lemmas per part of speech.
pub struct Lexicon {
    indexes: [PosIndex; 4],
}

impl Lexicon {
    /// Paths of the index files a dictionary directory must provide.
    pub fn required_files(dict_dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = dict_dir.as_ref();
        Pos::ALL
            .iter()
            .map(|pos| dir.join(format!("index.{}", pos.file_suffix())))
            .collect()
    }

    /// Load from a directory containing `index.*` files, memory-mapping them.
    pub fn load(dict_dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(dict_dir, LoadMode::Mmap)
    }

    /// Load choosing between mmap and owned buffers at runtime.
    pub fn load_with_mode(dict_dir: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let dir = dict_dir.as_ref();
        for path in Self::required_files(dir) {
            if !path.exists() {
                anyhow::bail!("missing required WordNet file: {}", path.display());
            }
        }

        let [noun, verb, adj, adv] = Pos::ALL.map(|pos| {
            let path = dir.join(format!("index.{}", pos.file_suffix()));
            load_file(&path, mode).and_then(|buffer| parse_index(buffer, pos, &path))
        });

        Ok(Self {
            indexes: [noun?, verb?, adj?, adv?],
        })
    }

    /// Build a lexicon from an explicit lemma list, mainly for tests and
    /// small embedded resource sets.
    pub fn from_lemmas<'a, I>(lemmas: I) -> Self
    where
        I: IntoIterator<Item = (Pos, &'a str)>,
    {
        let mut buffers: [Vec<u8>; 4] = Default::default();
        let mut refs: [Vec<TextRef>; 4] = Default::default();
        for (pos, lemma) in lemmas {
            let key = normalize_lemma(lemma);
            if key.is_empty() {
                continue;
            }
            let buf = &mut buffers[pos.slot()];
            refs[pos.slot()].push(TextRef {
                start: buf.len(),
                len: key.len(),
            });
            buf.extend_from_slice(key.as_bytes());
            buf.push(b'\n');
        }

        let mut refs = refs.into_iter();
        let indexes = buffers.map(|buf| {
            let mut index = PosIndex {
                buffer: Buffer::Owned(buf),
                lemmas: refs.next().unwrap_or_default(),
            };
            index.sort();
            index
        });
        Self { indexes }
    }

    /// Check whether a lemma exists for the given POS.
    pub fn lemma_exists(&self, pos: Pos, lemma: &str) -> bool {
        let key = normalize_lemma(lemma);
        self.indexes[pos.slot()].contains(key.as_bytes())
    }

    /// Number of distinct lemmas for one POS.
    pub fn lemma_count_for(&self, pos: Pos) -> usize {
        self.indexes[pos.slot()].lemmas.len()
    }

    /// Number of lemmas tracked across all parts of speech.
    pub fn lemma_count(&self) -> usize {
        self.indexes.iter().map(|idx| idx.lemmas.len()).sum()
    }
}

impl fmt::Debug for Lexicon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lexicon")
            .field("noun", &self.lemma_count_for(Pos::Noun))
            .field("verb", &self.lemma_count_for(Pos::Verb))
            .field("adj", &self.lemma_count_for(Pos::Adj))
            .field("adv", &self.lemma_count_for(Pos::Adv))
            .finish()
    }
}

fn load_file(path: &Path, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

fn parse_index(buffer: Buffer, pos: Pos, path: &Path) -> Result<PosIndex> {
    let bytes = buffer.as_slice();
    let mut lemmas = Vec::new();
    for (lineno, raw_line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = strip_cr(raw_line);
        // License header lines are indented.
        if line.is_empty() || matches!(line.first(), Some(b' ' | b'\t')) {
            continue;
        }
        let line_str = std::str::from_utf8(line)
            .with_context(|| format!("{}:{} invalid utf8", path.display(), lineno + 1))?;
        let tokens: Vec<&str> = line_str.split_ascii_whitespace().collect();
        if tokens.len() < 6 {
            anyhow::bail!(
                "{}:{} malformed index line (too few tokens)",
                path.display(),
                lineno + 1
            );
        }
        let line_pos = tokens[1].chars().next().and_then(Pos::from_char);
        if line_pos != Some(pos) {
            anyhow::bail!(
                "{}:{} expected pos '{}', got '{}'",
                path.display(),
                lineno + 1,
                pos.to_char(),
                tokens[1]
            );
        }
        tokens[2]
            .parse::<u32>()
            .with_context(|| format!("{}:{} synset_cnt", path.display(), lineno + 1))?;

        let lemma = tokens[0];
        lemmas.push(TextRef {
            start: lemma.as_ptr() as usize - bytes.as_ptr() as usize,
            len: lemma.len(),
        });
    }

    let mut index = PosIndex { buffer, lemmas };
    index.sort();
    Ok(index)
}

fn strip_cr(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r") {
        &line[..line.len() - 1]
    } else {
        line
    }
}

/// Canonical lookup key: trimmed, lowercase, spaces as underscores.
pub fn normalize_lemma(text: &str) -> String {
    text.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pos_names_and_chars() {
        assert_eq!(Pos::from_char('s'), Some(Pos::Adj));
        assert_eq!(Pos::from_char('x'), None);
        assert_eq!("noun".parse::<Pos>().unwrap(), Pos::Noun);
        assert_eq!("V".parse::<Pos>().unwrap(), Pos::Verb);
        assert!("pronoun".parse::<Pos>().is_err());
        assert_eq!(Pos::Adv.to_string(), "adv");
    }

    #[test]
    fn in_memory_lexicon_answers_lookups() {
        let lexicon = Lexicon::from_lemmas([
            (Pos::Noun, "product"),
            (Pos::Noun, "Item"),
            (Pos::Noun, "item"),
            (Pos::Verb, "run"),
            (Pos::Noun, "ice cream"),
        ]);
        assert!(lexicon.lemma_exists(Pos::Noun, "product"));
        assert!(lexicon.lemma_exists(Pos::Noun, "ITEM"));
        assert!(lexicon.lemma_exists(Pos::Noun, "ice_cream"));
        assert!(!lexicon.lemma_exists(Pos::Verb, "product"));
        assert_eq!(lexicon.lemma_count_for(Pos::Noun), 3);
        assert_eq!(lexicon.lemma_count(), 4);
    }

    #[test]
    fn rejects_wrong_pos_column() {
        let buffer = Buffer::Owned(b"run v 1 0 1 0 00000001\n".to_vec());
        let Err(err) = parse_index(buffer, Pos::Noun, Path::new("index.noun")) else {
            panic!("expected a pos mismatch");
        };
        assert!(err.to_string().contains("expected pos"));
    }

    #[test]
    fn skips_license_header() {
        let buffer = Buffer::Owned(
            b"  1 This software and database is being provided\n\
              able a 1 0 1 0 00001740\n"
                .to_vec(),
        );
        let index = parse_index(buffer, Pos::Adj, Path::new("index.adj")).unwrap();
        assert_eq!(index.lemmas.len(), 1);
        assert!(index.contains(b"able"));
    }
}
