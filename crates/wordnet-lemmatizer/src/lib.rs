//! WordNet-style lemmatization (morphy).
//!
//! [`Morphy`] generates base-form candidates for a surface form:
//! 1. Emit the surface form if it is a known lemma.
//! 2. If the surface form has an exception entry (`*.exc`), emit those lemmas
//!    and stop; irregular forms never go through the suffix rules.
//! 3. Otherwise apply POS-specific suffix rules.
//!
//! Every candidate is checked against a caller-provided existence predicate,
//! so `Morphy` stays independent of how the lemma index is stored.
//! [`Lemmatizer`] couples it with a [`Lexicon`] and reduces the candidates to
//! one base form: the shortest candidate, or the word itself when WordNet
//! knows nothing better.
//!
//! ```no_run
//! use wordnet_lemmatizer::Lemmatizer;
//! use wordnet_lexicon::{LoadMode, Pos};
//!
//! # fn main() -> anyhow::Result<()> {
//! let lemmatizer = Lemmatizer::load("/path/to/wordnet", LoadMode::Mmap)?;
//! assert_eq!(lemmatizer.lemmatize("products", Pos::Noun), "product");
//! # Ok(()) }
//! ```

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use wordnet_lexicon::{Lexicon, LoadMode, Pos, normalize_lemma};

/// Where a candidate lemma originated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CandidateSource {
    Surface,
    Exception,
    Rule {
        suffix: &'static str,
        replacement: &'static str,
    },
}

/// A lemma candidate paired with its POS and provenance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LemmaCandidate<'a> {
    pub pos: Pos,
    pub lemma: Cow<'a, str>,
    pub source: CandidateSource,
}

/// Exception lists plus suffix rules, parameterised by an existence check.
#[derive(Debug, Default)]
pub struct Morphy {
    exceptions: HashMap<Pos, HashMap<String, Vec<String>>>,
}

impl Morphy {
    /// Load morphy exception lists (`*.exc`) from a WordNet dict directory.
    ///
    /// Files are optional; missing ones are treated as empty.
    pub fn load(dict_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dict_dir.as_ref();
        let mut exceptions = HashMap::new();
        for pos in Pos::ALL {
            exceptions.insert(pos, load_exc(dir.join(format!("{}.exc", pos.file_suffix())))?);
        }
        Ok(Self { exceptions })
    }

    /// Register irregular forms for one POS, e.g. `("children", ["child"])`.
    pub fn with_exceptions<'s, I, L>(mut self, pos: Pos, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'s str, L)>,
        L: IntoIterator<Item = &'s str>,
    {
        let map = self.exceptions.entry(pos).or_default();
        for (surface, lemmas) in entries {
            let lemmas: Vec<String> = lemmas.into_iter().map(normalize_lemma).collect();
            if !lemmas.is_empty() {
                map.insert(normalize_lemma(surface), lemmas);
            }
        }
        self
    }

    /// Number of exception entries across all parts of speech.
    pub fn exception_count(&self) -> usize {
        self.exceptions.values().map(HashMap::len).sum()
    }

    /// Generate lemmas for a surface form, returning enriched provenance.
    pub fn lemmas_for<'a, F>(
        &'a self,
        pos: Pos,
        surface: &str,
        lemma_exists: F,
    ) -> Vec<LemmaCandidate<'a>>
    where
        F: Fn(Pos, &str) -> bool,
    {
        let mut seen: HashSet<Cow<'a, str>> = HashSet::new();
        let mut out: Vec<LemmaCandidate<'a>> = Vec::new();
        let norm_surface = normalize_lemma(surface);
        if norm_surface.is_empty() {
            return out;
        }

        if lemma_exists(pos, &norm_surface) {
            push_unique(
                &mut out,
                &mut seen,
                LemmaCandidate {
                    pos,
                    lemma: Cow::Owned(norm_surface.clone()),
                    source: CandidateSource::Surface,
                },
            );
        }

        if let Some(entries) = self
            .exceptions
            .get(&pos)
            .and_then(|exc_map| exc_map.get(&norm_surface))
        {
            for lemma in entries {
                if lemma_exists(pos, lemma) {
                    push_unique(
                        &mut out,
                        &mut seen,
                        LemmaCandidate {
                            pos,
                            lemma: Cow::Borrowed(lemma.as_str()),
                            source: CandidateSource::Exception,
                        },
                    );
                }
            }
            return out;
        }

        for &(suffix, replacement) in rules_for(pos) {
            for candidate in apply_rule(pos, &norm_surface, suffix, replacement) {
                if lemma_exists(pos, &candidate) {
                    push_unique(
                        &mut out,
                        &mut seen,
                        LemmaCandidate {
                            pos,
                            lemma: Cow::Owned(candidate),
                            source: CandidateSource::Rule {
                                suffix,
                                replacement,
                            },
                        },
                    );
                }
            }
        }

        out
    }
}

/// Reduces morphy candidates to a single base form.
#[derive(Debug)]
pub struct Lemmatizer {
    lexicon: Lexicon,
    morphy: Morphy,
}

impl Lemmatizer {
    pub fn new(lexicon: Lexicon, morphy: Morphy) -> Self {
        Self { lexicon, morphy }
    }

    /// Load both the lemma index and the exception lists from one directory.
    pub fn load(dict_dir: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let dir = dict_dir.as_ref();
        let lexicon = Lexicon::load_with_mode(dir, mode)
            .with_context(|| format!("loading WordNet index from {}", dir.display()))?;
        let morphy = Morphy::load(dir)
            .with_context(|| format!("loading exceptions from {}", dir.display()))?;
        Ok(Self::new(lexicon, morphy))
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn morphy(&self) -> &Morphy {
        &self.morphy
    }

    /// Base form of `word`: the shortest known candidate (first wins on ties),
    /// or `word` unchanged when none exists.
    pub fn lemmatize<'w>(&self, word: &'w str, pos: Pos) -> Cow<'w, str> {
        let candidates = self
            .morphy
            .lemmas_for(pos, word, |p, lemma| self.lexicon.lemma_exists(p, lemma));
        match candidates
            .into_iter()
            .min_by_key(|cand| cand.lemma.chars().count())
        {
            Some(best) if best.lemma != word => Cow::Owned(best.lemma.into_owned()),
            _ => Cow::Borrowed(word),
        }
    }
}

fn load_exc(path: PathBuf) -> Result<HashMap<String, Vec<String>>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let file =
        File::open(&path).with_context(|| format!("open exception file {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut map = HashMap::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line =
            line.with_context(|| format!("read line {} in {}", lineno + 1, path.display()))?;
        let mut parts = line.split_whitespace();
        let surface = match parts.next() {
            Some(s) => normalize_lemma(s),
            None => continue,
        };
        let lemmas: Vec<String> = parts.map(normalize_lemma).collect();
        if !lemmas.is_empty() {
            map.insert(surface, lemmas);
        }
    }
    Ok(map)
}

fn push_unique<'a>(
    out: &mut Vec<LemmaCandidate<'a>>,
    seen: &mut HashSet<Cow<'a, str>>,
    candidate: LemmaCandidate<'a>,
) {
    if seen.insert(candidate.lemma.clone()) {
        out.push(candidate);
    }
}

fn apply_rule(pos: Pos, surface: &str, suffix: &str, replacement: &str) -> Vec<String> {
    let Some(stem) = surface.strip_suffix(suffix) else {
        return Vec::new();
    };
    if stem.is_empty() {
        return Vec::new();
    }
    let candidate = format!("{stem}{replacement}");

    // Verbs double their final consonant before -ing/-ed ("running" -> "runn").
    let mut out = Vec::with_capacity(2);
    if pos == Pos::Verb && replacement.is_empty() {
        let mut chars = candidate.chars();
        if let (Some(last), Some(prev)) = (chars.next_back(), chars.next_back())
            && last == prev
            && !"aeiou".contains(last)
        {
            let mut undoubled = candidate.clone();
            undoubled.pop();
            out.push(candidate);
            out.push(undoubled);
            return out;
        }
    }
    out.push(candidate);
    out
}

fn rules_for(pos: Pos) -> &'static [(&'static str, &'static str)] {
    match pos {
        Pos::Noun => &[
            ("s", ""),
            ("ses", "s"),
            ("ves", "f"),
            ("xes", "x"),
            ("zes", "z"),
            ("ches", "ch"),
            ("shes", "sh"),
            ("men", "man"),
            ("ies", "y"),
        ],
        Pos::Verb => &[
            ("s", ""),
            ("ies", "y"),
            ("es", "e"),
            ("es", ""),
            ("ed", "e"),
            ("ed", ""),
            ("ing", "e"),
            ("ing", ""),
        ],
        Pos::Adj => &[("er", ""), ("est", ""), ("er", "e"), ("est", "e")],
        Pos::Adv => &[],
    }
}
