use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::info;
use wordnet_lemmatizer::Lemmatizer;
use wordnet_lexicon::{Lexicon, LoadMode};

use crate::error::{PipelineError, ResourceKind, Result};

/// Words removed before lemmatization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Read a list with one word per line; blank lines and `#` comments are
    /// skipped. An absent or empty list is reported as missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PipelineError::MissingResource {
                kind: ResourceKind::Stopwords,
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let stopwords = Self::from_words(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        );
        if stopwords.is_empty() {
            return Err(PipelineError::MissingResource {
                kind: ResourceKind::Stopwords,
                path: path.to_path_buf(),
            });
        }
        Ok(stopwords)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Stopwords plus lemmatizer, constructed once and shared by every tokenizer.
#[derive(Debug)]
pub struct LanguageResources {
    stopwords: StopWords,
    lemmatizer: Lemmatizer,
}

impl LanguageResources {
    pub fn new(stopwords: StopWords, lemmatizer: Lemmatizer) -> Self {
        Self {
            stopwords,
            lemmatizer,
        }
    }

    /// Load the stopword list and the WordNet dictionary, failing fast when
    /// either is unavailable.
    pub fn load(
        stopwords_path: impl AsRef<Path>,
        wordnet_dir: impl AsRef<Path>,
        mode: LoadMode,
    ) -> Result<Self> {
        let stopwords = StopWords::load(stopwords_path)?;

        let wordnet_dir = wordnet_dir.as_ref();
        for path in Lexicon::required_files(wordnet_dir) {
            if !path.is_file() {
                return Err(PipelineError::MissingResource {
                    kind: ResourceKind::WordNet,
                    path,
                });
            }
        }
        let lemmatizer =
            Lemmatizer::load(wordnet_dir, mode).map_err(|source| PipelineError::Resource {
                kind: ResourceKind::WordNet,
                path: wordnet_dir.to_path_buf(),
                source: source.into(),
            })?;
        if lemmatizer.lexicon().lemma_count() == 0 {
            return Err(PipelineError::MissingResource {
                kind: ResourceKind::WordNet,
                path: wordnet_dir.to_path_buf(),
            });
        }

        info!(
            "loaded {} stopwords and {} wordnet lemmas ({} exceptions)",
            stopwords.len(),
            lemmatizer.lexicon().lemma_count(),
            lemmatizer.morphy().exception_count()
        );
        Ok(Self::new(stopwords, lemmatizer))
    }

    pub fn stopwords(&self) -> &StopWords {
        &self.stopwords
    }

    pub fn lemmatizer(&self) -> &Lemmatizer {
        &self.lemmatizer
    }
}
