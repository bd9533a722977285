//! Frequency-ranked token vocabulary.
//!
//! Ids `0` and `1` are reserved for padding and out-of-vocabulary tokens; the
//! `max_size` most frequent tokens get ids `2..=max_size + 1`. Ties in
//! frequency go to the token seen first in the corpus scan, so the ranking
//! does not depend on how the parallel count was scheduled.
//!
//! A vocabulary also remembers the tokenizer settings its tokens came from.
//! Ids only mean the same thing when new text is tokenized the same way.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use wordnet_lexicon::Pos;

use crate::config::{TokenizerConfig, VocabularyConfig};
use crate::error::{ArtifactError, ConfigError, PipelineError, Result};
use crate::persist::StagedDir;

pub const PAD_ID: u32 = 0;
pub const OOV_ID: u32 = 1;
const FIRST_TOKEN_ID: u32 = 2;
pub const FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TokenStat {
    count: u64,
    /// (review index, token index) of the first occurrence.
    first_seen: (usize, usize),
}

impl TokenStat {
    fn merge(&mut self, other: TokenStat) {
        self.count += other.count;
        self.first_seen = self.first_seen.min(other.first_seen);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    token_to_id: HashMap<String, u32>,
    /// Tokens ordered by id, starting at [`FIRST_TOKEN_ID`].
    tokens: Vec<String>,
    max_size: usize,
    sequence_length: usize,
    distinct_tokens: usize,
    tokenizer: TokenizerConfig,
}

impl Vocabulary {
    /// Count every token occurrence and keep the `max_size` most frequent.
    ///
    /// The result records the default tokenizer settings; use
    /// [`Vocabulary::with_tokenizer`] when the sequences were produced with
    /// others.
    pub fn build<T>(sequences: &[T], config: &VocabularyConfig) -> Result<Self, ConfigError>
    where
        T: AsRef<[String]> + Sync,
    {
        config.validate()?;

        let counts: DashMap<String, TokenStat> = DashMap::new();
        sequences.par_iter().enumerate().for_each(|(doc, seq)| {
            let mut local: HashMap<&str, TokenStat> = HashMap::new();
            for (pos, token) in seq.as_ref().iter().enumerate() {
                local
                    .entry(token.as_str())
                    .and_modify(|stat| stat.count += 1)
                    .or_insert(TokenStat {
                        count: 1,
                        first_seen: (doc, pos),
                    });
            }
            for (token, stat) in local {
                counts
                    .entry(token.to_owned())
                    .and_modify(|merged| merged.merge(stat))
                    .or_insert(stat);
            }
        });

        let mut ranked: Vec<(String, TokenStat)> = counts.into_iter().collect();
        ranked.sort_unstable_by(|(_, a), (_, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });
        let distinct_tokens = ranked.len();
        ranked.truncate(config.max_size);

        let vocab = Self::from_ranked(
            ranked.into_iter().map(|(token, _)| token).collect(),
            config,
            distinct_tokens,
            TokenizerConfig::default(),
        );
        info!(
            "vocabulary: {} distinct tokens, {} assigned ids (max {})",
            vocab.distinct_tokens,
            vocab.assigned(),
            vocab.max_size
        );
        Ok(vocab)
    }

    fn from_ranked(
        tokens: Vec<String>,
        config: &VocabularyConfig,
        distinct_tokens: usize,
        tokenizer: TokenizerConfig,
    ) -> Self {
        let token_to_id = tokens
            .iter()
            .zip(FIRST_TOKEN_ID..)
            .map(|(token, id)| (token.clone(), id))
            .collect();
        Self {
            token_to_id,
            tokens,
            max_size: config.max_size,
            sequence_length: config.sequence_length,
            distinct_tokens,
            tokenizer,
        }
    }

    /// Record the tokenizer settings the counted sequences were produced with.
    pub fn with_tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn tokenizer_config(&self) -> TokenizerConfig {
        self.tokenizer
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.token_to_id.get(token).copied()
    }

    pub fn id_or_oov(&self, token: &str) -> u32 {
        self.id(token).unwrap_or(OOV_ID)
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        let index = id.checked_sub(FIRST_TOKEN_ID)? as usize;
        self.tokens.get(index).map(String::as_str)
    }

    /// Tokens in id order.
    pub fn tokens(&self) -> impl Iterator<Item = (u32, &str)> {
        (FIRST_TOKEN_ID..).zip(self.tokens.iter().map(String::as_str))
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Distinct tokens seen while building, including those beyond `max_size`.
    pub fn distinct_tokens(&self) -> usize {
        self.distinct_tokens
    }

    /// Number of tokens that received an id.
    pub fn assigned(&self) -> usize {
        self.tokens.len()
    }

    /// Rows an embedding table needs: every assigned id plus PAD and OOV.
    pub fn embedding_rows(&self) -> usize {
        self.tokens.len() + FIRST_TOKEN_ID as usize
    }

    pub fn config(&self) -> VocabularyConfig {
        VocabularyConfig {
            max_size: self.max_size,
            sequence_length: self.sequence_length,
        }
    }

    pub fn to_artifact(&self) -> VocabularyArtifact {
        let mut artifact = VocabularyArtifact {
            format_version: FORMAT_VERSION,
            max_size: self.max_size,
            sequence_length: self.sequence_length,
            pad_id: PAD_ID,
            oov_id: OOV_ID,
            distinct_tokens: self.distinct_tokens,
            lemma_pos: self.tokenizer.lemma_pos.to_char(),
            min_token_chars: self.tokenizer.min_token_chars,
            tokens: self.tokens.clone(),
            checksum: String::new(),
        };
        artifact.checksum = artifact.compute_checksum();
        artifact
    }

    /// Validate an artifact and rebuild the lookup table from it.
    pub fn from_artifact(artifact: VocabularyArtifact) -> Result<Self, ArtifactError> {
        if artifact.format_version != FORMAT_VERSION {
            return Err(ArtifactError::Version {
                found: artifact.format_version,
                expected: FORMAT_VERSION,
            });
        }
        let computed = artifact.compute_checksum();
        if computed != artifact.checksum {
            return Err(ArtifactError::Checksum {
                stored: artifact.checksum,
                computed,
            });
        }
        let tokenizer = artifact.check_consistency()?;

        let config = VocabularyConfig {
            max_size: artifact.max_size,
            sequence_length: artifact.sequence_length,
        };
        Ok(Self::from_ranked(
            artifact.tokens,
            &config,
            artifact.distinct_tokens,
            tokenizer,
        ))
    }

    /// Write the artifact to `path`, replacing any previous file only once the
    /// new one is complete.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let (dir, name) = split_file_path(path)?;
        let mut staged = StagedDir::new(dir)?;
        staged.write_json(name, &self.to_artifact())?;
        staged.commit()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let artifact: VocabularyArtifact =
            serde_json::from_str(&raw).map_err(|source| ArtifactError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        let vocab = Self::from_artifact(artifact)?;
        debug!(
            "loaded vocabulary from {} ({} tokens)",
            path.display(),
            vocab.assigned()
        );
        Ok(vocab)
    }
}

fn split_file_path(path: &Path) -> Result<(&Path, &str)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            PipelineError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
            )
        })?;
    let dir = path.parent().unwrap_or(Path::new("."));
    let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
    Ok((dir, name))
}

/// On-disk form of a [`Vocabulary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyArtifact {
    pub format_version: u32,
    pub max_size: usize,
    pub sequence_length: usize,
    pub pad_id: u32,
    pub oov_id: u32,
    pub distinct_tokens: usize,
    /// WordNet part-of-speech character used for lemmatization.
    pub lemma_pos: char,
    pub min_token_chars: usize,
    /// Tokens in id order; the first has id 2.
    pub tokens: Vec<String>,
    /// Hex SHA-256 over every other field.
    pub checksum: String,
}

impl VocabularyArtifact {
    pub fn compute_checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.format_version.to_le_bytes());
        for value in [self.max_size, self.sequence_length, self.distinct_tokens] {
            hasher.update((value as u64).to_le_bytes());
        }
        hasher.update(self.pad_id.to_le_bytes());
        hasher.update(self.oov_id.to_le_bytes());
        hasher.update(u32::from(self.lemma_pos).to_le_bytes());
        hasher.update((self.min_token_chars as u64).to_le_bytes());
        for token in &self.tokens {
            hasher.update((token.len() as u64).to_le_bytes());
            hasher.update(token.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Structural checks beyond the checksum. Returns the recorded tokenizer
    /// settings.
    fn check_consistency(&self) -> Result<TokenizerConfig, ArtifactError> {
        let fail = |msg: String| Err(ArtifactError::Inconsistent(msg));
        if self.pad_id != PAD_ID || self.oov_id != OOV_ID {
            return fail(format!(
                "reserved ids must be pad={PAD_ID} oov={OOV_ID}, got pad={} oov={}",
                self.pad_id, self.oov_id
            ));
        }
        let config = VocabularyConfig {
            max_size: self.max_size,
            sequence_length: self.sequence_length,
        };
        if let Err(err) = config.validate() {
            return fail(err.to_string());
        }
        if self.tokens.len() != self.max_size.min(self.distinct_tokens) {
            return fail(format!(
                "{} tokens stored, expected min(max_size {}, distinct {})",
                self.tokens.len(),
                self.max_size,
                self.distinct_tokens
            ));
        }
        let mut seen = HashSet::with_capacity(self.tokens.len());
        if let Some(dup) = self.tokens.iter().find(|t| !seen.insert(t.as_str())) {
            return fail(format!("token {dup:?} stored twice"));
        }
        if self.tokens.iter().any(|t| t.is_empty()) {
            return fail("empty token stored".to_string());
        }
        if self.min_token_chars == 0 {
            return fail("min_token_chars must be greater than zero".to_string());
        }
        let lemma_pos =
            Pos::from_char(self.lemma_pos).ok_or(ArtifactError::LemmaPos(self.lemma_pos))?;
        Ok(TokenizerConfig {
            lemma_pos,
            min_token_chars: self.min_token_chars,
        })
    }
}
