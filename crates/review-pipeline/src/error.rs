use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::TokenizerConfig;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("missing {kind} resource at {}", .path.display())]
    MissingResource { kind: ResourceKind, path: PathBuf },
    #[error("failed to load {kind} resource from {}", .path.display())]
    Resource {
        kind: ResourceKind,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("corpus is empty: no reviews extracted from {domains} configured domain(s)")]
    EmptyCorpus { domains: usize },
    #[error("all {removed} reviews were removed by the outlier filter")]
    NothingLeft { removed: usize },
    #[error("vocabulary was built for sequence length {expected}, encode requested {requested}")]
    EncodingMismatch { expected: usize, requested: usize },
    #[error("vocabulary was built with {expected}, tokenizer uses {found}")]
    TokenizerMismatch {
        expected: TokenizerConfig,
        found: TokenizerConfig,
    },
    #[error("i/o error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Linguistic resources the tokenizer cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Stopwords,
    WordNet,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Stopwords => "stopword",
            ResourceKind::WordNet => "wordnet",
        })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("split fraction {name} must be finite and within [0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },
    #[error("split fractions must sum to at most 1.0, got {0}")]
    FractionSum(f64),
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    #[error("{name} must be at most {limit}")]
    TooLarge { name: &'static str, limit: usize },
    #[error("length bounds are inverted: min {min} > max {max}")]
    InvertedBounds { min: usize, max: usize },
    #[error("no domains configured")]
    NoDomains,
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("malformed vocabulary artifact {}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported vocabulary format version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },
    #[error("vocabulary checksum mismatch: stored {stored}, computed {computed}")]
    Checksum { stored: String, computed: String },
    #[error("unknown lemma part of speech {0:?} in vocabulary artifact")]
    LemmaPos(char),
    #[error("inconsistent vocabulary artifact: {0}")]
    Inconsistent(String),
}
