//! Labelled review corpus to fixed-length id sequences.
//!
//! Parse review files, normalize and lemmatize the text, drop length
//! outliers, build a frequency-ranked vocabulary, encode every review and
//! split the result into stratified train, validation and test sets.

pub mod config;
pub mod corpus;
pub mod encode;
pub mod error;
pub mod normalize;
pub mod outliers;
pub mod persist;
pub mod pipeline;
pub mod quality;
pub mod resources;
pub mod split;
pub mod tokenize;
pub mod vocab;

pub use config::{LengthBounds, PipelineConfig, SplitFractions, TokenizerConfig, VocabularyConfig};
pub use corpus::{Corpus, CorpusReport, DomainReport, Label, RawReview, load_corpus, parse_reviews};
pub use encode::{EncodedExample, TextEncoder, encode, encode_batch};
pub use error::{ArtifactError, ConfigError, PipelineError, ResourceKind, Result};
pub use normalize::clean;
pub use outliers::{OutlierReport, filter_outliers};
pub use pipeline::{Pipeline, PipelineOutput, RunSummary, load_split};
pub use quality::{LengthStats, QualityReport};
pub use resources::{LanguageResources, StopWords};
pub use split::{Labelled, Split, split};
pub use tokenize::{CleanedReview, Tokenizer};
pub use vocab::{OOV_ID, PAD_ID, Vocabulary};
