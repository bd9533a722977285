use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{PipelineConfig, SplitFractions};
use crate::corpus::{CorpusReport, RawReview, load_corpus};
use crate::encode::{EncodedExample, encode_batch};
use crate::error::{ArtifactError, PipelineError, Result};
use crate::outliers::{OutlierReport, filter_outliers};
use crate::persist::StagedDir;
use crate::quality::QualityReport;
use crate::resources::LanguageResources;
use crate::split::{Split, positive_ratio, split};
use crate::tokenize::{CleanedReview, Tokenizer};
use crate::vocab::Vocabulary;

pub const VOCABULARY_FILE: &str = "vocabulary.json";
pub const SUMMARY_FILE: &str = "summary.json";
pub const SPLIT_FILES: [&str; 3] = ["train.jsonl", "val.jsonl", "test.jsonl"];

const PROGRESS_EVERY: usize = 1000;

/// Corpus files to encoded, split examples in one batch run.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    tokenizer: Tokenizer,
}

impl Pipeline {
    /// Rejects an invalid configuration before any data is read.
    pub fn new(config: PipelineConfig, resources: Arc<LanguageResources>) -> Result<Self> {
        config.validate()?;
        let tokenizer = Tokenizer::new(resources, config.tokenizer);
        Ok(Self { config, tokenizer })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn run(&self) -> Result<PipelineOutput> {
        let config = &self.config;
        let corpus = load_corpus(&config.data_dir, &config.domains)?;

        let cleaned = self.preprocess(&corpus.reviews);
        for (i, review) in cleaned.iter().take(config.sample_size).enumerate() {
            debug!(
                "sample {i} ({}): {}",
                review.label,
                review.tokens.join(" ")
            );
        }

        let (kept, outliers) = filter_outliers(cleaned, config.bounds);
        info!(
            "outlier filter [{}, {}] tokens: kept {}, removed {} ({} too short, {} too long)",
            config.bounds.min,
            config.bounds.max,
            outliers.kept,
            outliers.removed,
            outliers.too_short,
            outliers.too_long
        );
        if kept.is_empty() {
            return Err(PipelineError::NothingLeft {
                removed: outliers.removed,
            });
        }

        let quality = QualityReport::compute(&kept);
        quality.log();

        let vocabulary =
            Vocabulary::build(&kept, &config.vocabulary)?.with_tokenizer(config.tokenizer);
        let encoded = encode_batch(&kept, &vocabulary, vocabulary.sequence_length())?;
        let split = split(encoded, &config.split, config.seed)?;
        for (name, part) in split.parts() {
            info!(
                "{name}: {} x {} ids, {:.1}% positive",
                part.len(),
                vocabulary.sequence_length(),
                positive_ratio(part) * 100.0
            );
        }

        Ok(PipelineOutput {
            vocabulary,
            split,
            corpus: corpus.report,
            outliers,
            quality,
            fractions: config.split,
            seed: config.seed,
        })
    }

    fn preprocess(&self, reviews: &[RawReview]) -> Vec<CleanedReview> {
        let total = reviews.len();
        let done = AtomicUsize::new(0);
        let cleaned: Vec<CleanedReview> = reviews
            .par_iter()
            .map(|review| {
                let cleaned = self.tokenizer.process_review(review);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n % PROGRESS_EVERY == 0 {
                    debug!("preprocessed {n}/{total} reviews");
                }
                cleaned
            })
            .collect();
        info!("preprocessed {total} reviews");
        cleaned
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub vocabulary: Vocabulary,
    pub split: Split<EncodedExample>,
    pub corpus: CorpusReport,
    pub outliers: OutlierReport,
    pub quality: QualityReport,
    pub fractions: SplitFractions,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartSummary {
    pub examples: usize,
    pub positive_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularySummary {
    pub max_size: usize,
    pub sequence_length: usize,
    pub distinct_tokens: usize,
    pub assigned: usize,
    pub embedding_rows: usize,
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub corpus: CorpusReport,
    pub outliers: OutlierReport,
    pub quality: QualityReport,
    pub vocabulary: VocabularySummary,
    pub train: PartSummary,
    pub val: PartSummary,
    pub test: PartSummary,
    pub fractions: SplitFractions,
    pub seed: u64,
}

impl PipelineOutput {
    pub fn summary(&self) -> RunSummary {
        let part = |examples: &[EncodedExample]| PartSummary {
            examples: examples.len(),
            positive_ratio: positive_ratio(examples),
        };
        RunSummary {
            corpus: self.corpus.clone(),
            outliers: self.outliers,
            quality: self.quality.clone(),
            vocabulary: VocabularySummary {
                max_size: self.vocabulary.max_size(),
                sequence_length: self.vocabulary.sequence_length(),
                distinct_tokens: self.vocabulary.distinct_tokens(),
                assigned: self.vocabulary.assigned(),
                embedding_rows: self.vocabulary.embedding_rows(),
            },
            train: part(&self.split.train),
            val: part(&self.split.val),
            test: part(&self.split.test),
            fractions: self.fractions,
            seed: self.seed,
        }
    }

    /// Write the vocabulary, the three splits and the run summary into
    /// `out_dir`. Nothing appears under its final name unless every file was
    /// written.
    pub fn persist(&self, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let mut staged = StagedDir::new(out_dir.as_ref())?;
        staged.write_json(VOCABULARY_FILE, &self.vocabulary.to_artifact())?;
        for ((_, part), name) in self.split.parts().into_iter().zip(SPLIT_FILES) {
            staged.write_jsonl(name, part)?;
        }
        staged.write_json(SUMMARY_FILE, &self.summary())?;
        let written = staged.commit()?;
        info!(
            "wrote {} artifacts to {}",
            written.len(),
            out_dir.as_ref().display()
        );
        Ok(written)
    }
}

/// Read back the splits written by [`PipelineOutput::persist`].
pub fn load_split(dir: impl AsRef<Path>) -> Result<Split<EncodedExample>> {
    let dir = dir.as_ref();
    let [train, val, test] = SPLIT_FILES.map(|name| read_jsonl(&dir.join(name)));
    Ok(Split {
        train: train?,
        val: val?,
        test: test?,
    })
}

fn read_jsonl(path: &Path) -> Result<Vec<EncodedExample>> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut rows = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| PipelineError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|source| ArtifactError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}
