use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{Label, RawReview};
use crate::tokenize::CleanedReview;

/// Summary statistics of a length distribution.
///
/// `std` is the sample standard deviation (zero for a single value) and the
/// quartiles interpolate linearly between the closest ranks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: usize,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: usize,
}

impl LengthStats {
    /// `None` for an empty input.
    pub fn from_lengths(lengths: &[usize]) -> Option<Self> {
        let mut sorted = lengths.to_vec();
        sorted.sort_unstable();
        let (&min, &max) = (sorted.first()?, sorted.last()?);

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<usize>() as f64 / n;
        let std = if sorted.len() > 1 {
            let ss: f64 = sorted.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count: sorted.len(),
            mean,
            std,
            min,
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max,
        })
    }
}

fn quantile(sorted: &[usize], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassBalance {
    pub negative: usize,
    pub positive: usize,
}

impl ClassBalance {
    pub fn from_labels(labels: impl IntoIterator<Item = Label>) -> Self {
        labels.into_iter().fold(Self::default(), |mut acc, label| {
            match label {
                Label::Negative => acc.negative += 1,
                Label::Positive => acc.positive += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.negative + self.positive
    }

    pub fn positive_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.positive as f64 / total as f64,
        }
    }
}

/// Class balance, token-count distribution and duplicate count of the
/// processed corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub classes: ClassBalance,
    pub tokens: Option<LengthStats>,
    /// Reviews whose token sequence already appeared earlier.
    pub duplicates: usize,
}

impl QualityReport {
    pub fn compute(reviews: &[CleanedReview]) -> Self {
        let lengths: Vec<usize> = reviews.iter().map(CleanedReview::len).collect();
        let mut seen = HashSet::with_capacity(reviews.len());
        let duplicates = reviews
            .iter()
            .filter(|review| !seen.insert(review.tokens.as_slice()))
            .count();
        Self {
            classes: ClassBalance::from_labels(reviews.iter().map(|r| r.label)),
            tokens: LengthStats::from_lengths(&lengths),
            duplicates,
        }
    }

    pub fn log(&self) {
        info!(
            "class distribution: {} negative, {} positive ({:.1}% positive)",
            self.classes.negative,
            self.classes.positive,
            self.classes.positive_ratio() * 100.0
        );
        if let Some(stats) = &self.tokens {
            info!(
                "tokens per review: count {} mean {:.1} std {:.1} min {} 25% {:.1} 50% {:.1} 75% {:.1} max {}",
                stats.count,
                stats.mean,
                stats.std,
                stats.min,
                stats.q25,
                stats.median,
                stats.q75,
                stats.max
            );
        }
        info!("duplicate reviews: {}", self.duplicates);
    }
}

/// Raw whitespace word counts per label, before any cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLengthReport {
    pub all: Option<LengthStats>,
    pub positive: Option<LengthStats>,
    pub negative: Option<LengthStats>,
}

impl RawLengthReport {
    pub fn compute(reviews: &[RawReview]) -> Self {
        let lengths_for = |label: Option<Label>| -> Vec<usize> {
            reviews
                .iter()
                .filter(|r| label.is_none_or(|l| r.label() == l))
                .map(|r| r.text().split_whitespace().count())
                .collect()
        };
        Self {
            all: LengthStats::from_lengths(&lengths_for(None)),
            positive: LengthStats::from_lengths(&lengths_for(Some(Label::Positive))),
            negative: LengthStats::from_lengths(&lengths_for(Some(Label::Negative))),
        }
    }
}
