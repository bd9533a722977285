use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use wordnet_lexicon::Pos;

use crate::error::ConfigError;

/// Domains of the multi-domain sentiment dataset, in load order.
pub const DEFAULT_DOMAINS: [&str; 4] = ["books", "dvd", "electronics", "kitchen_&_housewares"];
pub const DEFAULT_MAX_WORDS: usize = 10_000;
pub const DEFAULT_MAX_LENGTH: usize = 200;
pub const DEFAULT_MIN_TOKENS: usize = 10;
pub const DEFAULT_MAX_TOKENS: usize = 1000;
pub const DEFAULT_SEED: u64 = 42;

/// Inclusive token-count window used by the outlier filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub fn new(min: usize, max: usize) -> Result<Self, ConfigError> {
        let bounds = Self { min, max };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max == 0 {
            return Err(ConfigError::NotPositive("max_tokens"));
        }
        if self.min > self.max {
            return Err(ConfigError::InvertedBounds {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn contains(&self, n: usize) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

impl Default for LengthBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_TOKENS,
            max: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Number of real tokens that receive an id; everything else is OOV.
    pub max_size: usize,
    /// Fixed length of every encoded sequence.
    pub sequence_length: usize,
}

impl VocabularyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::NotPositive("max_size"));
        }
        if self.sequence_length == 0 {
            return Err(ConfigError::NotPositive("sequence_length"));
        }
        // Ids are u32 with two reserved slots.
        let limit = (u32::MAX - 2) as usize;
        if self.max_size > limit {
            return Err(ConfigError::TooLarge {
                name: "max_size",
                limit,
            });
        }
        Ok(())
    }
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_WORDS,
            sequence_length: DEFAULT_MAX_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFractions {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl SplitFractions {
    pub fn new(train: f64, val: f64, test: f64) -> Result<Self, ConfigError> {
        let fractions = Self { train, val, test };
        fractions.validate()?;
        Ok(fractions)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::FractionOutOfRange { name, value });
            }
        }
        let sum = self.train + self.val + self.test;
        if sum > 1.0 + 1e-9 {
            return Err(ConfigError::FractionSum(sum));
        }
        Ok(())
    }
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self {
            train: 0.70,
            val: 0.15,
            test: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerConfig {
    /// Tokens shorter than this many characters are dropped.
    pub min_token_chars: usize,
    /// Part of speech handed to the lemmatizer.
    pub lemma_pos: Pos,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_token_chars: 3,
            lemma_pos: Pos::Noun,
        }
    }
}

impl fmt::Display for TokenizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lemma pos {}, min {} chars",
            self.lemma_pos.to_char(),
            self.min_token_chars
        )
    }
}

/// Everything one pipeline run needs besides the linguistic resources.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub domains: Vec<String>,
    pub tokenizer: TokenizerConfig,
    pub bounds: LengthBounds,
    pub vocabulary: VocabularyConfig,
    pub split: SplitFractions,
    pub seed: u64,
    /// Number of processed reviews echoed at debug level.
    pub sample_size: usize,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            domains: DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect(),
            tokenizer: TokenizerConfig::default(),
            bounds: LengthBounds::default(),
            vocabulary: VocabularyConfig::default(),
            split: SplitFractions::default(),
            seed: DEFAULT_SEED,
            sample_size: 4,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domains.is_empty() {
            return Err(ConfigError::NoDomains);
        }
        if self.tokenizer.min_token_chars == 0 {
            return Err(ConfigError::NotPositive("min_token_chars"));
        }
        self.bounds.validate()?;
        self.vocabulary.validate()?;
        self.split.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(PipelineConfig::new("data").validate(), Ok(()));
    }

    #[test]
    fn rejects_fractions_over_one() {
        let err = SplitFractions::new(0.7, 0.2, 0.2).unwrap_err();
        assert!(matches!(err, ConfigError::FractionSum(sum) if (sum - 1.1).abs() < 1e-9));
        assert!(SplitFractions::new(0.7, 0.2, 0.1).is_ok());
        assert!(SplitFractions::new(0.5, 0.2, 0.1).is_ok());
    }

    #[test]
    fn rejects_negative_and_nan_fractions() {
        assert!(matches!(
            SplitFractions::new(0.9, -0.1, 0.1),
            Err(ConfigError::FractionOutOfRange { name: "val", .. })
        ));
        assert!(SplitFractions::new(f64::NAN, 0.1, 0.1).is_err());
    }

    #[test]
    fn rejects_zero_lengths_and_inverted_bounds() {
        let mut config = PipelineConfig::new("data");
        config.vocabulary.sequence_length = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive("sequence_length"))
        );

        assert_eq!(
            LengthBounds::new(20, 10),
            Err(ConfigError::InvertedBounds { min: 20, max: 10 })
        );
        assert_eq!(LengthBounds::new(0, 0), Err(ConfigError::NotPositive("max_tokens")));
    }

    #[test]
    fn bounds_are_inclusive() {
        let bounds = LengthBounds::new(2, 4).unwrap();
        assert!(!bounds.contains(1));
        assert!(bounds.contains(2));
        assert!(bounds.contains(4));
        assert!(!bounds.contains(5));
    }
}
