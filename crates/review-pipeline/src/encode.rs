use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::corpus::Label;
use crate::error::{PipelineError, Result};
use crate::resources::LanguageResources;
use crate::tokenize::{CleanedReview, Tokenizer};
use crate::vocab::{PAD_ID, Vocabulary};

/// A review as a fixed-length id sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedExample {
    pub ids: Vec<u32>,
    pub label: Label,
}

fn check_length(vocabulary: &Vocabulary, length: usize) -> Result<()> {
    if length != vocabulary.sequence_length() {
        return Err(PipelineError::EncodingMismatch {
            expected: vocabulary.sequence_length(),
            requested: length,
        });
    }
    Ok(())
}

/// Map tokens to ids, truncating and padding at the end to exactly `length`.
pub fn encode<S: AsRef<str>>(
    tokens: &[S],
    vocabulary: &Vocabulary,
    length: usize,
) -> Result<Vec<u32>> {
    check_length(vocabulary, length)?;
    Ok(encode_unchecked(tokens, vocabulary, length))
}

fn encode_unchecked<S: AsRef<str>>(tokens: &[S], vocabulary: &Vocabulary, length: usize) -> Vec<u32> {
    let mut ids: Vec<u32> = tokens
        .iter()
        .take(length)
        .map(|token| vocabulary.id_or_oov(token.as_ref()))
        .collect();
    ids.resize(length, PAD_ID);
    ids
}

/// Encode many reviews in parallel; output order follows input order.
pub fn encode_batch(
    reviews: &[CleanedReview],
    vocabulary: &Vocabulary,
    length: usize,
) -> Result<Vec<EncodedExample>> {
    check_length(vocabulary, length)?;
    Ok(reviews
        .par_iter()
        .map(|review| EncodedExample {
            ids: encode_unchecked(&review.tokens, vocabulary, length),
            label: review.label,
        })
        .collect())
}

/// Prediction-time encoder: raw text in, ids out, using a frozen vocabulary.
#[derive(Debug, Clone)]
pub struct TextEncoder {
    tokenizer: Tokenizer,
    vocabulary: Vocabulary,
}

impl TextEncoder {
    /// Fails when `sequence_length` or the tokenizer settings differ from
    /// those the vocabulary was built with.
    pub fn new(tokenizer: Tokenizer, vocabulary: Vocabulary, sequence_length: usize) -> Result<Self> {
        check_length(&vocabulary, sequence_length)?;
        if *tokenizer.config() != vocabulary.tokenizer_config() {
            return Err(PipelineError::TokenizerMismatch {
                expected: vocabulary.tokenizer_config(),
                found: *tokenizer.config(),
            });
        }
        Ok(Self {
            tokenizer,
            vocabulary,
        })
    }

    /// Use the persisted vocabulary at `artifact` with its own sequence length.
    pub fn load(tokenizer: Tokenizer, artifact: impl AsRef<Path>) -> Result<Self> {
        let vocabulary = Vocabulary::load(artifact)?;
        let length = vocabulary.sequence_length();
        Self::new(tokenizer, vocabulary, length)
    }

    /// Like [`TextEncoder::load`], tokenizing with the settings recorded in
    /// the artifact.
    pub fn from_resources(
        resources: Arc<LanguageResources>,
        artifact: impl AsRef<Path>,
    ) -> Result<Self> {
        let vocabulary = Vocabulary::load(artifact)?;
        let tokenizer = Tokenizer::new(resources, vocabulary.tokenizer_config());
        let length = vocabulary.sequence_length();
        Self::new(tokenizer, vocabulary, length)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn tokens(&self, raw: &str) -> Vec<String> {
        self.tokenizer.process(raw)
    }

    pub fn encode_text(&self, raw: &str) -> Vec<u32> {
        encode_unchecked(
            &self.tokens(raw),
            &self.vocabulary,
            self.vocabulary.sequence_length(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TokenizerConfig, VocabularyConfig};
    use crate::resources::StopWords;
    use crate::vocab::OOV_ID;
    use proptest::prelude::*;
    use wordnet_lemmatizer::{Lemmatizer, Morphy};
    use wordnet_lexicon::{Lexicon, Pos};

    fn resources() -> Arc<LanguageResources> {
        let stopwords = StopWords::from_words(["this", "was", "the", "an"]);
        let lexicon = Lexicon::from_lemmas([
            (Pos::Noun, "product"),
            (Pos::Noun, "item"),
            (Pos::Noun, "battery"),
            (Pos::Verb, "die"),
        ]);
        Arc::new(LanguageResources::new(
            stopwords,
            Lemmatizer::new(lexicon, Morphy::default()),
        ))
    }

    fn scenario_vocab() -> Vocabulary {
        let corpus = vec![
            vec!["great".to_string(), "product".to_string()],
            vec!["awful".to_string(), "item".to_string()],
        ];
        Vocabulary::build(
            &corpus,
            &VocabularyConfig {
                max_size: 3,
                sequence_length: 5,
            },
        )
        .unwrap()
    }

    #[test]
    fn pads_at_the_end() {
        let vocab = scenario_vocab();
        let ids = encode(&["great", "product"], &vocab, 5).unwrap();
        assert_eq!(ids, [2, 3, 0, 0, 0]);
    }

    #[test]
    fn unknown_tokens_become_oov() {
        let vocab = scenario_vocab();
        let ids = encode(&["item", "great", "zebra"], &vocab, 5).unwrap();
        assert_eq!(ids, [OOV_ID, 2, OOV_ID, 0, 0]);
    }

    #[test]
    fn truncates_at_the_end() {
        let vocab = scenario_vocab();
        let tokens = ["awful", "great", "great", "product", "awful", "great", "product"];
        assert_eq!(encode(&tokens, &vocab, 5).unwrap(), [4, 2, 2, 3, 4]);
    }

    #[test]
    fn empty_input_is_all_padding() {
        let vocab = scenario_vocab();
        assert_eq!(encode::<&str>(&[], &vocab, 5).unwrap(), [0; 5]);
    }

    #[test]
    fn length_must_match_vocabulary() {
        let vocab = scenario_vocab();
        assert!(matches!(
            encode(&["great"], &vocab, 6),
            Err(PipelineError::EncodingMismatch {
                expected: 5,
                requested: 6
            })
        ));
    }

    #[test]
    fn batch_preserves_order_and_labels() {
        let vocab = scenario_vocab();
        let reviews = vec![
            CleanedReview {
                tokens: vec!["awful".into()],
                label: Label::Negative,
            },
            CleanedReview {
                tokens: vec!["great".into(), "product".into()],
                label: Label::Positive,
            },
        ];
        let encoded = encode_batch(&reviews, &vocab, 5).unwrap();
        assert_eq!(encoded[0].ids, [4, 0, 0, 0, 0]);
        assert_eq!(encoded[0].label, Label::Negative);
        assert_eq!(encoded[1].ids, [2, 3, 0, 0, 0]);
        assert!(encode_batch(&reviews, &vocab, 4).is_err());
    }

    #[test]
    fn tokenized_reviews_get_distinct_ids() {
        let tokenizer = Tokenizer::new(resources(), TokenizerConfig::default());
        let corpus = vec![
            tokenizer.process("This was a great product"),
            tokenizer.process("An awful item"),
        ];
        assert_eq!(corpus, [["great", "product"], ["awful", "item"]]);

        let vocab = Vocabulary::build(
            &corpus,
            &VocabularyConfig {
                max_size: 10,
                sequence_length: 5,
            },
        )
        .unwrap();
        let ids: Vec<u32> = ["great", "product", "awful", "item"]
            .iter()
            .map(|t| vocab.id(t).expect("assigned"))
            .collect();
        assert!(ids.iter().all(|&id| id >= 2));
        let unique: std::collections::HashSet<u32> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 4);

        let encoder = TextEncoder::new(tokenizer, vocab, 5).unwrap();
        assert_eq!(encoder.encode_text("great product"), [ids[0], ids[1], 0, 0, 0]);
    }

    #[test]
    fn encoder_rejects_other_tokenizer_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabulary.json");
        let corpus = vec![vec!["battery".to_string(), "died".to_string()]];
        Vocabulary::build(
            &corpus,
            &VocabularyConfig {
                max_size: 10,
                sequence_length: 4,
            },
        )
        .unwrap()
        .save(&path)
        .unwrap();

        let other = TokenizerConfig {
            lemma_pos: Pos::Verb,
            min_token_chars: 5,
        };
        let err = TextEncoder::load(Tokenizer::new(resources(), other), &path).unwrap_err();
        match err {
            PipelineError::TokenizerMismatch { expected, found } => {
                assert_eq!(expected, TokenizerConfig::default());
                assert_eq!(found, other);
            }
            unexpected => panic!("unexpected error: {unexpected}"),
        }

        let encoder = TextEncoder::from_resources(resources(), &path).unwrap();
        assert_eq!(encoder.encode_text("The batteries died quickly"), [2, 3, OOV_ID, 0]);
    }

    #[test]
    fn example_serializes_as_ids_and_label() {
        let example = EncodedExample {
            ids: vec![2, 0],
            label: Label::Positive,
        };
        assert_eq!(
            serde_json::to_string(&example).unwrap(),
            r#"{"ids":[2,0],"label":1}"#
        );
    }

    proptest! {
        #[test]
        fn output_length_is_always_fixed(
            tokens in prop::collection::vec("[a-z]{1,8}", 0..40),
            length in 1usize..32,
        ) {
            let corpus = vec![tokens.clone()];
            let vocab = Vocabulary::build(
                &corpus,
                &VocabularyConfig { max_size: 8, sequence_length: length },
            ).unwrap();
            let ids = encode(&tokens, &vocab, length).unwrap();
            prop_assert_eq!(ids.len(), length);
            prop_assert!(ids.iter().all(|&id| (id as usize) < vocab.embedding_rows()));
            let padded = tokens.len().min(length);
            prop_assert!(ids[padded..].iter().all(|&id| id == PAD_ID));
        }
    }
}
