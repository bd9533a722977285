use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::TokenizerConfig;
use crate::corpus::{Label, RawReview};
use crate::normalize;
use crate::resources::LanguageResources;

/// A review reduced to its lemmatized tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedReview {
    pub tokens: Vec<String>,
    pub label: Label,
}

impl CleanedReview {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AsRef<[String]> for CleanedReview {
    fn as_ref(&self) -> &[String] {
        &self.tokens
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    resources: Arc<LanguageResources>,
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(resources: Arc<LanguageResources>, config: TokenizerConfig) -> Self {
        Self { resources, config }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Split already-cleaned text into lemmatized tokens.
    pub fn tokenize(&self, cleaned: &str) -> Vec<String> {
        let lemmatizer = self.resources.lemmatizer();
        cleaned
            .split_whitespace()
            .filter(|word| self.keeps(word))
            .filter_map(|word| {
                let lemma = lemmatizer.lemmatize(word, self.config.lemma_pos);
                self.keeps(&lemma).then(|| lemma.into_owned())
            })
            .collect()
    }

    /// `tokenize(clean(raw))`.
    pub fn process(&self, raw: &str) -> Vec<String> {
        self.tokenize(&normalize::clean(raw))
    }

    pub fn process_review(&self, review: &RawReview) -> CleanedReview {
        CleanedReview {
            tokens: self.process(review.text()),
            label: review.label(),
        }
    }

    fn keeps(&self, word: &str) -> bool {
        word.chars().count() >= self.config.min_token_chars
            && !self.resources.stopwords().contains(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::StopWords;
    use wordnet_lemmatizer::{Lemmatizer, Morphy};
    use wordnet_lexicon::{Lexicon, Pos};

    fn tokenizer() -> Tokenizer {
        let stopwords = StopWords::from_words(["this", "was", "the", "not", "item"]);
        let lexicon = Lexicon::from_lemmas([
            (Pos::Noun, "product"),
            (Pos::Noun, "battery"),
            (Pos::Noun, "child"),
            (Pos::Noun, "item"),
            (Pos::Noun, "ox"),
            (Pos::Verb, "run"),
        ]);
        let morphy = Morphy::default()
            .with_exceptions(Pos::Noun, [("children", ["child"]), ("oxen", ["ox"])]);
        let resources = LanguageResources::new(stopwords, Lemmatizer::new(lexicon, morphy));
        Tokenizer::new(Arc::new(resources), TokenizerConfig::default())
    }

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let tokens = tokenizer().tokenize("this was a great product ok");
        assert_eq!(tokens, ["great", "product"]);
    }

    #[test]
    fn lemmatizes_as_nouns() {
        let tokens = tokenizer().tokenize("batteries children running");
        assert_eq!(tokens, ["battery", "child", "running"]);
    }

    #[test]
    fn drops_lemmas_that_become_stopwords() {
        let tok = tokenizer();
        assert!(tok.tokenize("items oxen").is_empty());
        assert_eq!(tok.tokenize("products"), ["product"]);
    }

    #[test]
    fn process_cleans_first() {
        let tokens = tokenizer().process("<br/>This was NOT the GREAT product!!!");
        assert_eq!(tokens, ["great", "product"]);
    }

    #[test]
    fn empty_input_gives_no_tokens() {
        assert!(tokenizer().process("   ").is_empty());
    }
}
