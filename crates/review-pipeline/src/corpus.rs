//! Review files to labelled raw reviews.
//!
//! Each domain directory holds `positive.review` and `negative.review`, both
//! pseudo-XML: a review is whatever sits between `<review>` and `</review>`.
//! The files are not well-formed, so they are scanned for the sentinels
//! rather than parsed.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::quality::{ClassBalance, RawLengthReport};

pub const OPEN_TAG: &str = "<review>";
pub const CLOSE_TAG: &str = "</review>";
pub const POSITIVE_FILE: &str = "positive.review";
pub const NEGATIVE_FILE: &str = "negative.review";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    Negative = 0,
    Positive = 1,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Negative, Label::Positive];

    pub fn file_name(self) -> &'static str {
        match self {
            Label::Negative => NEGATIVE_FILE,
            Label::Positive => POSITIVE_FILE,
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label as u8
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid label {0}, expected 0 or 1")]
pub struct InvalidLabel(pub u8);

impl TryFrom<u8> for Label {
    type Error = InvalidLabel;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => Err(InvalidLabel(other)),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Label::Negative => "negative",
            Label::Positive => "positive",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReview {
    text: String,
    domain: String,
    label: Label,
}

impl RawReview {
    pub fn new(text: impl Into<String>, domain: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            domain: domain.into(),
            label,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn label(&self) -> Label {
        self.label
    }
}

/// Extract review bodies in file order.
///
/// Every block after an open tag runs to the matching close tag, or to the
/// next open tag / end of input when the close tag is missing. Text before
/// the first open tag is ignored, as are blank blocks.
pub fn parse_reviews(text: &str) -> Vec<String> {
    text.split(OPEN_TAG)
        .skip(1)
        .map(|block| match block.find(CLOSE_TAG) {
            Some(end) => &block[..end],
            None => block,
        })
        .map(str::trim)
        .filter(|body| !body.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Read a review file, replacing invalid UTF-8 instead of failing.
pub fn read_review_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(parse_reviews(&String::from_utf8_lossy(&bytes)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainReport {
    pub domain: String,
    pub positive: usize,
    pub negative: usize,
}

impl DomainReport {
    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusReport {
    pub domains: Vec<DomainReport>,
    pub skipped: Vec<String>,
}

impl CorpusReport {
    pub fn total(&self) -> usize {
        self.domains.iter().map(DomainReport::total).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Corpus {
    pub reviews: Vec<RawReview>,
    pub report: CorpusReport,
}

/// Load one domain. `Ok(None)` when either review file is missing.
pub fn load_domain(data_dir: &Path, domain: &str) -> Result<Option<(Vec<RawReview>, DomainReport)>> {
    let dir = data_dir.join(domain);
    let paths = [Label::Positive, Label::Negative].map(|label| (label, dir.join(label.file_name())));
    if let Some((_, missing)) = paths.iter().find(|(_, path)| !path.is_file()) {
        warn!("skipping domain {domain}: {} not found", missing.display());
        return Ok(None);
    }

    let mut reviews = Vec::new();
    let mut report = DomainReport {
        domain: domain.to_string(),
        positive: 0,
        negative: 0,
    };
    for (label, path) in paths {
        let bodies = read_review_file(&path)?;
        match label {
            Label::Positive => report.positive = bodies.len(),
            Label::Negative => report.negative = bodies.len(),
        }
        reviews.extend(bodies.into_iter().map(|text| RawReview::new(text, domain, label)));
    }
    Ok(Some((reviews, report)))
}

/// Concatenate all domains in order. Fails when nothing at all was extracted.
pub fn load_corpus<S: AsRef<str>>(data_dir: impl AsRef<Path>, domains: &[S]) -> Result<Corpus> {
    let data_dir = data_dir.as_ref();
    let mut reviews = Vec::new();
    let mut report = CorpusReport::default();

    for domain in domains {
        let domain = domain.as_ref();
        match load_domain(data_dir, domain)? {
            Some((mut loaded, domain_report)) => {
                info!(
                    "{domain}: {} positive, {} negative",
                    domain_report.positive, domain_report.negative
                );
                reviews.append(&mut loaded);
                report.domains.push(domain_report);
            }
            None => report.skipped.push(domain.to_string()),
        }
    }

    if reviews.is_empty() {
        return Err(PipelineError::EmptyCorpus {
            domains: domains.len(),
        });
    }
    info!(
        "loaded {} reviews from {} domain(s), {} skipped",
        reviews.len(),
        report.domains.len(),
        report.skipped.len()
    );
    Ok(Corpus { reviews, report })
}

/// What a domain directory holds, without tokenizing anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSurvey {
    pub domain: String,
    pub path: PathBuf,
    pub positive_file: bool,
    pub negative_file: bool,
    pub positive: usize,
    pub negative: usize,
    /// Whitespace word counts of the raw review text.
    pub words: RawLengthReport,
}

/// Inspect every domain, reading whichever files are present.
pub fn survey_domains<S: AsRef<str>>(
    data_dir: impl AsRef<Path>,
    domains: &[S],
) -> Result<Vec<DomainSurvey>> {
    let data_dir = data_dir.as_ref();
    domains
        .iter()
        .map(|domain| {
            let domain = domain.as_ref();
            let dir = data_dir.join(domain);
            let mut present = [false; 2];
            let mut reviews = Vec::new();
            for label in Label::ALL {
                let path = dir.join(label.file_name());
                if path.is_file() {
                    present[label as usize] = true;
                    reviews.extend(
                        read_review_file(&path)?
                            .into_iter()
                            .map(|text| RawReview::new(text, domain, label)),
                    );
                }
            }
            let classes = ClassBalance::from_labels(reviews.iter().map(RawReview::label));
            Ok(DomainSurvey {
                domain: domain.to_string(),
                path: dir,
                positive_file: present[Label::Positive as usize],
                negative_file: present[Label::Negative as usize],
                positive: classes.positive,
                negative: classes.negative,
                words: RawLengthReport::compute(&reviews),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_closed_and_unterminated_blocks() {
        let text = "<review>A</review><review>B";
        assert_eq!(parse_reviews(text), ["A", "B"]);
    }

    #[test]
    fn ignores_preamble_and_blank_blocks() {
        let text = "junk\n<review>\n  first \n</review>\n<review>   </review><review>\nsecond\n</review>trailer";
        assert_eq!(parse_reviews(text), ["first", "second"]);
    }

    #[test]
    fn unterminated_block_stops_at_next_open_tag() {
        let text = "<review>one<review>two</review>";
        assert_eq!(parse_reviews(text), ["one", "two"]);
    }

    #[test]
    fn no_sentinels_means_no_reviews() {
        assert!(parse_reviews("plain text").is_empty());
        assert!(parse_reviews("").is_empty());
    }

    #[test]
    fn label_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Label::Positive).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Label>("0").unwrap(), Label::Negative);
        assert!(serde_json::from_str::<Label>("2").is_err());
    }

    #[test]
    fn lossy_decoding_keeps_the_review() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positive.review");
        fs::write(&path, b"<review>caf\xff ok</review>").unwrap();
        let reviews = read_review_file(&path).unwrap();
        assert_eq!(reviews, ["caf\u{fffd} ok"]);
    }

    #[test]
    fn survey_reports_partial_domains() {
        let dir = tempfile::tempdir().unwrap();
        let books = dir.path().join("books");
        fs::create_dir(&books).unwrap();
        fs::write(
            books.join(POSITIVE_FILE),
            "<review>one two three</review><review>four</review>",
        )
        .unwrap();

        let surveys = survey_domains(dir.path(), &["books", "dvd"]).unwrap();
        let books = &surveys[0];
        assert!(books.positive_file && !books.negative_file);
        assert_eq!((books.positive, books.negative), (2, 0));
        assert_eq!(books.words.positive.unwrap().max, 3);
        assert!(books.words.negative.is_none());
        assert!(!surveys[1].positive_file);
        assert!(surveys[1].words.all.is_none());
    }

    #[test]
    fn missing_file_skips_the_domain() {
        let dir = tempfile::tempdir().unwrap();
        let books = dir.path().join("books");
        fs::create_dir(&books).unwrap();
        fs::write(books.join(POSITIVE_FILE), "<review>fine</review>").unwrap();
        assert!(load_domain(dir.path(), "books").unwrap().is_none());
        assert!(matches!(
            load_corpus(dir.path(), &["books"]),
            Err(PipelineError::EmptyCorpus { domains: 1 })
        ));
    }
}
