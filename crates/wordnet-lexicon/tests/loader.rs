use std::path::PathBuf;

use wordnet_lexicon::{Lexicon, LoadMode, Pos};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("wn")
}

#[test]
fn loads_every_index_file() {
    let lexicon = Lexicon::load(fixture_dir()).expect("load fixtures");
    assert_eq!(lexicon.lemma_count_for(Pos::Noun), 4);
    assert_eq!(lexicon.lemma_count_for(Pos::Verb), 1);
    assert_eq!(lexicon.lemma_count(), 7);
    assert!(lexicon.lemma_exists(Pos::Noun, "dog"));
    assert!(lexicon.lemma_exists(Pos::Adj, "good"));
    assert!(!lexicon.lemma_exists(Pos::Noun, "dogs"));
    assert!(!lexicon.lemma_exists(Pos::Verb, "dog"));
}

#[test]
fn owned_mode_matches_mmap() {
    let mmap = Lexicon::load_with_mode(fixture_dir(), LoadMode::Mmap).expect("mmap");
    let owned = Lexicon::load_with_mode(fixture_dir(), LoadMode::Owned).expect("owned");
    for lemma in ["child", "dog", "glass", "product", "cat"] {
        assert_eq!(
            mmap.lemma_exists(Pos::Noun, lemma),
            owned.lemma_exists(Pos::Noun, lemma)
        );
    }
}

#[test]
fn tolerates_crlf_line_endings() {
    let lexicon = Lexicon::load(fixture_dir()).expect("load fixtures");
    assert!(lexicon.lemma_exists(Pos::Adv, "quickly"));
}

#[test]
fn missing_index_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.noun"), "dog n 1 0 1 0 02084071\n").unwrap();
    let err = Lexicon::load(dir.path()).unwrap_err();
    assert!(err.to_string().contains("missing required WordNet file"));
    assert_eq!(Lexicon::required_files(dir.path()).len(), 4);
}
