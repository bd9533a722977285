use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use wordnet_lexicon::{LoadMode, Pos};

use review_pipeline::config::{
    DEFAULT_DOMAINS, DEFAULT_MAX_LENGTH, DEFAULT_MAX_TOKENS, DEFAULT_MAX_WORDS,
    DEFAULT_MIN_TOKENS, DEFAULT_SEED,
};
use review_pipeline::corpus::survey_domains;
use review_pipeline::pipeline::VOCABULARY_FILE;
use review_pipeline::{
    LanguageResources, LengthBounds, Pipeline, PipelineConfig, PipelineError, SplitFractions,
    TextEncoder, TokenizerConfig, VocabularyConfig,
};

const DEFAULT_STOPWORDS_PATH: &str = "resources/stopwords/english";
const DEFAULT_WORDNET_PATH: &str = "nltk_data/corpora/wordnet";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

#[derive(Parser)]
#[command(name = "review-pipeline")]
#[command(about = "Encode labelled product reviews into fixed-length id sequences")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write vocabulary, splits and summary.
    Prepare {
        #[command(flatten)]
        resources: ResourceArgs,
        #[arg(long, env = "REVIEW_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
        #[arg(long, env = "ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
        out_dir: PathBuf,
        /// Domain subdirectories to load, in order.
        #[arg(long = "domain", value_delimiter = ',', default_values = DEFAULT_DOMAINS)]
        domains: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_MAX_WORDS)]
        max_words: usize,
        #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
        max_length: usize,
        #[arg(long, default_value_t = DEFAULT_MIN_TOKENS)]
        min_tokens: usize,
        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
        max_tokens: usize,
        #[arg(long, default_value_t = 0.70)]
        train: f64,
        #[arg(long, default_value_t = 0.15)]
        val: f64,
        #[arg(long, default_value_t = 0.15)]
        test: f64,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Part of speech used for lemmatization (n, v, a, r).
        #[arg(long, default_value = "n", value_parser = parse_pos)]
        lemma_pos: Pos,
    },
    /// Encode one text with a persisted vocabulary and print the ids as JSON.
    Encode {
        #[command(flatten)]
        resources: ResourceArgs,
        #[arg(long, env = "ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
        artifacts_dir: PathBuf,
        /// Must match the vocabulary's sequence length when given.
        #[arg(long)]
        max_length: Option<usize>,
        text: String,
    },
    /// Report review counts and raw word-length statistics per domain.
    Explore {
        #[arg(long, env = "REVIEW_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
        #[arg(long = "domain", value_delimiter = ',', default_values = DEFAULT_DOMAINS)]
        domains: Vec<String>,
    },
}

#[derive(Args)]
struct ResourceArgs {
    #[arg(long, env = "STOPWORDS_PATH", default_value = DEFAULT_STOPWORDS_PATH)]
    stopwords: PathBuf,
    #[arg(long, env = "WORDNET_DIR", default_value = DEFAULT_WORDNET_PATH)]
    wordnet_dir: PathBuf,
    #[arg(long, env = "WORDNET_LOAD_MODE", default_value = "mmap", value_parser = parse_load_mode)]
    wordnet_mode: LoadMode,
}

impl ResourceArgs {
    fn load(&self) -> Result<Arc<LanguageResources>> {
        info!(
            "using wordnet at {} (mode: {:?})",
            self.wordnet_dir.display(),
            self.wordnet_mode
        );
        let start = Instant::now();
        let resources =
            LanguageResources::load(&self.stopwords, &self.wordnet_dir, self.wordnet_mode)?;
        info!("resources loaded in {} ms", start.elapsed().as_millis());
        Ok(Arc::new(resources))
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Prepare {
            resources,
            data_dir,
            out_dir,
            domains,
            max_words,
            max_length,
            min_tokens,
            max_tokens,
            train,
            val,
            test,
            seed,
            lemma_pos,
        } => {
            let config = PipelineConfig {
                domains,
                tokenizer: TokenizerConfig {
                    lemma_pos,
                    ..TokenizerConfig::default()
                },
                bounds: LengthBounds {
                    min: min_tokens,
                    max: max_tokens,
                },
                vocabulary: VocabularyConfig {
                    max_size: max_words,
                    sequence_length: max_length,
                },
                split: SplitFractions { train, val, test },
                seed,
                ..PipelineConfig::new(data_dir)
            };
            // Reject bad flags before paying for resource loading.
            config.validate()?;
            let pipeline = Pipeline::new(config, resources.load()?)?;

            let start = Instant::now();
            let output = pipeline.run()?;
            info!("pipeline finished in {} ms", start.elapsed().as_millis());
            output
                .persist(&out_dir)
                .with_context(|| format!("writing artifacts to {}", out_dir.display()))?;
        }
        Commands::Encode {
            resources,
            artifacts_dir,
            max_length,
            text,
        } => {
            // Tokenize with the settings recorded in the artifact.
            let encoder =
                TextEncoder::from_resources(resources.load()?, artifacts_dir.join(VOCABULARY_FILE))?;
            let expected = encoder.vocabulary().sequence_length();
            if let Some(requested) = max_length.filter(|&len| len != expected) {
                return Err(PipelineError::EncodingMismatch {
                    expected,
                    requested,
                }
                .into());
            }
            let ids = encoder.encode_text(&text);
            println!("{}", serde_json::to_string(&ids)?);
        }
        Commands::Explore { data_dir, domains } => {
            let surveys = survey_domains(&data_dir, &domains)?;
            println!("{}", serde_json::to_string_pretty(&surveys)?);
        }
    }

    Ok(())
}

fn parse_load_mode(raw: &str) -> Result<LoadMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Ok(LoadMode::Mmap),
        "owned" => Ok(LoadMode::Owned),
        other => Err(format!("unknown load mode {other:?}, expected mmap or owned")),
    }
}

fn parse_pos(raw: &str) -> Result<Pos, String> {
    raw.parse::<Pos>().map_err(|e| e.to_string())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();
}
