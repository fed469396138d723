use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use grove::{RunConfig, UnseenCategory, Vocabulary};

#[derive(Debug, Parser)]
#[command(name = "grove", about = "Train a random forest on a training table and predict labels for a test table")]
struct Args {
    /// TOML config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Training table (must contain the label column).
    #[arg(long)]
    train: Option<PathBuf>,

    /// Test table to predict.
    #[arg(long)]
    test: Option<PathBuf>,

    /// Output file for `<id>,<label>` rows.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of trees in the forest.
    #[arg(long)]
    trees: Option<usize>,

    /// Maximum tree depth (0 = unlimited).
    #[arg(long)]
    max_depth: Option<usize>,

    /// Random seed for bootstrap and feature sampling.
    #[arg(long)]
    seed: Option<u64>,

    /// Where categorical vocabularies come from.
    #[arg(long, value_enum)]
    vocabulary: Option<Vocabulary>,

    /// What to do with test categories missing from the vocabulary.
    #[arg(long, value_enum)]
    unseen: Option<UnseenCategory>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)?,
            None => RunConfig::default(),
        };
        if let Some(train) = self.train {
            config.train_path = train;
        }
        if let Some(test) = self.test {
            config.test_path = test;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(trees) = self.trees {
            config.forest.n_trees = trees;
        }
        if let Some(max_depth) = self.max_depth {
            config.forest.max_depth = max_depth;
        }
        if let Some(seed) = self.seed {
            config.forest.seed = seed;
        }
        if let Some(vocabulary) = self.vocabulary {
            config.encoding.vocabulary = vocabulary;
        }
        if let Some(unseen) = self.unseen {
            config.encoding.unseen = unseen;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    grove::logging::init(&args.log_level)?;

    let config = args.into_config()?;
    let summary = grove::run(&config).with_context(|| {
        format!(
            "predicting {} from {}",
            config.test_path.display(),
            config.train_path.display()
        )
    })?;

    tracing::info!(
        output = %summary.output_path.display(),
        rows = summary.test_rows,
        counts = ?summary.predicted_counts,
        "run complete"
    );
    println!("Your submission was successfully saved!");
    Ok(())
}
