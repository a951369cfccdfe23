use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use vsearch_core::persist::{publish, IndexPaths, Snapshot};
use vsearch_core::{build, Collection, Normalizer};

#[derive(Parser)]
#[command(name = "vsearch-indexer")]
#[command(about = "Build and inspect the tf-idf cosine index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a document collection and publish it as the live snapshot
    Build {
        /// Collection file (.json keyed by 1-based ids, .json array, or .jsonl)
        #[arg(long)]
        input: String,
        /// Index root directory
        #[arg(long)]
        output: String,
        /// Stopword list, one word per line (defaults to the built-in English list)
        #[arg(long)]
        stopwords: Option<String>,
        /// Number of snapshots to retain, including the new one
        #[arg(long, default_value_t = 2)]
        keep: usize,
    },
    /// Print metadata of the live snapshot
    Info {
        #[arg(long, default_value = "./index")]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, stopwords, keep } => {
            build_index(&input, &output, stopwords.as_deref(), keep).map(|_| ())
        }
        Commands::Info { index } => {
            let snap = Snapshot::open(&IndexPaths::new(&index))?;
            println!("snapshot: {}", snap.name());
            println!("{}", serde_json::to_string_pretty(snap.meta())?);
            Ok(())
        }
    }
}

fn build_index(input: &str, output: &str, stopwords: Option<&str>, keep: usize) -> Result<String> {
    let normalizer = match stopwords {
        Some(path) => Normalizer::from_stopword_file(path).with_context(|| format!("reading stopwords {path}"))?,
        None => Normalizer::english(),
    };
    let collection = Collection::load(input).with_context(|| format!("loading collection {input}"))?;
    let built = build(&normalizer, &collection)?;
    let name = publish(&IndexPaths::new(output), &built, keep).with_context(|| format!("publishing index to {output}"))?;
    tracing::info!(output, snapshot = %name, "index build complete");
    Ok(name)
}
