use anyhow::Context;
use clap::{Parser, Subcommand};
use phrase2vec::query::parse_terms;
use phrase2vec::{query, ModelStore, Pipeline, TrainConfig, DEFAULT_TOP_N};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Train phrase-aware word embeddings on a folder of text files and explore them
#[derive(Parser, Debug)]
#[command(name = "phrase2vec")]
#[command(about = "Phrase-aware word embeddings explorer", long_about = None)]
struct Args {
    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a new model on every .txt file in a folder
    Train {
        /// Folder with the .txt corpus
        folder: PathBuf,

        /// JSON file overriding the default hyper-parameters
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where the model and phrase rules are written
        #[arg(short, long, default_value = "./models")]
        output_dir: PathBuf,

        /// Also export the vectors as vecs.npy and words.json
        #[arg(long)]
        export_npy: bool,
    },
    /// Find related terms for comma separated words and phrases
    Query {
        /// Saved model file
        #[arg(long, default_value = "./models/word2vec.model")]
        model: PathBuf,

        /// Saved phrase rules file
        #[arg(long, default_value = "./models/phraser.json")]
        phrases: PathBuf,

        /// Words and phrases separated by commas, e.g. "market, new york"
        #[arg(short, long)]
        terms: String,

        /// Related terms per query
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        /// Tab separated output table
        #[arg(short, long, default_value = "output.tsv")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Command::Train { folder, config, output_dir, export_npy } => {
            let config = match config {
                Some(path) => TrainConfig::from_json_file(&path)
                    .with_context(|| format!("loading config {:?}", path))?,
                None => TrainConfig::default(),
            };

            let timer = Instant::now();
            let model = Pipeline::train_from_folder(&folder, &config)
                .with_context(|| format!("training on {:?}", folder))?;
            info!("elapsed time: {:.4}s", timer.elapsed().as_secs_f64());

            ModelStore::save(&model, &output_dir)?;
            if export_npy {
                ModelStore::export_npy(&model, &output_dir)?;
            }
        }
        Command::Query { model, phrases, terms, top_n, output } => {
            let trained = ModelStore::load(&model, &phrases).context("loading model")?;

            let timer = Instant::now();
            let results = query(&trained, &parse_terms(&terms), top_n);
            info!("elapsed time: {:.4}s", timer.elapsed().as_secs_f64());

            for (term, related) in results.iter() {
                let cells: Vec<String> = related.iter().map(|(t, s)| format!("{}: {:.4}", t, s)).collect();
                println!("{}: {}", term, cells.join(", "));
            }
            results.write_tsv(&output).with_context(|| format!("writing {:?}", output))?;
            info!("wrote {} columns to {:?}", results.len(), output);
        }
    }

    Ok(())
}
