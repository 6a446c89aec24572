use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use phrase2vec::phrases::display_key;
use phrase2vec::{tokenize, ModelStore, Similarity};
use std::fs;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// checks on trained vectors:
// the K most similar terms to each listed term or phrase,
// and analogies "a is to b as c is to d", scored by whether d shows up in the top K.
// built as its own executable so it can run against any saved model

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Task {
    /// one term or phrase per line
    Similarity,
    /// four terms per line: "a b c d", or "a, b, c, d" when phrases are involved
    Analogies,
}

#[derive(Parser, Debug)]
#[command(name = "evaluate", about = "Similarity and analogy checks against a saved model")]
struct Args {
    #[arg(value_enum)]
    task: Task,

    /// Input file, one example per line
    input: PathBuf,

    /// Folder holding word2vec.model and phraser.json
    #[arg(short, long, default_value = "./models")]
    model_dir: PathBuf,

    #[arg(short, default_value_t = 10)]
    k: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let model = ModelStore::load_dir(&args.model_dir).context("loading model")?;
    let text = fs::read_to_string(&args.input).with_context(|| format!("reading {:?}", args.input))?;
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let sim = model.similarity();

    match args.task {
        Task::Similarity => run_similarity(&lines, args.k, &sim),
        Task::Analogies => run_analogies(&lines, args.k, &sim),
    }
}

fn run_analogies(inputs: &[&str], k: usize, sim: &Similarity) -> anyhow::Result<()> {

    // a is to b as c is to ?
    // translates to b - a + c : ?
    let mut hits = 0;
    let mut total = 0;

    for line in inputs {

        let input = split_analogy(line);
        if input.len() != 4 {
            bail!("expected four terms per line, got '{}'", line);
        }

        let source = [input[0], input[1], input[2]];
        let target = input[3];

        let analogies = match sim.extract_analogies(source, k) {
            Ok(analogies) => analogies,
            Err(e) => {
                warn!("skipping '{}': {}", line, e);
                continue;
            }
        };
        total += 1;

        for (i, (analogy, score)) in analogies.iter().enumerate() {
            println!("{} : {} - {} + {} ? {} = {:.4}", i, source[1], source[0], source[2], display_key(analogy), score);
        }
        match target_position(&analogies, target) {
            Some(i) => {
                hits += 1;
                println!("found target '{}' analogy in place {}", target, 1 + i);
            }
            None => println!("target '{}' was not found within the first {} analogies", target, k),
        }
        println!();
    }

    println!("{} / {} analogies found in the top {}", hits, total, k);
    Ok(())
}

// commas separate terms once any of them is a phrase
fn split_analogy(line: &str) -> Vec<&str> {
    if line.contains(',') {
        line.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
    } else {
        line.split_whitespace().collect()
    }
}

fn target_position(analogies: &[(String, f32)], target: &str) -> Option<usize> {
    let target = tokenize(target).join(" ");
    analogies.iter().position(|(analogy, _)| display_key(analogy) == target)
}

fn run_similarity(inputs: &[&str], k: usize, sim: &Similarity) -> anyhow::Result<()> {

    for term in inputs {
        match sim.most_similar(term, k) {
            Ok(similarities) => {
                println!("{} most similar terms to {}", k, term);
                for (i, (similar, score)) in similarities.iter().enumerate() {
                    println!("{} : {} ? {} = {:.4}", i, term, phrase2vec::phrases::display_key(similar), score);
                }
                println!();
            }
            Err(e) => warn!("skipping '{}': {}", term, e),
        }
    }

    Ok(())
}


#[cfg(test)]
mod tests {

    use super::{split_analogy, target_position};
    use phrase2vec::Term;

    #[test]
    fn split_analogy_test() {
        assert_eq!(split_analogy("man king woman queen"), vec!["man", "king", "woman", "queen"]);
        assert_eq!(split_analogy("paris, france, new york, usa"), vec!["paris", "france", "new york", "usa"]);
        assert_eq!(split_analogy("a, b,, c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn target_position_test() {
        let phrase = Term::Phrase("new".into(), "york".into()).key();
        let analogies = vec![("boston".to_string(), 0.9), (phrase, 0.8)];

        assert_eq!(target_position(&analogies, "New York"), Some(1));
        assert_eq!(target_position(&analogies, "boston"), Some(0));
        assert_eq!(target_position(&analogies, "chicago"), None);
    }
}
