
// imports
use crate::config::TrainConfig;
use crate::corpus::read_corpus_dir;
use crate::error::{Error, Result};
use crate::model::TrainedModel;
use crate::phrases::Phrases;
use crate::tokenizer::tokenize;
use crate::train::Train;
use crate::vocab::Vocabulary;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::{debug, info};

pub struct Pipeline {}

impl Pipeline {

    // runs the main procedure of 4 steps -
    // -> tokenization
    // -> phrase detection and merging
    // -> vocabulary building
    // -> training

    pub fn train<I, S>(corpus: I, config: &TrainConfig) -> Result<TrainedModel>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str> + Sync,
    {
        Pipeline::run(corpus, config, None)
    }

    // cancel is checked at epoch boundaries
    pub fn train_with_cancel<I, S>(corpus: I, config: &TrainConfig, cancel: &AtomicBool) -> Result<TrainedModel>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str> + Sync,
    {
        Pipeline::run(corpus, config, Some(cancel))
    }

    pub fn train_from_folder<P: AsRef<Path>>(folder: P, config: &TrainConfig) -> Result<TrainedModel> {
        let texts = read_corpus_dir(&folder)?;
        info!("read {} text files from {:?}", texts.len(), folder.as_ref());
        Pipeline::train(texts, config)
    }

    fn run<I, S>(corpus: I, config: &TrainConfig, cancel: Option<&AtomicBool>) -> Result<TrainedModel>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str> + Sync,
    {

        config.validate()?;
        info!("{}", config);

        let docs: Vec<S> = corpus.into_iter().collect();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot build worker pool: {}", e)))?;

        // tokenize and detect phrases on the worker pool
        let timer = Instant::now();
        let (sequences, mut phrases) = pool.install(|| {
            let sentences: Vec<Vec<String>> = docs.par_iter().map(|doc| tokenize(doc.as_ref())).collect();
            let phrases = Phrases::fit(&sentences, config.phrase_min_count, config.phrase_threshold);
            let merged: Vec<Vec<String>> = sentences.par_iter().map(|sentence| phrases.apply(sentence)).collect();
            (merged, phrases)
        });
        info!("tokenized {} documents, found {} phrases, took {} ms ...", docs.len(), phrases.len(), timer.elapsed().as_millis());

        let vocab = Vocabulary::build(&sequences, config.min_count);
        if vocab.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        // rules whose phrase-token never made it into the vocabulary cannot be queried
        let pruned = phrases.prune(|key| vocab.contains(key));
        if pruned > 0 {
            debug!("dropped {} phrase rules absent from the vocabulary", pruned);
        }

        let encoded = vocab.encode(&sequences);
        info!("vocabulary holds {} terms over {} tokens", vocab.len(), vocab.total_count());

        let timer = Instant::now();
        info!("starting training part...");
        let trainer = Train::run(&encoded, vocab.counts(), config, cancel)?;
        info!("finished training, took {} ms ...", timer.elapsed().as_millis());

        let (w_input, w_output) = trainer.into_weights();
        Ok(TrainedModel::new(config.clone(), vocab, phrases, w_input, w_output))
    }

}
