
use ndarray::prelude::*;
use ndarray::Array;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use crate::config::TrainConfig;
use crate::error::{Error, Result};
use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info};

// exponent applied to counts for the negative sampling distribution
const UNIGRAM_POWER: f64 = 0.75;

// negatives come from the unigram distribution raised to 3/4
pub struct NegativeSampler {
    table: WeightedIndex<f64>,
}

impl NegativeSampler {

    pub fn new(counts: &[u64]) -> Result<NegativeSampler> {
        let weights = counts.iter().map(|c| (*c as f64).powf(UNIGRAM_POWER));
        let table = WeightedIndex::new(weights).map_err(|_| Error::EmptyCorpus)?;
        Ok(Self { table })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.table.sample(rng)
    }
}

// skip-gram with negative sampling, w_input rows are the embeddings
pub struct Train {
    w_input: Array2<f32>,
    w_output: Array2<f32>,
    sampler: NegativeSampler,
    keep_probs: Vec<f32>,
    rng: StdRng,
}

struct EpochProgress {
    loss: f64,          // summed logistic loss of the epoch
    pairs: u64,         // number of (input, target) updates of the epoch
    words_done: u64,    // corpus positions seen over all epochs, drives the decay
    total_words: u64,   // corpus positions over all epochs
    alpha: f32,         // rate used for the latest centre position
}

impl EpochProgress {

    fn new(total_words: u64, alpha: f32) -> Self {
        Self {
            loss: 0.0,
            pairs: 0,
            words_done: 0,
            total_words,
            alpha,
        }
    }

    fn reset_epoch(&mut self) {
        self.loss = 0.0;
        self.pairs = 0;
    }

    fn mean_loss(&self) -> f64 {
        if self.pairs == 0 { 0.0 } else { self.loss / self.pairs as f64 }
    }

    // linear decay from alpha towards min_alpha over the whole run
    fn learning_rate(&self, alpha: f32, min_alpha: f32) -> f32 {
        let progress = self.words_done as f32 / self.total_words.max(1) as f32;
        (alpha - (alpha - min_alpha) * progress).max(min_alpha)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Train {

    fn new(counts: &[u64], config: &TrainConfig) -> Result<Train> {

        let vocab_size = counts.len();
        let dim = config.vector_size;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let w_input = Array::random_using((vocab_size, dim), Uniform::new(-0.5f32, 0.5f32), &mut rng) / dim as f32;
        let w_output = Array2::zeros((vocab_size, dim));

        Ok(Self {
            w_input,
            w_output,
            sampler: NegativeSampler::new(counts)?,
            keep_probs: Train::keep_probabilities(counts, config.sample),
            rng,
        })
    }

    // chance of keeping one occurrence of each token, all ones when sample is zero
    fn keep_probabilities(counts: &[u64], sample: f64) -> Vec<f32> {
        let total: u64 = counts.iter().sum();
        if sample <= 0.0 || total == 0 {
            return vec![1.0; counts.len()];
        }
        let threshold_count = sample * total as f64;
        counts.iter().map(|c| {
            let c = *c as f64;
            (((c / threshold_count).sqrt() + 1.0) * threshold_count / c).min(1.0) as f32
        }).collect()
    }

    pub fn get_w_input(&self) -> &Array2<f32> {
        &self.w_input
    }

    pub fn into_weights(self) -> (Array2<f32>, Array2<f32>) {
        (self.w_input, self.w_output)
    }

    // one (context, target) step; returns the logistic loss of the pair
    fn update_pair(&mut self, context: usize, target: usize, label: f32, alpha: f32, neu1e: &mut Array1<f32>) -> f64 {

        let l1 = self.w_input.row(context);
        let mut l2 = self.w_output.row_mut(target);

        // error = sigma(u.v) - y, stepped against the gradient
        let f = sigmoid(l1.dot(&l2));
        let g = (label - f) * alpha;

        neu1e.scaled_add(g, &l2);
        l2.scaled_add(g, &l1);

        let p_correct = if label > 0.5 { f } else { 1.0 - f };
        -(p_correct.max(1e-7) as f64).ln()
    }

    fn do_training_sequence(&mut self,
           sequence: &[usize],
           config: &TrainConfig,
           progress: &mut EpochProgress,
           neu1e: &mut Array1<f32>,
        ) {

            let base = progress.words_done;

            // frequent tokens are randomly dropped before windows are formed,
            // each kept token remembers its position for the decay
            let mut kept: Vec<(u64, usize)> = Vec::with_capacity(sequence.len());
            for (offset, id) in sequence.iter().enumerate() {
                let p = self.keep_probs[*id];
                if p >= 1.0 || self.rng.gen::<f32>() < p {
                    kept.push((offset as u64, *id));
                }
            }

            for pos in 0..kept.len() {

                let (offset, center) = kept[pos];
                progress.words_done = base + offset;
                let alpha = progress.learning_rate(config.alpha, config.min_alpha);
                progress.alpha = alpha;

                let reduced = self.rng.gen_range(1..=config.window);
                let start = pos.saturating_sub(reduced);
                let end = usize::min(pos + reduced + 1, kept.len());

                for c in start..end {
                    if c == pos { continue }
                    let context = kept[c].1;

                    neu1e.fill(0.0);
                    for d in 0..=config.negative_samples {

                        let (target, label) = if d == 0 {
                            (center, 1.0)
                        } else {
                            let target = self.sampler.sample(&mut self.rng);
                            if target == center { continue }
                            (target, 0.0)
                        };

                        progress.loss += self.update_pair(context, target, label, alpha, neu1e);
                        progress.pairs += 1;
                    }

                    // input row update accumulated over the positive and negatives
                    self.w_input.row_mut(context).add_assign(&*neu1e);
                }
            }

            progress.words_done = base + sequence.len() as u64;
    }


    fn train(&mut self, corpus: &[Vec<usize>], config: &TrainConfig, cancel: Option<&AtomicBool>) -> Result<()> {

        let words_per_epoch: u64 = corpus.iter().map(|s| s.len() as u64).sum();
        let mut progress = EpochProgress::new(words_per_epoch * config.epochs as u64, config.alpha);
        let mut neu1e: Array1<f32> = Array1::zeros(config.vector_size);

        let mut order = (0..corpus.len()).collect::<Vec<usize>>();

        for epoch in 0..config.epochs {

            // only whole epochs are ever applied
            if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                return Err(Error::Cancelled { completed_epochs: epoch });
            }

            let my_time = Instant::now();
            progress.reset_epoch();

            // sequence order is shuffled, token order inside a sequence is not
            order.shuffle(&mut self.rng);

            for m in &order {
                self.do_training_sequence(&corpus[*m], config, &mut progress, &mut neu1e);
            }

            info!("finished epoch {} / {}, loss is {:.6}, lr {:.6}, took {} ms...",
                epoch + 1, config.epochs, progress.mean_loss(), progress.alpha, my_time.elapsed().as_millis());
        }

        Ok(())

    }

    pub fn run(corpus: &[Vec<usize>], counts: &[u64], config: &TrainConfig, cancel: Option<&AtomicBool>) -> Result<Train> {

        let n_tokens: usize = corpus.iter().map(Vec::len).sum();
        if n_tokens == 0 || counts.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        debug!("training on {} sequences, {} tokens, vocab size {}", corpus.len(), n_tokens, counts.len());

        let mut trainer = Train::new(counts, config)?;
        trainer.train(corpus, config, cancel)?;
        Ok(trainer)
    }

}


#[cfg(test)]
mod tests {

    use super::{sigmoid, EpochProgress, NegativeSampler, Train};
    use crate::config::TrainConfig;
    use crate::error::Error;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use ndarray::{arr1, Array1};
    use std::ops::AddAssign;
    use std::sync::atomic::AtomicBool;

    fn small_config() -> TrainConfig {
        TrainConfig { vector_size: 16, epochs: 3, sample: 0.0, ..TrainConfig::default() }
    }

    fn small_corpus() -> (Vec<Vec<usize>>, Vec<u64>) {
        let corpus = vec![
            vec![0, 1, 2, 3, 0, 1, 2, 3],
            vec![4, 5, 0, 4, 5, 1],
            vec![2, 3, 4, 5],
        ];
        let mut counts = vec![0u64; 6];
        for id in corpus.iter().flatten() {
            counts[*id] += 1;
        }
        (corpus, counts)
    }

    #[test]
    fn init_test() {
        let (_, counts) = small_corpus();
        let config = small_config();
        let trainer = Train::new(&counts, &config).unwrap();

        let bound = 0.5 / config.vector_size as f32;
        assert_eq!(trainer.w_input.dim(), (6, 16));
        assert!(trainer.w_input.iter().all(|x| x.abs() <= bound));
        assert!(trainer.w_input.iter().any(|x| *x != 0.0));
        assert!(trainer.w_output.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn sampler_test() {
        let sampler = NegativeSampler::new(&[100, 1]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let hits = (0..10000).filter(|_| sampler.sample(&mut rng) == 0).count();
        // 100^0.75 / (100^0.75 + 1) ~ 0.97
        assert!(hits > 9400 && hits < 9950, "hits: {}", hits);

        assert!(matches!(NegativeSampler::new(&[]), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn keep_probabilities_test() {
        assert_eq!(Train::keep_probabilities(&[1000, 1], 0.0), vec![1.0, 1.0]);

        let probs = Train::keep_probabilities(&[1000, 1], 1e-3);
        assert!(probs[0] < 0.1);
        assert_eq!(probs[1], 1.0);
    }

    #[test]
    fn determinism_test() {
        let (corpus, counts) = small_corpus();
        let config = small_config();

        let (a_in, a_out) = Train::run(&corpus, &counts, &config, None).unwrap().into_weights();
        let (b_in, b_out) = Train::run(&corpus, &counts, &config, None).unwrap().into_weights();
        assert_eq!(a_in, b_in);
        assert_eq!(a_out, b_out);

        let other = TrainConfig { seed: 99, ..config };
        let (c_in, _) = Train::run(&corpus, &counts, &other, None).unwrap().into_weights();
        assert_ne!(a_in, c_in);
    }

    #[test]
    fn updates_test() {
        let (corpus, counts) = small_corpus();
        let config = small_config();
        let untrained = Train::new(&counts, &config).unwrap();
        let trained = Train::run(&corpus, &counts, &config, None).unwrap();

        assert_ne!(untrained.get_w_input(), trained.get_w_input());
        assert!(trained.w_output.iter().any(|x| *x != 0.0));
        assert!(trained.w_input.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn empty_and_cancel_test() {
        let config = small_config();
        assert!(matches!(Train::run(&[vec![], vec![]], &[1], &config, None), Err(Error::EmptyCorpus)));
        assert!(matches!(Train::run(&[], &[], &config, None), Err(Error::EmptyCorpus)));

        let (corpus, counts) = small_corpus();
        let cancel = AtomicBool::new(true);
        match Train::run(&corpus, &counts, &config, Some(&cancel)) {
            Err(Error::Cancelled { completed_epochs }) => assert_eq!(completed_epochs, 0),
            _ => panic!("expected cancellation"),
        }
    }

    #[test]
    fn learning_rate_test() {
        let (alpha, min_alpha) = (0.025, 0.0001);
        let mut progress = EpochProgress::new(100, alpha);

        assert!((progress.learning_rate(alpha, min_alpha) - alpha).abs() < 1e-7);
        progress.words_done = 50;
        assert!((progress.learning_rate(alpha, min_alpha) - 0.01255).abs() < 1e-6);
        progress.words_done = 100;
        assert!((progress.learning_rate(alpha, min_alpha) - min_alpha).abs() < 1e-7);
        progress.words_done = 150;
        assert!((progress.learning_rate(alpha, min_alpha) - min_alpha).abs() < 1e-7);
    }

    fn pair_score(trainer: &Train, context: usize, target: usize) -> f32 {
        sigmoid(trainer.w_input.row(context).dot(&trainer.w_output.row(target)))
    }

    fn aligned_trainer() -> Train {
        let config = TrainConfig { vector_size: 4, ..small_config() };
        let mut trainer = Train::new(&[5, 5, 5], &config).unwrap();
        let row = arr1(&[0.1f32, -0.2, 0.3, 0.05]);
        trainer.w_input.row_mut(0).assign(&row);
        trainer.w_output.row_mut(1).assign(&row);
        trainer
    }

    #[test]
    fn update_direction_test() {
        let mut neu1e: Array1<f32> = Array1::zeros(4);

        let mut trainer = aligned_trainer();
        let before = pair_score(&trainer, 0, 1);
        let loss = trainer.update_pair(0, 1, 1.0, 0.5, &mut neu1e);
        trainer.w_input.row_mut(0).add_assign(&neu1e);
        assert!(loss > 0.0);
        assert!(pair_score(&trainer, 0, 1) > before);

        neu1e.fill(0.0);
        let mut trainer = aligned_trainer();
        trainer.update_pair(0, 1, 0.0, 0.5, &mut neu1e);
        trainer.w_input.row_mut(0).add_assign(&neu1e);
        assert!(pair_score(&trainer, 0, 1) < before);
    }

    fn long_sequence() -> (Vec<Vec<usize>>, Vec<u64>) {
        let sequence: Vec<usize> = (0..2000).map(|i| (i * 7 + i / 13) % 20).collect();
        let mut counts = vec![0u64; 20];
        for id in &sequence {
            counts[*id] += 1;
        }
        (vec![sequence], counts)
    }

    #[test]
    fn decay_within_sequence_test() {
        let (corpus, counts) = long_sequence();
        let config = TrainConfig { epochs: 1, ..small_config() };

        let mut trainer = Train::new(&counts, &config).unwrap();
        let mut progress = EpochProgress::new(2000, config.alpha);
        let mut neu1e: Array1<f32> = Array1::zeros(config.vector_size);
        trainer.do_training_sequence(&corpus[0], &config, &mut progress, &mut neu1e);

        // the last centre position runs close to the floor
        assert_eq!(progress.words_done, 2000);
        assert!(progress.alpha < 0.0002, "alpha: {}", progress.alpha);

        let flat = TrainConfig { min_alpha: config.alpha, ..config.clone() };
        let (decayed, _) = Train::run(&corpus, &counts, &config, None).unwrap().into_weights();
        let (constant, _) = Train::run(&corpus, &counts, &flat, None).unwrap().into_weights();
        assert_ne!(decayed, constant);
    }
}
