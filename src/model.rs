use ndarray::Array2;
use crate::config::TrainConfig;
use crate::error::Result;
use crate::phrases::Phrases;
use crate::similarity::Similarity;
use crate::vocab::Vocabulary;

#[derive(Clone, Debug, PartialEq)]
pub struct TrainedModel {
    config: TrainConfig,
    vocab: Vocabulary,
    phrases: Phrases,
    w_input: Array2<f32>,
    w_output: Array2<f32>,
}

impl TrainedModel {

    pub fn new(config: TrainConfig, vocab: Vocabulary, phrases: Phrases, w_input: Array2<f32>, w_output: Array2<f32>) -> TrainedModel {
        Self { config, vocab, phrases, w_input, w_output }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn phrases(&self) -> &Phrases {
        &self.phrases
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.w_input
    }

    pub fn output_vectors(&self) -> &Array2<f32> {
        &self.w_output
    }

    // normalises every row, build once and reuse across queries
    pub fn similarity(&self) -> Similarity<'_> {
        Similarity::new(&self.w_input, &self.vocab, &self.phrases)
    }

    pub fn most_similar(&self, query: &str, top_n: usize) -> Result<Vec<(String, f32)>> {
        self.similarity().most_similar(query, top_n)
    }
}
