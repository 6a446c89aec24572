use std::cmp::Ordering;
use ndarray::prelude::*;
use crate::error::{Error, Result};
use crate::phrases::Phrases;
use crate::tokenizer::tokenize;
use crate::vocab::Vocabulary;

// rows are normalised once, a zero row stays zero and scores 0
pub struct Similarity<'a> {
    w: Array2<f32>,
    vocab: &'a Vocabulary,
    phrases: &'a Phrases,
}

fn normalize(mut row: ArrayViewMut1<f32>) {
    let norm = row.dot(&row).sqrt();
    if norm > 0.0 {
        row.mapv_inplace(|a| a / norm);
    }
}

// descending score, then ascending term
fn rank(a: &(String, f32), b: &(String, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

impl<'a> Similarity<'a> {

    pub fn new(w: &Array2<f32>, vocab: &'a Vocabulary, phrases: &'a Phrases) -> Similarity<'a> {

        let mut w = w.to_owned();
        for row in w.axis_iter_mut(Axis(0)) {
            normalize(row);
        }

        Self { w, vocab, phrases }
    }

    // several tokens must collapse to a known phrase-token
    pub fn resolve(&self, query: &str) -> Result<usize> {

        let tokens = tokenize(query);
        match tokens.len() {
            0 => Err(Error::UnknownTerm(query.trim().to_string())),
            1 => self.vocab.lookup(&tokens[0]),
            _ => {
                let key = self.phrases.resolve(&tokens)?;
                self.vocab
                    .id_of(&key)
                    .ok_or_else(|| Error::PhraseNotFound(tokens.join(" ")))
            }
        }
    }

    pub fn extract_vec_from_word(&self, query: &str) -> Result<Array1<f32>> {
        let i = self.resolve(query)?;
        Ok(self.w.row(i).to_owned())
    }

    pub fn most_similar(&self, query: &str, top_n: usize) -> Result<Vec<(String, f32)>> {
        let i = self.resolve(query)?;
        Ok(self.find_k_most_similar(&self.w.row(i), top_n, &[i]))
    }

    pub fn similarity(&self, a: &str, b: &str) -> Result<f32> {
        let i = self.resolve(a)?;
        let j = self.resolve(b)?;
        Ok(Similarity::clean(self.w.row(i).dot(&self.w.row(j))))
    }

    pub fn extract_analogy_vec(&self, inputs: [&str; 3]) -> Result<(Array1<f32>, [usize; 3])> {

        let mut ids = [0usize; 3];
        for (k, e) in inputs.iter().enumerate() {
            ids[k] = self.resolve(e)?;
        }

        // a is to b as c is to ? => b - a + c
        let mut analogy = &self.w.row(ids[1]) - &self.w.row(ids[0]) + &self.w.row(ids[2]);
        normalize(analogy.view_mut());
        Ok((analogy, ids))
    }

    pub fn extract_analogies(&self, inputs: [&str; 3], k: usize) -> Result<Vec<(String, f32)>> {
        let (analogy, ids) = self.extract_analogy_vec(inputs)?;
        Ok(self.find_k_most_similar(&analogy.view(), k, &ids))
    }

    // -0.0 would otherwise sort below 0.0
    fn clean(score: f32) -> f32 {
        if score == 0.0 { 0.0 } else { score.clamp(-1.0, 1.0) }
    }

    pub fn find_k_most_similar(&self, vec: &ArrayView1<f32>, k: usize, exclude: &[usize]) -> Vec<(String, f32)> {

        // multiply all vectors by the query vector
        let scores = self.w.dot(vec);
        let mut sim_tokens: Vec<(String, f32)> = scores
            .iter()
            .enumerate()
            .filter(|(i, _)| !exclude.contains(i))
            .filter_map(|(i, s)| self.vocab.token_of(i).map(|t| (t.to_string(), Similarity::clean(*s))))
            .collect();

        sim_tokens.sort_by(rank);
        sim_tokens.truncate(k);
        sim_tokens
    }

}
