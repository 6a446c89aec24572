use crate::error::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

// ids by descending frequency, ties keep first appearance order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vocabulary {
    t2i: HashMap<String, usize>,
    i2t: Vec<String>,
    counts: Vec<u64>,
}

impl Vocabulary {

    pub fn build<S: AsRef<str>>(sequences: &[Vec<S>], min_count: u64) -> Vocabulary {

        // first-appearance order, then counts
        let mut order: Vec<&str> = Vec::new();
        let mut token2count: HashMap<&str, u64> = HashMap::new();
        for sequence in sequences {
            for tok in sequence {
                let tok = tok.as_ref();
                let count = token2count.entry(tok).or_insert_with(|| {
                    order.push(tok);
                    0
                });
                *count += 1;
            }
        }

        let mut tup: Vec<(&str, u64)> = order
            .iter()
            .map(|tok| (*tok, token2count[tok]))
            .filter(|(_, count)| *count >= min_count)
            .collect();
        // stable sort keeps first-appearance order among equal counts
        tup.sort_by(|a, b| b.1.cmp(&a.1));

        debug!("keeping {} tokens with count >= {} out of {}", tup.len(), min_count, order.len());

        let mut vocab = Vocabulary::default();
        for (tok, count) in tup {
            vocab.t2i.insert(tok.to_string(), vocab.i2t.len());
            vocab.i2t.push(tok.to_string());
            vocab.counts.push(count);
        }
        vocab
    }

    pub fn from_parts(tokens: Vec<String>, counts: Vec<u64>) -> Result<Vocabulary> {

        if tokens.len() != counts.len() {
            return Err(Error::Serialization(format!("{} tokens but {} counts", tokens.len(), counts.len())));
        }

        let mut t2i: HashMap<String, usize> = HashMap::with_capacity(tokens.len());
        for (i, tok) in tokens.iter().enumerate() {
            if tok.is_empty() || tok.chars().any(char::is_whitespace) {
                return Err(Error::Serialization(format!("malformed token '{}' at id {}", tok, i)));
            }
            if t2i.insert(tok.clone(), i).is_some() {
                return Err(Error::Serialization(format!("duplicate token '{}'", tok)));
            }
        }

        Ok(Vocabulary { t2i, i2t: tokens, counts })
    }

    pub fn len(&self) -> usize {
        self.i2t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i2t.is_empty()
    }

    pub fn id_of(&self, token: &str) -> Option<usize> {
        self.t2i.get(token).copied()
    }

    pub fn token_of(&self, id: usize) -> Option<&str> {
        self.i2t.get(id).map(String::as_str)
    }

    pub fn count(&self, id: usize) -> Option<u64> {
        self.counts.get(id).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.t2i.contains_key(token)
    }

    pub fn lookup(&self, token: &str) -> Result<usize> {
        self.id_of(token).ok_or_else(|| Error::UnknownTerm(token.to_string()))
    }

    pub fn tokens(&self) -> &[String] {
        &self.i2t
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn token2id(&self) -> &HashMap<String, usize> {
        &self.t2i
    }

    pub fn encode<S: AsRef<str>>(&self, sequences: &[Vec<S>]) -> Vec<Vec<usize>> {
        sequences
            .iter()
            .map(|sequence| sequence.iter().filter_map(|tok| self.id_of(tok.as_ref())).collect())
            .collect()
    }
}
