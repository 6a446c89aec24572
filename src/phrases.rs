//! Collocation-based bigram detection.
//!
//! Adjacent token pairs are scored with
//! `(count(a,b) - min_count) * N / (count(a) * count(b))`, `N` being the corpus
//! token count, and pairs scoring at least `threshold` become rules. Applying
//! the rules is a single greedy left-to-right pass; longer chains are not built.

use crate::error::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use tracing::debug;

// the tokenizer never emits it
pub const PHRASE_DELIMITER: char = '\u{2016}';

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Plain(String),
    Phrase(String, String),
}

impl Term {

    pub fn key(&self) -> String {
        match self {
            Term::Plain(tok) => tok.clone(),
            Term::Phrase(left, right) => format!("{}{}{}", left, PHRASE_DELIMITER, right),
        }
    }

    pub fn from_key(key: &str) -> Term {
        match key.split_once(PHRASE_DELIMITER) {
            Some((left, right)) => Term::Phrase(left.to_string(), right.to_string()),
            None => Term::Plain(key.to_string()),
        }
    }

    pub fn is_phrase(&self) -> bool {
        matches!(self, Term::Phrase(..))
    }
}

// human readable form, phrases are shown with a space
impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Plain(tok) => write!(f, "{}", tok),
            Term::Phrase(left, right) => write!(f, "{} {}", left, right),
        }
    }
}

pub fn display_key(key: &str) -> String {
    key.replace(PHRASE_DELIMITER, " ")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhraseRule {
    pub left: String,
    pub right: String,
    pub score: f64,
}

impl PhraseRule {
    pub fn key(&self) -> String {
        Term::Phrase(self.left.clone(), self.right.clone()).key()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PhrasesRepr", into = "PhrasesRepr")]
pub struct Phrases {
    min_count: u64,
    threshold: f64,
    // left -> right -> score
    rules: HashMap<String, HashMap<String, f64>>,
}

#[derive(Serialize, Deserialize)]
struct PhrasesRepr {
    min_count: u64,
    threshold: f64,
    rules: Vec<PhraseRule>,
}

impl From<Phrases> for PhrasesRepr {
    fn from(phrases: Phrases) -> Self {
        PhrasesRepr {
            min_count: phrases.min_count,
            threshold: phrases.threshold,
            rules: phrases.export(),
        }
    }
}

impl TryFrom<PhrasesRepr> for Phrases {
    type Error = String;

    fn try_from(repr: PhrasesRepr) -> std::result::Result<Self, Self::Error> {
        for rule in &repr.rules {
            for half in [&rule.left, &rule.right] {
                if half.is_empty() || half.chars().any(|c| c.is_whitespace() || c == PHRASE_DELIMITER) {
                    return Err(format!("malformed phrase rule half '{}'", half));
                }
            }
        }
        Ok(Phrases::from_rules(repr.min_count, repr.threshold, repr.rules))
    }
}

// unigram and bigram counts of one shard of the corpus
struct Counts<'a> {
    unigrams: HashMap<&'a str, u64>,
    bigrams: HashMap<(&'a str, &'a str), u64>,
    total: u64,
}

impl<'a> Counts<'a> {

    fn new() -> Self {
        Self { unigrams: HashMap::new(), bigrams: HashMap::new(), total: 0 }
    }

    fn accumulate(mut self, sequence: &'a [String]) -> Self {
        for tok in sequence {
            *self.unigrams.entry(tok.as_str()).or_insert(0) += 1;
        }
        for pair in sequence.windows(2) {
            *self.bigrams.entry((pair[0].as_str(), pair[1].as_str())).or_insert(0) += 1;
        }
        self.total += sequence.len() as u64;
        self
    }

    fn merge(mut self, other: Self) -> Self {
        for (tok, c) in other.unigrams {
            *self.unigrams.entry(tok).or_insert(0) += c;
        }
        for (pair, c) in other.bigrams {
            *self.bigrams.entry(pair).or_insert(0) += c;
        }
        self.total += other.total;
        self
    }
}

impl Phrases {

    // counting runs on the current rayon pool
    pub fn fit(sequences: &[Vec<String>], min_count: u64, threshold: f64) -> Phrases {

        let counts = sequences
            .par_iter()
            .fold(Counts::new, |counts, sequence| counts.accumulate(sequence))
            .reduce(Counts::new, Counts::merge);

        let n = counts.total as f64;
        let mut rules: HashMap<String, HashMap<String, f64>> = HashMap::new();
        let mut accepted = 0usize;

        for ((a, b), ab_count) in &counts.bigrams {
            if *ab_count < min_count {
                continue;
            }
            // both halves were seen at least as often as the pair
            let a_count = counts.unigrams[a];
            let b_count = counts.unigrams[b];
            if a_count < min_count || b_count < min_count {
                continue;
            }

            let score = Phrases::score(*ab_count, a_count, b_count, n, min_count);
            if score >= threshold {
                rules.entry(a.to_string()).or_default().insert(b.to_string(), score);
                accepted += 1;
            }
        }

        debug!("scored {} distinct bigrams over {} tokens, accepted {}", counts.bigrams.len(), counts.total, accepted);

        Phrases { min_count, threshold, rules }
    }

    fn score(ab_count: u64, a_count: u64, b_count: u64, n: f64, min_count: u64) -> f64 {
        (ab_count - min_count) as f64 * n / (a_count as f64 * b_count as f64)
    }

    pub fn from_rules(min_count: u64, threshold: f64, rules: Vec<PhraseRule>) -> Phrases {
        let mut map: HashMap<String, HashMap<String, f64>> = HashMap::new();
        for rule in rules {
            map.entry(rule.left).or_default().insert(rule.right, rule.score);
        }
        Phrases { min_count, threshold, rules: map }
    }

    pub fn min_count(&self) -> u64 {
        self.min_count
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(|rights| rights.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn score_of(&self, left: &str, right: &str) -> Option<f64> {
        self.rules.get(left).and_then(|rights| rights.get(right)).copied()
    }

    // single greedy pass, a merged token is never merged again
    pub fn apply_terms<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<Term> {

        let mut merged = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let current = tokens[i].as_ref();
            if let Some(next) = tokens.get(i + 1) {
                let next = next.as_ref();
                if self.score_of(current, next).is_some() {
                    merged.push(Term::Phrase(current.to_string(), next.to_string()));
                    i += 2;
                    continue;
                }
            }
            merged.push(Term::Plain(current.to_string()));
            i += 1;
        }
        merged
    }

    pub fn apply<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        self.apply_terms(tokens).iter().map(Term::key).collect()
    }

    pub fn resolve<S: AsRef<str>>(&self, tokens: &[S]) -> Result<String> {
        let mut merged = self.apply_terms(tokens);
        match (merged.pop(), merged.is_empty()) {
            (Some(term @ Term::Phrase(..)), true) => Ok(term.key()),
            _ => {
                let phrase = tokens.iter().map(|t| t.as_ref()).collect::<Vec<&str>>().join(" ");
                Err(Error::PhraseNotFound(phrase))
            }
        }
    }

    pub fn prune<F: Fn(&str) -> bool>(&mut self, keep: F) -> usize {
        let before = self.len();
        for (left, rights) in self.rules.iter_mut() {
            rights.retain(|right, _| keep(&Term::Phrase(left.clone(), right.clone()).key()));
        }
        self.rules.retain(|_, rights| !rights.is_empty());
        before - self.len()
    }

    pub fn export(&self) -> Vec<PhraseRule> {
        let mut rules: Vec<PhraseRule> = self.rules
            .iter()
            .flat_map(|(left, rights)| rights.iter().map(move |(right, score)| PhraseRule {
                left: left.clone(),
                right: right.clone(),
                score: *score,
            }))
            .collect();
        rules.sort_by(|x, y| {
            y.score.total_cmp(&x.score)
                .then_with(|| x.left.cmp(&y.left))
                .then_with(|| x.right.cmp(&y.right))
        });
        rules
    }
}


#[cfg(test)]
mod tests {

    use super::{Phrases, Term, PHRASE_DELIMITER};
    use crate::error::Error;
    use crate::tokenizer::tokenize;

    // every document holds "new york" once, padded with filler tokens seen only once
    fn new_york_corpus() -> Vec<Vec<String>> {
        (0..50).map(|i| {
            let fillers = (0..10).map(|j| format!("filler{}x{}", i, j)).collect::<Vec<String>>().join(" ");
            tokenize(&format!("{} new york", fillers))
        }).collect()
    }

    #[test]
    fn collocation_accepted_test() {

        let corpus = new_york_corpus();
        let phrases = Phrases::fit(&corpus, 1, 10.0);

        // 50 pairs, 50 of each half, 12 * 50 tokens
        let expected = 49.0 * 600.0 / (50.0 * 50.0);
        let score = phrases.score_of("new", "york").unwrap();
        assert!((score - expected).abs() < 1e-9);
        assert_eq!(phrases.len(), 1);

        let merged = phrases.apply(&["new", "york", "city"]);
        assert_eq!(merged, vec![format!("new{}york", PHRASE_DELIMITER), "city".to_string()]);
        assert_eq!(phrases.apply_terms(&["new", "york"]), vec![Term::Phrase("new".into(), "york".into())]);
    }

    #[test]
    fn low_cooccurrence_test() {
        let corpus = vec![
            tokenize("the quick brown fox jumps over the lazy dog"),
            tokenize("a slow green turtle walks under a busy bridge"),
        ];
        let phrases = Phrases::fit(&corpus, 1, 10.0);
        assert!(phrases.is_empty());
        assert_eq!(phrases.apply(&corpus[0]), corpus[0]);
    }

    #[test]
    fn min_count_filter_test() {
        // pair seen twice, min_count of 3 rules it out regardless of score
        let corpus = vec![tokenize("salt lake"), tokenize("salt lake")];
        assert!(Phrases::fit(&corpus, 3, 0.0).is_empty());
        assert_eq!(Phrases::fit(&corpus, 2, 0.0).len(), 1);
    }

    #[test]
    fn greedy_single_pass_test() {
        let phrases = Phrases::from_rules(1, 10.0, vec![
            super::PhraseRule { left: "new".into(), right: "york".into(), score: 20.0 },
            super::PhraseRule { left: "york".into(), right: "city".into(), score: 30.0 },
        ]);

        // left rule wins, no chaining into a trigram
        let merged = phrases.apply_terms(&["new", "york", "city"]);
        assert_eq!(merged, vec![Term::Phrase("new".into(), "york".into()), Term::Plain("city".into())]);

        let merged = phrases.apply_terms(&["old", "york", "city"]);
        assert_eq!(merged, vec![Term::Plain("old".into()), Term::Phrase("york".into(), "city".into())]);

        // export is ordered by score
        let exported = phrases.export();
        assert_eq!(exported[0].left, "york");
        assert_eq!(exported[1].left, "new");
    }

    #[test]
    fn resolve_test() {
        let phrases = Phrases::fit(&new_york_corpus(), 1, 10.0);

        assert_eq!(phrases.resolve(&["new", "york"]).unwrap(), Term::Phrase("new".into(), "york".into()).key());

        match phrases.resolve(&["york", "new"]) {
            Err(Error::PhraseNotFound(p)) => assert_eq!(p, "york new"),
            other => panic!("unexpected {:?}", other),
        }
        // a trigram never collapses to a single unit
        assert!(phrases.resolve(&["new", "york", "city"]).is_err());
        assert!(phrases.resolve(&["york"]).is_err());
    }

    #[test]
    fn prune_test() {
        let mut phrases = Phrases::from_rules(1, 10.0, vec![
            super::PhraseRule { left: "new".into(), right: "york".into(), score: 20.0 },
            super::PhraseRule { left: "san".into(), right: "diego".into(), score: 30.0 },
        ]);
        let keep = Term::Phrase("new".into(), "york".into()).key();
        assert_eq!(phrases.prune(|key| key == keep), 1);
        assert_eq!(phrases.len(), 1);
        assert!(phrases.score_of("san", "diego").is_none());
    }

    #[test]
    fn key_display_test() {
        let term = Term::Phrase("new".into(), "york".into());
        assert_eq!(Term::from_key(&term.key()), term);
        assert_eq!(term.to_string(), "new york");
        assert!(!term.key().chars().any(char::is_whitespace));
        assert_eq!(Term::from_key("york"), Term::Plain("york".into()));
    }
}
