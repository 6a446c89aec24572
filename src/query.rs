use crate::error::Result;
use crate::model::TrainedModel;
use crate::phrases::display_key;
use crate::tokenizer::tokenize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_TOP_N: usize = 30;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResults {
    entries: Vec<(String, Vec<(String, f32)>)>,
}

impl FromIterator<(String, Vec<(String, f32)>)> for QueryResults {
    fn from_iter<T: IntoIterator<Item = (String, Vec<(String, f32)>)>>(iter: T) -> Self {
        QueryResults { entries: iter.into_iter().collect() }
    }
}

impl QueryResults {

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, term: &str) -> Option<&[(String, f32)]> {
        self.entries.iter().find(|(t, _)| t == term).map(|(_, related)| related.as_slice())
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[(String, f32)])> {
        self.entries.iter().map(|(t, related)| (t.as_str(), related.as_slice()))
    }

    // shorter columns are padded with empty cells
    pub fn to_tsv(&self) -> String {

        if self.entries.is_empty() {
            return String::new();
        }

        let mut out = self.terms().collect::<Vec<&str>>().join("\t");
        out.push('\n');

        let rows = self.entries.iter().map(|(_, related)| related.len()).max().unwrap_or(0);
        for r in 0..rows {
            let cells: Vec<String> = self.entries
                .iter()
                .map(|(_, related)| match related.get(r) {
                    Some((term, score)) => format!("{}: {:.4}", term, score),
                    None => String::new(),
                })
                .collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }

    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut f = BufWriter::new(File::create(path)?);
        f.write_all(self.to_tsv().as_bytes())?;
        f.flush()?;
        Ok(())
    }
}

pub fn parse_terms(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Looks up the `top_n` related terms of every query term. Terms that are
/// unknown, or phrases the model never learned, are logged and left out.
pub fn query<S: AsRef<str>>(model: &TrainedModel, terms: &[S], top_n: usize) -> QueryResults {

    let similarity = model.similarity();
    let mut results = QueryResults::default();

    for term in terms {
        let term = term.as_ref();
        let label = tokenize(term).join(" ");

        if results.get(&label).is_some() {
            debug!("skipping repeated query '{}'", label);
            continue;
        }

        match similarity.most_similar(term, top_n) {
            Ok(related) => {
                let related = related.into_iter().map(|(t, s)| (display_key(&t), s)).collect();
                results.entries.push((label, related));
            }
            Err(e) => warn!("skipping '{}': {}", term, e),
        }
    }

    results
}
