
// defines the behavior needed for tokenizing a corpus
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

// word characters are unicode letters and digits plus '_'
#[derive(Clone, Copy, Debug, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !is_word_char(c))
            .filter(|tok| !tok.is_empty())
            .map(|tok| tok.to_string())
            .collect()
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn tokenize(text: &str) -> Vec<String> {
    WordTokenizer.tokenize(text)
}
