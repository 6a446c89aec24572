
pub mod config;
pub mod corpus;
pub mod error;
pub mod model;
pub mod phrases;
pub mod pipeline;
pub mod query;
pub mod similarity;
pub mod store;
pub mod tokenizer;
pub mod train;
pub mod vocab;

pub use config::TrainConfig;
pub use error::{Error, Result};
pub use model::TrainedModel;
pub use phrases::{PhraseRule, Phrases, Term};
pub use pipeline::Pipeline;
pub use query::{query, QueryResults, DEFAULT_TOP_N};
pub use similarity::Similarity;
pub use store::ModelStore;
pub use tokenizer::tokenize;
pub use vocab::Vocabulary;

pub fn train<I, S>(corpus: I, config: &TrainConfig) -> Result<TrainedModel>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str> + Sync,
{
    Pipeline::train(corpus, config)
}
