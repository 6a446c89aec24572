use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("term not in vocabulary: '{0}'")]
    UnknownTerm(String),

    #[error("phrase not found in the model: '{0}'")]
    PhraseNotFound(String),

    #[error("corpus has no usable tokens")]
    EmptyCorpus,

    #[error("corrupt artifact {path:?}: {reason}")]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("training cancelled after {completed_epochs} completed epochs")]
    Cancelled { completed_epochs: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::CorruptArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
