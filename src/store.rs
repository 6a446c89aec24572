//! Model persistence.
//!
//! A saved model is two co-located files: `word2vec.model`, a gzip-compressed
//! bincode record of the config, vocabulary and both weight matrices, and
//! `phraser.json`, the accepted phrase rules. Loading checks that the two agree.

use crate::config::TrainConfig;
use crate::error::{Error, Result};
use crate::model::TrainedModel;
use crate::phrases::Phrases;
use crate::vocab::Vocabulary;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use ndarray_npy::write_npy;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const MODEL_FILE: &str = "word2vec.model";
pub const PHRASES_FILE: &str = "phraser.json";
pub const VECTORS_NPY_FILE: &str = "vecs.npy";
pub const WORDS_FILE: &str = "words.json";

const FORMAT_VERSION: u32 = 1;

pub trait SaveFile {
    fn save_file(&self, path: &Path) -> Result<()>;
}

pub trait ReadFile: Sized {
    fn read_file(path: &Path) -> Result<Self>;
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::corrupt(path, format!("cannot open file: {}", e)))
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    config: TrainConfig,
    tokens: Vec<String>,
    counts: Vec<u64>,
    w_input: Array2<f32>,
    w_output: Array2<f32>,
}

impl SaveFile for ModelFile {
    fn save_file(&self, path: &Path) -> Result<()> {
        let f = BufWriter::new(File::create(path)?);
        let mut writer = GzEncoder::new(f, Compression::default());
        bincode::serialize_into(&mut writer, self).map_err(|e| Error::Serialization(e.to_string()))?;
        writer.finish()?.flush()?;
        Ok(())
    }
}

impl ReadFile for ModelFile {
    fn read_file(path: &Path) -> Result<Self> {
        let reader = GzDecoder::new(open(path)?);
        let item: ModelFile = bincode::deserialize_from(reader)
            .map_err(|e| Error::corrupt(path, format!("cannot decode model: {}", e)))?;
        Ok(item)
    }
}

impl SaveFile for Phrases {
    fn save_file(&self, path: &Path) -> Result<()> {
        let mut f = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut f, self).map_err(|e| Error::Serialization(e.to_string()))?;
        f.flush()?;
        Ok(())
    }
}

impl ReadFile for Phrases {
    fn read_file(path: &Path) -> Result<Self> {
        let item = serde_json::from_reader(open(path)?)
            .map_err(|e| Error::corrupt(path, format!("cannot decode phrase rules: {}", e)))?;
        Ok(item)
    }
}

pub struct ModelStore {}

impl ModelStore {

    pub fn save<P: AsRef<Path>>(model: &TrainedModel, output_dir: P) -> Result<(PathBuf, PathBuf)> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        let model_path = output_dir.join(MODEL_FILE);
        let phrases_path = output_dir.join(PHRASES_FILE);
        ModelStore::save_to(model, &model_path, &phrases_path)?;
        Ok((model_path, phrases_path))
    }

    pub fn save_to(model: &TrainedModel, model_path: &Path, phrases_path: &Path) -> Result<()> {

        let item = ModelFile {
            format_version: FORMAT_VERSION,
            config: model.config().clone(),
            tokens: model.vocab().tokens().to_vec(),
            counts: model.vocab().counts().to_vec(),
            w_input: model.vectors().clone(),
            w_output: model.output_vectors().clone(),
        };
        item.save_file(model_path)?;
        model.phrases().save_file(phrases_path)?;

        info!("saved model to {:?} and phrase rules to {:?}", model_path, phrases_path);
        Ok(())
    }

    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<TrainedModel> {
        let dir = dir.as_ref();
        ModelStore::load(dir.join(MODEL_FILE), dir.join(PHRASES_FILE))
    }

    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, phrases_path: Q) -> Result<TrainedModel> {

        let model_path = model_path.as_ref();
        let phrases_path = phrases_path.as_ref();

        let item = ModelFile::read_file(model_path)?;
        if item.format_version != FORMAT_VERSION {
            return Err(Error::corrupt(model_path, format!("unsupported format version {}", item.format_version)));
        }
        item.config.validate().map_err(|e| Error::corrupt(model_path, e.to_string()))?;

        let n = item.tokens.len();
        let dim = item.config.vector_size;
        for (name, w) in [("input", &item.w_input), ("output", &item.w_output)] {
            if w.dim() != (n, dim) {
                return Err(Error::corrupt(model_path, format!(
                    "{} matrix has shape {:?}, expected ({}, {})", name, w.dim(), n, dim)));
            }
            if !w.iter().all(|x| x.is_finite()) {
                return Err(Error::corrupt(model_path, format!("{} matrix holds non-finite weights", name)));
            }
        }

        let vocab = Vocabulary::from_parts(item.tokens, item.counts)
            .map_err(|e| Error::corrupt(model_path, e.to_string()))?;

        let phrases = Phrases::read_file(phrases_path)?;
        if let Some(rule) = phrases.export().into_iter().find(|rule| !vocab.contains(&rule.key())) {
            return Err(Error::corrupt(phrases_path, format!(
                "phrase rule '{} {}' is not in the model vocabulary", rule.left, rule.right)));
        }

        info!("loaded model with {} terms and {} phrase rules", vocab.len(), phrases.len());
        Ok(TrainedModel::new(item.config, vocab, phrases, item.w_input, item.w_output))
    }

    // vecs.npy plus the token to id map as words.json
    pub fn export_npy<P: AsRef<Path>>(model: &TrainedModel, output_dir: P) -> Result<()> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir)?;

        write_npy(output_dir.join(VECTORS_NPY_FILE), model.vectors())
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let f = BufWriter::new(File::create(output_dir.join(WORDS_FILE))?);
        serde_json::to_writer(f, model.vocab().token2id()).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(())
    }
}
